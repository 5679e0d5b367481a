//! Uniform tabular record set used to exchange catalog rows and feature
//! selectors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// Ordered column set with one row per entity.
///
/// Every row is as wide as the column list, including tables read back
/// through serde.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

#[derive(Deserialize)]
struct RawTable {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

impl TryFrom<RawTable> for Table {
    type Error = StoreError;

    fn try_from(raw: RawTable) -> StoreResult<Self> {
        let mut table = Table::new(raw.columns);
        for row in raw.rows {
            table.push_row(row)?;
        }
        Ok(table)
    }
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table from JSON records.
    ///
    /// Columns named in `leading` come first (in that order, when present),
    /// every other column follows in alphabetical order. Records missing a
    /// column get `null` in that cell.
    pub fn from_records(records: Vec<Map<String, Value>>, leading: &[&str]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let mut rest: Vec<String> = records
            .iter()
            .flat_map(|r| r.keys())
            .filter(|k| !leading.contains(&k.as_str()))
            .cloned()
            .collect();
        rest.sort();
        rest.dedup();

        let columns: Vec<String> = leading
            .iter()
            .filter(|c| records.iter().any(|r| r.contains_key(**c)))
            .map(|c| c.to_string())
            .chain(rest)
            .collect();

        let rows = records
            .into_iter()
            .map(|mut record| {
                columns
                    .iter()
                    .map(|c| record.remove(c).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> StoreResult<()> {
        if row.len() != self.columns.len() {
            return Err(StoreError::invalid_input(format!(
                "Row has {} values but table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn with_row(mut self, row: Vec<Value>) -> StoreResult<Self> {
        self.push_row(row)?;
        Ok(self)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Cell at `row` in `column`
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// All values of one column, in row order
    pub fn column(&self, column: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Rows as JSON objects keyed by column name
    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_records_orders_leading_columns_first() {
        let table = Table::from_records(
            vec![record(json!({
                "url": "memory://demo",
                "meta": {},
                "name": "demo",
                "description": null,
                "id": 1
            }))],
            &["namespace", "name", "version", "description", "meta"],
        );

        assert_eq!(
            table.columns(),
            &["name", "description", "meta", "id", "url"]
        );
        assert_eq!(table.get(0, "url"), Some(&json!("memory://demo")));
    }

    #[test]
    fn test_from_records_empty() {
        let table = Table::from_records(vec![], &["name"]);
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut table = Table::new(["namespace", "name"]);
        assert!(table.push_row(vec![json!("demo")]).is_err());
        table.push_row(vec![json!("demo"), json!("price")]).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.records()[0]["name"], json!("price"));
    }

    #[test]
    fn test_deserialize_rejects_ragged_rows() {
        let ragged = json!({"columns": ["namespace", "name"], "rows": [["demo"]]});
        assert!(serde_json::from_value::<Table>(ragged).is_err());

        let table: Table = serde_json::from_value(json!({
            "columns": ["namespace", "name"],
            "rows": [["demo", "price"]]
        }))
        .unwrap();
        assert_eq!(table.column("name"), Some(vec![&json!("price")]));
    }
}
