//! Identifier resolution.
//!
//! Callers name features in several shapes: a bare `"name"`, a qualified
//! `"namespace/name"`, a table with `name` (and optionally `namespace`)
//! columns, or a list mixing strings and `{namespace, name}` records. This
//! module turns any of them into an ordered list of [`FeatureRef`]s. It does
//! no I/O.

use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};
use crate::table::Table;
use crate::types::{FeatureRef, NAME_SEPARATOR};

/// One element of a [`FeatureSelector::List`]
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorItem {
    Name(String),
    Record(Map<String, Value>),
}

/// Every accepted shape of feature identifier input
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureSelector {
    Name(String),
    Table(Table),
    List(Vec<SelectorItem>),
}

impl From<&str> for FeatureSelector {
    fn from(value: &str) -> Self {
        FeatureSelector::Name(value.to_string())
    }
}

impl From<String> for FeatureSelector {
    fn from(value: String) -> Self {
        FeatureSelector::Name(value)
    }
}

impl From<Table> for FeatureSelector {
    fn from(value: Table) -> Self {
        FeatureSelector::Table(value)
    }
}

impl From<Vec<SelectorItem>> for FeatureSelector {
    fn from(value: Vec<SelectorItem>) -> Self {
        FeatureSelector::List(value)
    }
}

impl From<Vec<&str>> for FeatureSelector {
    fn from(value: Vec<&str>) -> Self {
        FeatureSelector::List(
            value
                .into_iter()
                .map(|s| SelectorItem::Name(s.to_string()))
                .collect(),
        )
    }
}

impl From<Vec<String>> for FeatureSelector {
    fn from(value: Vec<String>) -> Self {
        FeatureSelector::List(value.into_iter().map(SelectorItem::Name).collect())
    }
}

impl From<&FeatureRef> for FeatureSelector {
    fn from(value: &FeatureRef) -> Self {
        FeatureSelector::List(vec![SelectorItem::from(value)])
    }
}

impl From<&FeatureRef> for SelectorItem {
    fn from(value: &FeatureRef) -> Self {
        let mut record = Map::new();
        if let Some(ns) = &value.namespace {
            record.insert("namespace".to_string(), Value::String(ns.clone()));
        }
        record.insert("name".to_string(), Value::String(value.name.clone()));
        SelectorItem::Record(record)
    }
}

impl TryFrom<Value> for FeatureSelector {
    type Error = StoreError;

    /// Decode dynamic input.
    ///
    /// Strings and arrays map directly; an object must be table-shaped
    /// (`{"columns": [...], "rows": [[...], ...]}`).
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(s) => Ok(FeatureSelector::Name(s)),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(SelectorItem::Name(s)),
                    Value::Object(record) => Ok(SelectorItem::Record(record)),
                    other => Err(StoreError::invalid_input(format!(
                        "List must contain strings or records, got {}",
                        other
                    ))),
                })
                .collect::<StoreResult<Vec<_>>>()
                .map(FeatureSelector::List),
            Value::Object(obj) if obj.contains_key("columns") && obj.contains_key("rows") => {
                serde_json::from_value::<Table>(Value::Object(obj))
                    .map(FeatureSelector::Table)
                    .map_err(|e| StoreError::invalid_input(format!("Malformed table: {}", e)))
            }
            _ => Err(StoreError::invalid_input(
                "Must supply a string, table or list specifying namespace/name",
            )),
        }
    }
}

/// Split a possibly qualified name when no namespace is given.
///
/// An explicit `namespace` keeps `name` verbatim. Otherwise a name containing
/// the separator is split: the first segment becomes the namespace and the
/// remaining segments, rejoined, the name.
pub fn split_name(namespace: Option<&str>, name: &str) -> (Option<String>, String) {
    match namespace.filter(|ns| !ns.is_empty()) {
        Some(ns) => (Some(ns.to_string()), name.to_string()),
        None => match name.split_once(NAME_SEPARATOR) {
            Some((ns, rest)) => (Some(ns.to_string()), rest.to_string()),
            None => (None, name.to_string()),
        },
    }
}

/// Resolve a bare string: a qualified name overrides the default namespace.
fn resolve_name(name: &str, default_namespace: Option<&str>) -> FeatureRef {
    match name.split_once(NAME_SEPARATOR) {
        Some((ns, rest)) => FeatureRef::new(ns, rest),
        None => FeatureRef {
            namespace: default_namespace.map(str::to_string),
            name: name.to_string(),
        },
    }
}

/// Resolve a `{namespace?, name}` pair taken from a record or table row.
fn resolve_pair(
    namespace: Option<&Value>,
    name: Option<&Value>,
    default_namespace: Option<&str>,
) -> StoreResult<FeatureRef> {
    let name = match name {
        Some(Value::String(name)) => name,
        Some(other) => {
            return Err(StoreError::invalid_input(format!(
                "Feature name must be a string, got {}",
                other
            )))
        }
        None => return Err(StoreError::invalid_input("Record is missing a name")),
    };

    match namespace {
        Some(Value::String(ns)) => Ok(FeatureRef::new(ns.as_str(), name.as_str())),
        Some(Value::Null) | None => Ok(resolve_name(name, default_namespace)),
        Some(other) => Err(StoreError::invalid_input(format!(
            "Namespace must be a string, got {}",
            other
        ))),
    }
}

/// Resolve a selector into canonical feature references, preserving input
/// order.
pub fn resolve(
    selector: &FeatureSelector,
    default_namespace: Option<&str>,
) -> StoreResult<Vec<FeatureRef>> {
    match selector {
        FeatureSelector::Name(name) => Ok(vec![resolve_name(name, default_namespace)]),
        FeatureSelector::Table(table) => {
            if !table.has_column("name") {
                return Err(StoreError::invalid_input("Table must have a name column"));
            }
            (0..table.len())
                .map(|row| {
                    resolve_pair(
                        table.get(row, "namespace"),
                        table.get(row, "name"),
                        default_namespace,
                    )
                })
                .collect()
        }
        FeatureSelector::List(items) => items
            .iter()
            .map(|item| match item {
                SelectorItem::Name(name) => Ok(resolve_name(name, default_namespace)),
                SelectorItem::Record(record) => {
                    resolve_pair(record.get("namespace"), record.get("name"), default_namespace)
                }
            })
            .collect(),
    }
}
