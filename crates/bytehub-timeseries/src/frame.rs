//! Time-indexed tabular values.
//!
//! A [`Frame`] is a `time` index, an optional `created_time` column and any
//! number of named value columns. Frames read from a backend carry a single
//! `value` column; frames returned by a multi-feature load carry one column
//! per feature, named `namespace/name`.

use std::collections::{BTreeSet, HashMap};

use bytehub_core::DBDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BackendError, Result};

pub const TIME_COLUMN: &str = "time";
pub const CREATED_TIME_COLUMN: &str = "created_time";
pub const VALUE_COLUMN: &str = "value";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

/// Every column, `created_time` included, is as long as the time index.
/// Deserialised frames go through the same checks as the builder methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFrame")]
pub struct Frame {
    time: Vec<DBDateTime>,
    created_time: Option<Vec<DBDateTime>>,
    columns: Vec<Column>,
}

#[derive(Deserialize)]
struct RawFrame {
    time: Vec<DBDateTime>,
    #[serde(default)]
    created_time: Option<Vec<DBDateTime>>,
    #[serde(default)]
    columns: Vec<Column>,
}

impl TryFrom<RawFrame> for Frame {
    type Error = BackendError;

    fn try_from(raw: RawFrame) -> Result<Self> {
        let mut frame = Frame::new(raw.time);
        if let Some(created_time) = raw.created_time {
            frame = frame.with_created_time(created_time)?;
        }
        raw.columns
            .into_iter()
            .try_fold(frame, |frame, column| frame.with_column(column.name, column.values))
    }
}

impl Frame {
    pub fn new(time: Vec<DBDateTime>) -> Self {
        Self {
            time,
            created_time: None,
            columns: Vec::new(),
        }
    }

    /// Append a value column
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<Value>) -> Result<Self> {
        let name = name.into();
        if name == TIME_COLUMN || name == CREATED_TIME_COLUMN {
            return Err(BackendError::InvalidFrame(format!(
                "{} is reserved for the time index",
                name
            )));
        }
        if self.column(&name).is_some() {
            return Err(BackendError::InvalidFrame(format!(
                "duplicate column {}",
                name
            )));
        }
        self.check_len(&name, values.len())?;
        self.columns.push(Column { name, values });
        Ok(self)
    }

    pub fn with_created_time(mut self, created_time: Vec<DBDateTime>) -> Result<Self> {
        self.check_len(CREATED_TIME_COLUMN, created_time.len())?;
        self.created_time = Some(created_time);
        Ok(self)
    }

    fn check_len(&self, name: &str, len: usize) -> Result<()> {
        if len != self.time.len() {
            return Err(BackendError::InvalidFrame(format!(
                "column {} has {} values but the time index has {}",
                name,
                len,
                self.time.len()
            )));
        }
        Ok(())
    }

    pub fn time(&self) -> &[DBDateTime] {
        &self.time
    }

    pub fn created_time(&self) -> Option<&[DBDateTime]> {
        self.created_time.as_deref()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Value of `column` at `ts`, taking the last row when the index repeats
    pub fn value_at(&self, ts: DBDateTime, column: &str) -> Option<&Value> {
        let values = self.column(column)?;
        self.time
            .iter()
            .rposition(|t| *t == ts)
            .and_then(|row| values.get(row))
    }

    pub fn rename_column(mut self, from: &str, to: impl Into<String>) -> Result<Self> {
        let to = to.into();
        if from != to && self.column(&to).is_some() {
            return Err(BackendError::InvalidFrame(format!("duplicate column {}", to)));
        }
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == from)
            .ok_or_else(|| BackendError::InvalidFrame(format!("no column named {}", from)))?;
        column.name = to;
        Ok(self)
    }

    /// Keep the time index, `created_time` and a single value column
    pub fn select(&self, name: &str) -> Result<Frame> {
        let values = self
            .column(name)
            .ok_or_else(|| BackendError::InvalidFrame(format!("no column named {}", name)))?;
        Ok(Frame {
            time: self.time.clone(),
            created_time: self.created_time.clone(),
            columns: vec![Column {
                name: name.to_string(),
                values: values.to_vec(),
            }],
        })
    }

    /// Combine frames on the union of their time indices.
    ///
    /// The result is sorted by time with one row per distinct timestamp;
    /// cells a frame has no observation for are `null`. Columns keep the
    /// order in which the frames were given. Within one input frame a
    /// repeated timestamp keeps its last row.
    pub fn outer_join(frames: Vec<Frame>) -> Result<Frame> {
        let index: Vec<DBDateTime> = frames
            .iter()
            .flat_map(|f| f.time.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let position: HashMap<DBDateTime, usize> =
            index.iter().enumerate().map(|(i, t)| (*t, i)).collect();

        let mut joined = Frame::new(index);
        for frame in frames {
            for column in frame.columns {
                let mut values = vec![Value::Null; joined.time.len()];
                for (ts, value) in frame.time.iter().zip(column.values) {
                    values[position[ts]] = value;
                }
                joined = joined.with_column(column.name, values)?;
            }
        }
        Ok(joined)
    }

    /// Two-frame outer join
    pub fn join(self, other: Frame) -> Result<Frame> {
        Frame::outer_join(vec![self, other])
    }

    /// Replace each `null` with the last non-null value above it in the same
    /// column. Leading nulls stay null.
    pub fn forward_fill(mut self) -> Frame {
        for column in &mut self.columns {
            let mut last: Option<Value> = None;
            for value in &mut column.values {
                if value.is_null() {
                    if let Some(prev) = &last {
                        *value = prev.clone();
                    }
                } else {
                    last = Some(value.clone());
                }
            }
        }
        self
    }
}
