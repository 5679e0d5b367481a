//! Custom types for common data structures

use chrono::{DateTime as ChronoDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Database DateTime type used across all Bytehub crates
///
/// This is the canonical datetime type for:
/// - Catalog TIMESTAMPTZ columns
/// - Time-series `time` and `created_time` values
pub type DBDateTime = ChronoDateTime<Utc>;

/// Separator between namespace and feature name in qualified identifiers
pub const NAME_SEPARATOR: char = '/';

/// Canonical identity of a feature: a `(namespace, name)` pair.
///
/// `namespace` is optional because an identifier can be resolved without a
/// default namespace; catalog lookups reject references that are still
/// unqualified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FeatureRef {
    pub namespace: Option<String>,
    pub name: String,
}

impl FeatureRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    pub fn unqualified(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    /// Column header used for this feature in loaded frames
    pub fn column_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FeatureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}{}{}", ns, NAME_SEPARATOR, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
