//! Common error types used across all Bytehub services

use sea_orm::DbErr;
use thiserror::Error;

/// Errors raised by the feature store and its catalog
#[derive(Error, Debug)]
pub enum StoreError {
    /// Malformed feature identifier
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Missing mandatory argument: {0}")]
    MissingArgument(String),

    #[error("No existing {kind} named {name}{}", in_namespace(.namespace))]
    NotFound {
        kind: &'static str,
        namespace: Option<String>,
        name: String,
    },

    #[error("{kind} named {name} already exists{}", in_namespace(.namespace))]
    AlreadyExists {
        kind: &'static str,
        namespace: Option<String>,
        name: String,
    },

    /// More than one catalog row matched a filter that must be unique
    #[error("{count} {kind} records named {name} match; specify a namespace")]
    AmbiguousMatch {
        kind: &'static str,
        name: String,
        count: usize,
    },

    #[error("{0} namespace does not exist")]
    NamespaceNotFound(String),

    #[error("No feature named {name}{}", in_namespace(.namespace))]
    FeatureNotFound {
        namespace: Option<String>,
        name: String,
    },

    #[error("{0} still contains features: these must be deleted first")]
    NonEmptyNamespace(String),

    #[error("{0} has not been implemented")]
    NotImplemented(&'static str),

    #[error("Database error: {reason}")]
    Database { reason: String },

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

fn in_namespace(namespace: &Option<String>) -> String {
    match namespace {
        Some(ns) => format!(" in {}", ns),
        None => String::new(),
    }
}

impl StoreError {
    pub fn not_found(
        kind: &'static str,
        namespace: Option<&str>,
        name: impl Into<String>,
    ) -> Self {
        StoreError::NotFound {
            kind,
            namespace: namespace.map(str::to_string),
            name: name.into(),
        }
    }

    pub fn feature_not_found(namespace: Option<&str>, name: impl Into<String>) -> Self {
        StoreError::FeatureNotFound {
            namespace: namespace.map(str::to_string),
            name: name.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        StoreError::InvalidInput(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        StoreError::InvalidArgument(msg.into())
    }
}

impl From<DbErr> for StoreError {
    fn from(error: DbErr) -> Self {
        StoreError::Database {
            reason: error.to_string(),
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_namespace() {
        let err = StoreError::not_found("Feature", Some("demo"), "price");
        assert_eq!(err.to_string(), "No existing Feature named price in demo");

        let err = StoreError::not_found("Namespace", None, "demo");
        assert_eq!(err.to_string(), "No existing Namespace named demo");
    }

    #[test]
    fn test_db_error_conversion() {
        let err: StoreError = DbErr::Custom("boom".to_string()).into();
        assert!(matches!(err, StoreError::Database { .. }));
        assert!(err.to_string().contains("boom"));
    }
}
