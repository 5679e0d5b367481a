//! Argument validation for dynamically supplied operation options

use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// Check a set of supplied option names against what an operation accepts.
///
/// Fails with `InvalidArgument` on the first unrecognised key and with
/// `MissingArgument` on the first absent mandatory key. Has no side effects,
/// so callers run it before touching the catalog.
pub fn validate_kwargs(
    args: &Map<String, Value>,
    valid: &[&str],
    mandatory: &[&str],
) -> StoreResult<()> {
    if let Some(unknown) = args.keys().find(|k| !valid.contains(&k.as_str())) {
        return Err(StoreError::InvalidArgument(unknown.clone()));
    }
    if let Some(missing) = mandatory.iter().find(|k| !args.contains_key(**k)) {
        return Err(StoreError::MissingArgument(missing.to_string()));
    }
    Ok(())
}
