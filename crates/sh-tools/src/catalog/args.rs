//! Small shared argument-parsing helpers for catalog validators. Every
//! tool's `validate` is built from these so the error messages stay
//! consistent across the catalog.

use serde_json::Value;

use crate::dispatcher::validation_error;
use sh_domain::error::Result;

pub fn required_str(raw: &Value, field: &str) -> Result<String> {
    raw.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| validation_error(format!("'{field}' is required and must be a non-empty string")))
}

pub fn optional_usize(raw: &Value, field: &str, default: usize, max: usize) -> Result<usize> {
    match raw.get(field) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => {
            let n = v
                .as_i64()
                .ok_or_else(|| validation_error(format!("'{field}' must be an integer")))?;
            if n < 0 {
                return Err(validation_error(format!("'{field}' must be non-negative")));
            }
            Ok((n as usize).min(max))
        }
    }
}
