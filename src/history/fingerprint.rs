//! Content Fingerprints
//!
//! Two versions of a row are "the same" iff every tracked column compares
//! equal, null-safely (null equals null, and an absent column reads as
//! null). The fingerprint is a SHA-256 over a canonical encoding of the
//! tracked values, so equality checks reduce to comparing two hex strings.

use crate::error::{AppError, AppResult};
use crate::extract::SourceRow;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Compute the fingerprint of a source row over the tracked columns.
///
/// Columns are hashed in sorted name order so the configured column order
/// never changes the result. Values outside `tracked_columns` do not
/// participate.
pub fn compute_fingerprint(row: &SourceRow, tracked_columns: &[String]) -> AppResult<String> {
    let mut columns: Vec<&String> = tracked_columns.iter().collect();
    columns.sort();
    columns.dedup();

    let mut hasher = Sha256::new();
    for column in columns {
        let encoded = encode_scalar(row.value(column)).map_err(|detail| {
            AppError::Fingerprint(format!(
                "Column '{}' of row '{}' {}",
                column, row.id, detail
            ))
        })?;
        hasher.update(column.as_bytes());
        hasher.update([0x1f]);
        hasher.update(encoded.as_bytes());
        hasher.update([0x1e]);
    }

    let result = hasher.finalize();
    Ok(format!("{:x}", result))
}

/// Canonical, type-tagged encoding of a scalar value. The tag keeps the
/// string "42" from colliding with the number 42, and "null" from colliding
/// with an actual null.
fn encode_scalar(value: &Value) -> Result<String, String> {
    match value {
        Value::Null => Ok("~".to_string()),
        Value::Bool(b) => Ok(format!("b:{}", b)),
        Value::Number(n) => Ok(format!("n:{}", n)),
        Value::String(s) => Ok(format!("s:{}", s)),
        Value::Array(_) => Err("holds an array, which cannot be fingerprinted".to_string()),
        Value::Object(_) => Err("holds a nested object, which cannot be fingerprinted".to_string()),
    }
}
