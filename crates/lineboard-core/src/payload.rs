use crate::Snapshot;
use thiserror::Error;

pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("payload too large: {size} bytes exceeds max {max}")]
    Oversized { size: usize, max: usize },
}

/// Parses one transport payload into a [`Snapshot`].
///
/// Only the structural shape is checked. Unknown fields are ignored.
pub fn decode_snapshot(raw: &str, max_payload_bytes: usize) -> Result<Snapshot, PayloadError> {
    let raw = raw.trim_end_matches(['\n', '\r']);
    if raw.len() > max_payload_bytes {
        return Err(PayloadError::Oversized {
            size: raw.len(),
            max: max_payload_bytes,
        });
    }
    serde_json::from_str(raw).map_err(|err| PayloadError::Malformed(err.to_string()))
}
