use std::collections::BTreeMap;

use crate::engine::StoreState;
use crate::error::{KvsError, Result};

/// serializes `state` into a JSON object followed by a newline.
///
/// Keys are written in sorted order, so equal states always encode to the same bytes.
pub fn encode(state: &StoreState) -> Result<Vec<u8>> {
    let sorted: BTreeMap<&String, &String> = state.iter().collect();
    let mut bytes = serde_json::to_vec(&sorted)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// deserializes a snapshot produced by [`encode`] (or any JSON object of strings).
///
/// # Errors
/// returns `KvsError::Parse` if `bytes` is not a JSON object, contains non-string values, is
/// truncated or is not valid UTF-8
pub fn decode(bytes: &[u8]) -> Result<StoreState> {
    serde_json::from_slice(bytes).map_err(KvsError::Parse)
}
