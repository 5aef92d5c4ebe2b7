use serde::{Deserialize, Serialize};

use crate::engine::StoreState;
use crate::{KvsError, Result};

/// These are the request "commands" that can be made to a key/value store
#[derive(Debug, Serialize, Deserialize)]
pub enum Request {
    /// get a value from the store
    Get {
        /// the key to search for
        key: String,
    },
    /// list every key/value pair in the store
    List,
    /// delete a key/value from the store
    Delete {
        /// the key to delete
        key: String,
    },
    /// insert or overwrite a batch of key/values in the store
    Upsert {
        /// the key/values to apply
        items: StoreState,
    },
}

/// The response Types that can be returned for any KVS Request
#[derive(Debug, Serialize, Deserialize)]
pub enum Response {
    /// a successful `Get` (the value) or `Delete` (the removed value)
    Ok(String),
    /// a successful `List` (the whole store) or `Upsert` (the applied items)
    Items(StoreState),
    /// the requested key is not in the store
    NotFound(String),
    /// this variant is returned if an Error occurs while processing the request
    Err(String),
}

/// parses `KEY=VALUE` pairs into the items of an upsert.
/// The value is everything after the first `=` and may be empty. When a key is given more than
/// once, the last value wins.
///
/// # Errors
/// returns `KvsError::Parsing` if a pair has no `=` or an empty key
pub fn parse_pairs<'a, I>(pairs: I) -> Result<StoreState>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut items = StoreState::new();
    for pair in pairs {
        match pair.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                items.insert(key.to_string(), value.to_string());
            }
            _ => {
                return Err(KvsError::Parsing(format!(
                    "expected KEY=VALUE but got: {}",
                    pair
                )))
            }
        }
    }
    Ok(items)
}
