//! Conversion of a [`StoreState`] to and from its durable form: a single JSON object whose
//! fields are the store's keys and whose values are the corresponding value strings.
//!
//! ```text
//! {"a":"1","b":"2"}
//! ```
//!
//! There is no envelope, metadata or schema version. The file is fully rewritten on every
//! backup cycle, see [`write_atomic`].
//!
//! [`StoreState`]: crate::StoreState

mod codec;
mod file;

pub use self::codec::{decode, encode};
pub use self::file::{load, write_atomic};
