//! # CompactMap - A memory-compact ordered map with record queries
//!
//! CompactMap keeps key/value entries in capacity-bounded sorted chunks instead
//! of per-entry nodes, trading a little lookup time for a much smaller memory
//! footprint on maps with millions of small entries.
//!
//! ## Architecture
//!
//! - **Codec**: Fixed little-endian binary encoding of keys and values
//! - **ChunkedMap**: Thread-safe map built from sorted chunks
//! - **Persistence**: Whole-map snapshot files with a simple length-prefixed layout
//! - **Query**: Field lookup by name (including dotted paths) and predicate matching
//! - **RecordStore**: Records keyed by an auto-incremented id, with find/update queries
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use compactmap::{ChunkedMap, Options};
//!
//! # fn main() -> Result<(), compactmap::Error> {
//! let map = ChunkedMap::with_options(Options::default().chunk_capacity(512));
//!
//! map.set(2i64, "two".to_string());
//! map.set(1i64, "one".to_string());
//!
//! if let Some(value) = map.get(&1) {
//!     println!("Found: {}", value);
//! }
//!
//! map.save("./numbers.db")?;
//!
//! let restored = ChunkedMap::<i64, String>::open("./numbers.db", Options::default())?;
//! assert_eq!(restored.count(), 2);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
#[macro_use]
mod macros;

pub mod codec;
pub mod config;
pub mod error;
pub mod map;
pub mod persist;
pub mod query;
pub mod store;

// Re-exports
pub use codec::{Codec, Kind, Value};
pub use config::Options;
pub use error::{Error, Result};
pub use map::{ChunkedMap, Entry, MapStats};
pub use query::{Condition, FieldMap, FindCondition, Op};
pub use store::{Record, RecordStore};
