//! Chunk types.
//!
//! - [`ChunkHash`] - Expected digest of one piece (up to 32 bytes)
//! - [`split_concatenated`] - Parse a concatenated digest list
//! - `ChunkTable` - Ordered expected pieces and their applied flags (internal)

mod hash;
mod table;

pub use hash::{ChunkHash, split_concatenated};
pub(crate) use table::{ChunkTable, Lookup};
