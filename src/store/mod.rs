//! Backing storage for pieces that arrive ahead of the flush cursor.
//!
//! - [`BackingFile`] - Temporary file with positioned reads and writes

mod file;

pub use file::BackingFile;
