//! Configuration for reassembly.
//!
//! [`ReassemblyConfig`] fixes the piece geometry (chunk size and total file
//! size), the digest algorithm the expected piece list was built with, and
//! where the backing file lives.
//!
//! # Example
//!
//! ```
//! use chunkstitch::{HashAlgorithm, ReassemblyConfig};
//!
//! let config = ReassemblyConfig::new(4, 10)?
//!     .with_hash_algorithm(HashAlgorithm::default());
//!
//! assert_eq!(config.piece_count(), 3);
//! assert_eq!(config.piece_len(2), 2);
//! # Ok::<(), chunkstitch::ReassemblyError>(())
//! ```

use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::error::ReassemblyError;
use crate::hash::HashAlgorithm;

/// Piece geometry and storage settings for one reassembly.
///
/// Piece `i` covers bytes `[i * chunk_size, min((i + 1) * chunk_size, file_size))`
/// of the reconstructed file. Only the last piece may be shorter than
/// `chunk_size`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReassemblyConfig {
    /// Size of every piece except possibly the last.
    chunk_size: usize,

    /// Total size of the reconstructed file.
    file_size: u64,

    /// Digest algorithm of the expected piece list.
    hash_algorithm: HashAlgorithm,

    /// Directory for the backing file; system temp dir when `None`.
    spill_dir: Option<PathBuf>,
}

impl ReassemblyConfig {
    /// Creates a configuration for a file of `file_size` bytes split into
    /// `chunk_size`-byte pieces.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::InvalidConfig`] if `chunk_size` is zero or
    /// the piece count does not fit in `usize`.
    pub fn new(chunk_size: usize, file_size: u64) -> Result<Self, ReassemblyError> {
        let config = Self {
            chunk_size,
            file_size,
            hash_algorithm: HashAlgorithm::default(),
            spill_dir: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Sets the digest algorithm.
    pub fn with_hash_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.hash_algorithm = algorithm;
        self
    }

    /// Places the backing file in `dir` instead of the system temp dir.
    pub fn with_spill_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.spill_dir = Some(dir.into());
        self
    }

    /// Returns the chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the total file size.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Returns the digest algorithm.
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash_algorithm
    }

    /// Returns the backing file directory, if one was set.
    pub fn spill_dir(&self) -> Option<&Path> {
        self.spill_dir.as_deref()
    }

    /// Number of pieces the file splits into.
    pub fn piece_count(&self) -> usize {
        // validate() guarantees this fits
        self.file_size.div_ceil(self.chunk_size as u64) as usize
    }

    /// Byte offset of piece `index`.
    pub fn piece_offset(&self, index: usize) -> u64 {
        index as u64 * self.chunk_size as u64
    }

    /// Length of piece `index`; zero past the end of the file.
    pub fn piece_len(&self, index: usize) -> usize {
        let range = self.piece_range(index);
        (range.end - range.start) as usize
    }

    /// Byte range of piece `index`, clamped to the file size.
    pub fn piece_range(&self, index: usize) -> Range<u64> {
        let start = self.piece_offset(index).min(self.file_size);
        let end = (start + self.chunk_size as u64).min(self.file_size);
        start..end
    }

    /// Length of the final piece, or zero for an empty file.
    pub fn last_piece_len(&self) -> usize {
        match self.piece_count() {
            0 => 0,
            n => self.piece_len(n - 1),
        }
    }

    /// Validates the current configuration.
    pub fn validate(&self) -> Result<(), ReassemblyError> {
        if self.chunk_size == 0 {
            return Err(ReassemblyError::InvalidConfig {
                message: "chunk size must be non-zero",
            });
        }
        if usize::try_from(self.file_size.div_ceil(self.chunk_size as u64)).is_err() {
            return Err(ReassemblyError::InvalidConfig {
                message: "piece count does not fit in usize",
            });
        }
        Ok(())
    }
}
