//! Error types for chunkstitch.

use std::fmt;
use std::io;

/// Errors that can occur while reassembling a file.
#[derive(Debug)]
pub enum ReassemblyError {
    /// Reading or writing the backing file or the output sink failed.
    Io(io::Error),

    /// The backing file could not be created or sized.
    StoreAllocation(io::Error),

    /// The submitted bytes do not hash to any expected piece.
    UnknownChunk {
        /// Length of the rejected submission.
        len: usize,
        /// Configured chunk size.
        chunk_size: usize,
    },

    /// The submitted bytes match a piece that has already been applied.
    AlreadyApplied {
        /// Index of the matching piece.
        index: usize,
    },

    /// Invalid configuration parameter.
    InvalidConfig {
        /// Description of what was invalid.
        message: &'static str,
    },

    /// A digest or digest list could not be parsed.
    InvalidDigest {
        /// Description of what was invalid.
        message: &'static str,
    },

    /// A thread panicked while holding the reassembly lock.
    Poisoned,

    /// The reassembler went away before every piece was applied.
    Abandoned,
}

impl ReassemblyError {
    /// Returns true if the error means the bytes failed verification.
    ///
    /// Verification failures leave the reassembler untouched; the caller may
    /// resubmit different bytes.
    pub fn is_verification_failure(&self) -> bool {
        matches!(self, ReassemblyError::UnknownChunk { .. })
    }
}

impl fmt::Display for ReassemblyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReassemblyError::Io(e) => write!(f, "io error: {}", e),
            ReassemblyError::StoreAllocation(e) => {
                write!(f, "failed to allocate backing file: {}", e)
            }
            ReassemblyError::UnknownChunk { len, chunk_size } => {
                write!(f, "got unknown chunk, size {}, chunk size {}", len, chunk_size)
            }
            ReassemblyError::AlreadyApplied { index } => {
                write!(f, "piece {} already applied", index)
            }
            ReassemblyError::InvalidConfig { message } => {
                write!(f, "invalid config: {}", message)
            }
            ReassemblyError::InvalidDigest { message } => {
                write!(f, "invalid digest: {}", message)
            }
            ReassemblyError::Poisoned => write!(f, "reassembly state lock poisoned"),
            ReassemblyError::Abandoned => {
                write!(f, "reassembler dropped before all pieces were applied")
            }
        }
    }
}

impl std::error::Error for ReassemblyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReassemblyError::Io(e) | ReassemblyError::StoreAllocation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ReassemblyError {
    fn from(e: io::Error) -> Self {
        ReassemblyError::Io(e)
    }
}

impl From<ReassemblyError> for io::Error {
    fn from(e: ReassemblyError) -> Self {
        match e {
            ReassemblyError::Io(inner) | ReassemblyError::StoreAllocation(inner) => inner,
            ReassemblyError::UnknownChunk { .. } | ReassemblyError::InvalidDigest { .. } => {
                io::Error::new(io::ErrorKind::InvalidData, e)
            }
            ReassemblyError::InvalidConfig { .. } => io::Error::new(io::ErrorKind::InvalidInput, e),
            _ => io::Error::other(e),
        }
    }
}
