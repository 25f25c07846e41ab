//! chunkstitch
//!
//! Verified out-of-order chunk reassembly for Rust.
//!
//! `chunkstitch` rebuilds a file from pieces that arrive in any order. The
//! caller supplies the ordered list of expected piece digests up front; every
//! submitted piece is hashed and matched against that list, staged in a
//! temporary backing file at its final offset, and streamed to an output
//! writer strictly in file order as soon as a contiguous run is available.
//!
//! It is designed as a small building block for:
//!
//! - BitTorrent-style piece downloads
//! - multi-source / multi-connection fetchers
//! - content-addressed transfer protocols
//!
//! The crate intentionally:
//! - does NOT talk to the network
//! - does NOT discover chunk boundaries (sizes are given up front)
//! - does NOT spawn threads (callers share a `&Reassembler`)
//! - does NOT persist state across restarts
//!
//! It only does one thing: **Pieces in any order → verified bytes in order**
//!
//! # Sync
//!
//! ```
//! use chunkstitch::{digest_pieces, HashAlgorithm, ReassemblyConfig, Reassembler};
//!
//! let original = b"AAAABBBBCCCC";
//! let algo = HashAlgorithm::default();
//! let digests = digest_pieces(&original[..], 4, algo)?;
//!
//! let config = ReassemblyConfig::new(4, original.len() as u64)?;
//! let reassembler = Reassembler::new(digests, config, Vec::new())?;
//!
//! for piece in [&b"CCCC"[..], b"AAAA", b"BBBB"] {
//!     reassembler.apply(piece)?;
//! }
//!
//! assert_eq!(reassembler.cleanup()?, original);
//! # Ok::<(), chunkstitch::ReassemblyError>(())
//! ```
//!
//! # Async (feature = "async-io")
//!
//! ```ignore
//! use chunkstitch::{ingest_async, Reassembler};
//! use futures_io::AsyncRead;
//!
//! async fn demo<R: AsyncRead>(reader: R, reassembler: &Reassembler<Vec<u8>>)
//!     -> Result<(), chunkstitch::ReassemblyError>
//! {
//!     ingest_async(reader, reassembler).await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod chunk;
mod config;
mod error;
mod hash;
mod progress;
mod reassembler;
mod store;

mod buffer; // internal (thread-local read windows)

#[cfg(feature = "async-io")]
mod async_stream;

//
// Public surface
//

pub use chunk::{ChunkHash, split_concatenated};
pub use config::ReassemblyConfig;
pub use error::ReassemblyError;
pub use hash::{HashAlgorithm, PieceHasher, digest_pieces};
pub use progress::Progress;
pub use reassembler::{Completion, ReassemblyStatus, Reassembler};
pub use store::BackingFile;

#[cfg(feature = "hash-blake3")]
pub use hash::Blake3Hasher;
#[cfg(feature = "hash-sha1")]
pub use hash::Sha1Hasher;

#[cfg(feature = "async-io")]
pub use async_stream::{IngestFuture, ingest_async};
