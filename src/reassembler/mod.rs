//! Verified reassembly of out-of-order pieces.
//!
//! - [`Reassembler`] - Applies pieces, stages them on disk, streams them in order
//! - [`Completion`] - One-shot signal carrying the finished backing file
//! - [`ReassemblyStatus`] - Counter snapshot

mod completion;
mod engine;
mod ingest;

pub use completion::Completion;
pub use engine::{ReassemblyStatus, Reassembler};
