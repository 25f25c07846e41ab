//! Async ingestion support.
//!
//! This module drives a [`Reassembler`](crate::Reassembler) from a
//! `futures-io::AsyncRead` source, making it runtime-agnostic and compatible
//! with tokio, async-std, smol, and other async runtimes.
//!
//! - [`ingest_async`] - Future that pumps an async reader into a reassembler
//!
//! This module requires the `async-io` feature to be enabled.

mod ingest;

pub use ingest::{IngestFuture, ingest_async};
