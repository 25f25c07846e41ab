//! Internal buffer management for reader-driven ingestion.
//!
//! This module provides a thread-local pool of read windows to avoid
//! allocating on every `ingest_reader` or `digest_pieces` call. It is an
//! implementation detail and not part of the public API.

mod pool;

pub(crate) use pool::Buffer;
