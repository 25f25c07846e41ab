//! Core reassembly engine - verified apply and ordered flush.
//!
//! Pieces are submitted in any order. Each submission is hashed, matched
//! against the expected digest list, written to the backing file at its final
//! offset, and, once every earlier piece is present, forwarded to the sink.
//!
//! # Example
//!
//! ```
//! use chunkstitch::{HashAlgorithm, ReassemblyConfig, Reassembler};
//!
//! let algo = HashAlgorithm::default();
//! let digests = vec![algo.digest(b"AAAA"), algo.digest(b"BBBB")];
//! let config = ReassemblyConfig::new(4, 8)?;
//!
//! let reassembler = Reassembler::new(digests, config, Vec::new())?;
//! let completion = reassembler.take_completion().expect("first take");
//!
//! reassembler.apply(b"BBBB")?; // held back, piece 0 still missing
//! reassembler.apply(b"AAAA")?; // flushes both pieces in order
//!
//! let file = completion.wait()?;
//! assert_eq!(file.read_all()?, b"AAAABBBB");
//!
//! let sink = reassembler.cleanup()?;
//! assert_eq!(sink, b"AAAABBBB");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io::Write;
use std::sync::mpsc::SyncSender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::BytesMut;
use tracing::{debug, info, trace, warn};

use super::completion::{Completion, completion_channel};
use crate::chunk::{ChunkHash, ChunkTable, Lookup};
use crate::config::ReassemblyConfig;
use crate::error::ReassemblyError;
use crate::progress::Progress;
use crate::store::BackingFile;

/// Point-in-time counters of a [`Reassembler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReassemblyStatus {
    /// Total number of pieces.
    pub piece_count: usize,
    /// Pieces verified and written to the backing file.
    pub pieces_applied: usize,
    /// Bytes not yet written to the backing file.
    pub remaining_bytes: u64,
    /// Flush cursor: pieces `[0, flushed_pieces)` have reached the sink.
    pub flushed_pieces: usize,
    /// Bytes delivered to the sink.
    pub bytes_flushed: u64,
}

impl ReassemblyStatus {
    /// Returns true once every piece has been applied.
    pub fn is_complete(&self) -> bool {
        self.pieces_applied == self.piece_count
    }
}

/// Everything apply mutates, guarded by one lock.
struct State<W> {
    table: ChunkTable,
    progress: Progress,
    cursor: usize,
    pieces_applied: usize,
    remaining_bytes: u64,
    bytes_flushed: u64,
    sink: W,
    done_tx: Option<SyncSender<Arc<BackingFile>>>,
}

/// Verifies out-of-order pieces and streams them to `W` in order.
///
/// `Reassembler` is shared by reference between the threads that receive
/// pieces. [`Reassembler::apply`] runs entirely under one lock: lookup,
/// backing-file write, bookkeeping and the ordered flush observe a single
/// consistent state, so a piece is never written twice and the sink sees
/// every byte exactly once, in file order.
///
/// A slow sink stalls concurrent `apply` calls; that is the backpressure.
///
/// Completion fires once every piece is applied and the sink has accepted
/// all of them. After a sink error, any later `apply` (a resubmitted piece
/// included) retries the flush from the backing file.
///
/// The backing file lives until [`Reassembler::cleanup`] (or, failing that,
/// until the last handle to it is dropped).
pub struct Reassembler<W> {
    config: ReassemblyConfig,
    store: Arc<BackingFile>,
    state: Mutex<State<W>>,
    pub(super) pending: Mutex<BytesMut>,
    completion: Mutex<Option<Completion>>,
}

impl<W: Write> Reassembler<W> {
    /// Creates a reassembler for the pieces described by `digests`.
    ///
    /// `digests` must hold one digest per piece, in file order, produced with
    /// the configured hash algorithm.
    ///
    /// # Errors
    ///
    /// - [`ReassemblyError::InvalidConfig`] if the digest count does not
    ///   match the piece count
    /// - [`ReassemblyError::InvalidDigest`] if a digest has the wrong length
    /// - [`ReassemblyError::StoreAllocation`] if the backing file cannot be
    ///   created or sized
    pub fn new(
        digests: Vec<ChunkHash>,
        config: ReassemblyConfig,
        sink: W,
    ) -> Result<Self, ReassemblyError> {
        config.validate()?;
        let piece_count = config.piece_count();
        if digests.len() != piece_count {
            return Err(ReassemblyError::InvalidConfig {
                message: "digest list length does not match piece count",
            });
        }
        let digest_len = config.hash_algorithm().digest_len();
        if digests.iter().any(|d| d.len() != digest_len) {
            return Err(ReassemblyError::InvalidDigest {
                message: "digest length does not match hash algorithm",
            });
        }

        let store = BackingFile::create(config.spill_dir(), config.file_size())
            .map_err(ReassemblyError::StoreAllocation)?;
        let (done_tx, completion) = completion_channel();

        debug!(
            pieces = piece_count,
            chunk_size = config.chunk_size(),
            file_size = config.file_size(),
            "created reassembler"
        );

        let reassembler = Self {
            store: Arc::new(store),
            state: Mutex::new(State {
                table: ChunkTable::new(digests),
                progress: Progress::new(piece_count),
                cursor: 0,
                pieces_applied: 0,
                remaining_bytes: config.file_size(),
                bytes_flushed: 0,
                sink,
                done_tx: Some(done_tx),
            }),
            pending: Mutex::new(BytesMut::with_capacity(config.chunk_size())),
            completion: Mutex::new(Some(completion)),
            config,
        };

        if piece_count == 0 {
            let mut state = reassembler.lock_state()?;
            reassembler.settle(&mut state, None)?;
            drop(state);
        }
        Ok(reassembler)
    }

    /// Verifies `data` as one whole piece and applies it.
    ///
    /// Returns the number of bytes written to the backing file: `data.len()`
    /// for a newly applied piece, 0 for empty input or a piece that was
    /// already applied.
    ///
    /// # Errors
    ///
    /// - [`ReassemblyError::UnknownChunk`] if `data` matches no expected piece;
    ///   nothing is modified
    /// - [`ReassemblyError::Io`] if the backing file or the sink fails
    pub fn apply(&self, data: &[u8]) -> Result<usize, ReassemblyError> {
        match self.try_apply(data) {
            Err(ReassemblyError::AlreadyApplied { .. }) => Ok(0),
            result => result,
        }
    }

    /// Like [`Reassembler::apply`], but reports a redundant submission.
    ///
    /// # Errors
    ///
    /// Everything [`Reassembler::apply`] returns, plus
    /// [`ReassemblyError::AlreadyApplied`] when every piece matching `data`
    /// has already been applied. No piece is written in that case, though a
    /// backlog held up by an earlier sink error is flushed first; if that
    /// flush fails its error is returned instead.
    pub fn try_apply(&self, data: &[u8]) -> Result<usize, ReassemblyError> {
        if data.is_empty() {
            return Ok(0);
        }
        let digest = self.config.hash_algorithm().digest(data);

        let mut guard = self.lock_state()?;
        let state = &mut *guard;

        let index = match state.table.lookup(&digest) {
            Lookup::Found(index) if data.len() == self.config.piece_len(index) => index,
            Lookup::AlreadyApplied(index) => {
                trace!(index, "piece already applied");
                // Retries a backlog left by an earlier sink failure
                self.settle(state, None)?;
                return Err(ReassemblyError::AlreadyApplied { index });
            }
            Lookup::Found(_) | Lookup::Unknown => {
                warn!(len = data.len(), digest = %digest, "rejected unknown chunk");
                return Err(ReassemblyError::UnknownChunk {
                    len: data.len(),
                    chunk_size: self.config.chunk_size(),
                });
            }
        };

        self.store
            .write_all_at(data, self.config.piece_offset(index))?;

        state.table.mark_applied(index);
        state.progress.set(index);
        state.remaining_bytes -= data.len() as u64;
        state.pieces_applied += 1;
        debug!(
            index,
            len = data.len(),
            applied = state.pieces_applied,
            "applied piece"
        );

        self.settle(state, Some((index, data)))?;
        Ok(data.len())
    }

    /// Flushes what the cursor can reach, then completes once the sink holds
    /// every piece.
    ///
    /// Both steps are retried on every later call until they succeed.
    fn settle(
        &self,
        state: &mut State<W>,
        fresh: Option<(usize, &[u8])>,
    ) -> Result<(), ReassemblyError> {
        if state.cursor < state.table.len() {
            self.drain(state, fresh)?;
        }
        if state.cursor == state.table.len() {
            self.complete(state)?;
        }
        Ok(())
    }

    /// Forwards the contiguous run of applied pieces at the cursor to the sink.
    ///
    /// `fresh` is the piece just applied; when it sits at the cursor its bytes
    /// go straight to the sink instead of being read back. The cursor only
    /// moves past bytes the sink accepted.
    fn drain(
        &self,
        state: &mut State<W>,
        fresh: Option<(usize, &[u8])>,
    ) -> Result<(), ReassemblyError> {
        if let Some((index, data)) = fresh {
            if index == state.cursor {
                state.sink.write_all(data)?;
                state.cursor += 1;
                state.bytes_flushed += data.len() as u64;
            }
        }

        if !state.table.is_applied(state.cursor) {
            return Ok(());
        }

        let gap = state.table.first_gap_from(state.cursor);
        let start = self.config.piece_offset(state.cursor);
        let end = self.config.piece_range(gap - 1).end;

        let mut run = vec![0u8; (end - start) as usize];
        self.store.read_exact_at(&mut run, start)?;
        state.sink.write_all(&run)?;

        debug!(from = state.cursor, to = gap, bytes = run.len(), "flushed run");
        state.cursor = gap;
        state.bytes_flushed += run.len() as u64;
        Ok(())
    }

    /// Syncs the backing file, flushes the sink and fires the completion
    /// signal. The signal is kept for a later retry if either step fails.
    fn complete(&self, state: &mut State<W>) -> Result<(), ReassemblyError> {
        if state.done_tx.is_none() {
            return Ok(());
        }
        self.store.sync_all()?;
        state.sink.flush()?;

        if let Some(done_tx) = state.done_tx.take() {
            // Capacity one and a single send: never blocks. A dropped
            // receiver just means nobody is waiting.
            let _ = done_tx.try_send(Arc::clone(&self.store));
        }
        info!(
            pieces = state.table.len(),
            bytes = self.config.file_size(),
            path = %self.store.path().display(),
            "reassembly complete"
        );
        Ok(())
    }

    /// Removes the backing file and returns the sink.
    ///
    /// Handles obtained from [`Reassembler::backing_file`] or the completion
    /// signal stay readable until dropped, but the file is gone from disk.
    pub fn cleanup(self) -> Result<W, ReassemblyError> {
        let Reassembler { store, state, .. } = self;
        store.remove()?;
        let state = state.into_inner().unwrap_or_else(PoisonError::into_inner);
        Ok(state.sink)
    }
}

impl<W> Reassembler<W> {
    /// Takes the completion handle. Returns `None` after the first call.
    pub fn take_completion(&self) -> Option<Completion> {
        self.completion
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Snapshot of which pieces have been applied.
    pub fn progress(&self) -> Progress {
        self.read_state(|state| state.progress.clone())
    }

    /// Snapshot of the reassembly counters.
    pub fn status(&self) -> ReassemblyStatus {
        self.read_state(|state| ReassemblyStatus {
            piece_count: state.table.len(),
            pieces_applied: state.pieces_applied,
            remaining_bytes: state.remaining_bytes,
            flushed_pieces: state.cursor,
            bytes_flushed: state.bytes_flushed,
        })
    }

    /// Handle to the backing file, complete or not.
    pub fn backing_file(&self) -> Arc<BackingFile> {
        Arc::clone(&self.store)
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ReassemblyConfig {
        &self.config
    }

    pub(super) fn remaining_bytes(&self) -> u64 {
        self.read_state(|state| state.remaining_bytes)
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, State<W>>, ReassemblyError> {
        self.state.lock().map_err(|_| ReassemblyError::Poisoned)
    }

    fn read_state<T>(&self, f: impl FnOnce(&State<W>) -> T) -> T {
        let guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }
}
