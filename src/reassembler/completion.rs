//! One-shot completion handle.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TryRecvError, sync_channel};
use std::time::Duration;

use crate::error::ReassemblyError;
use crate::store::BackingFile;

/// Creates the sending and receiving halves of a completion signal.
///
/// The channel holds exactly one value, so the single send never blocks.
pub(crate) fn completion_channel() -> (SyncSender<Arc<BackingFile>>, Completion) {
    let (tx, rx) = sync_channel(1);
    (tx, Completion { rx, fired: false })
}

/// Fires once, when every piece has been applied and the backing file has
/// been synced.
///
/// Carries the finished [`BackingFile`]. If the reassembler is dropped before
/// completing, waiting returns [`ReassemblyError::Abandoned`].
#[derive(Debug)]
pub struct Completion {
    rx: Receiver<Arc<BackingFile>>,
    fired: bool,
}

impl Completion {
    /// Blocks until the file is complete.
    pub fn wait(self) -> Result<Arc<BackingFile>, ReassemblyError> {
        self.rx.recv().map_err(|_| ReassemblyError::Abandoned)
    }

    /// Blocks for at most `timeout`. Returns `Ok(None)` on timeout.
    ///
    /// Yields the file at most once; later calls return `Ok(None)`.
    pub fn wait_timeout(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<Arc<BackingFile>>, ReassemblyError> {
        if self.fired {
            return Ok(None);
        }
        match self.rx.recv_timeout(timeout) {
            Ok(file) => {
                self.fired = true;
                Ok(Some(file))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ReassemblyError::Abandoned),
        }
    }

    /// Returns the file if completion has already fired.
    ///
    /// Yields the file at most once; later calls return `Ok(None)`.
    pub fn try_wait(&mut self) -> Result<Option<Arc<BackingFile>>, ReassemblyError> {
        if self.fired {
            return Ok(None);
        }
        match self.rx.try_recv() {
            Ok(file) => {
                self.fired = true;
                Ok(Some(file))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ReassemblyError::Abandoned),
        }
    }
}
