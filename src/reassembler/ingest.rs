//! Streaming ingestion - slices an arbitrary byte stream into pieces.
//!
//! The stream must start on a piece boundary. Bytes are accumulated until a
//! full piece (or the short final piece) is available and then applied. No
//! resynchronisation is attempted: if the stream is misaligned every block
//! fails verification.

use std::io::{self, Read, Write};
use std::sync::{MutexGuard, PoisonError};

use bytes::{Buf, BytesMut};
use tracing::warn;

use super::engine::Reassembler;
use crate::buffer::Buffer;
use crate::error::ReassemblyError;

impl<W: Write> Reassembler<W> {
    /// Feeds stream bytes of any length.
    ///
    /// Every complete piece in the accumulated bytes is applied in arrival
    /// order; an unaligned tail is kept for the next call. Returns
    /// `data.len()` once the bytes have been accepted.
    ///
    /// # Errors
    ///
    /// A block that fails verification is dropped from the accumulation
    /// buffer and its error returned. On an I/O error the block stays
    /// buffered so a later call can retry it.
    pub fn ingest(&self, data: &[u8]) -> Result<usize, ReassemblyError> {
        let mut pending = self.lock_pending()?;
        pending.extend_from_slice(data);

        let chunk_size = self.config().chunk_size();
        let file_size = self.config().file_size();

        // Whole file fits in one piece: apply once every byte is here
        if file_size <= chunk_size as u64 {
            if pending.len() as u64 == file_size {
                self.apply_block(&mut pending, file_size as usize)?;
            }
            return Ok(data.len());
        }

        while pending.len() >= chunk_size {
            self.apply_block(&mut pending, chunk_size)?;
        }

        // Short final piece: only once it is exactly the bytes still missing
        let tail = pending.len();
        if tail > 0 && tail < chunk_size && self.remaining_bytes() == tail as u64 {
            self.apply_block(&mut pending, tail)?;
        }
        Ok(data.len())
    }

    /// Applies whatever is left in the accumulation buffer.
    ///
    /// Call this when the stream has ended. Same error policy as
    /// [`Reassembler::ingest`].
    pub fn flush_pending(&self) -> Result<(), ReassemblyError> {
        let mut pending = self.lock_pending()?;
        let len = pending.len();
        if len > 0 {
            self.apply_block(&mut pending, len)?;
        }
        Ok(())
    }

    /// Ingests everything `reader` yields, then flushes the remainder.
    ///
    /// Returns the number of bytes read.
    pub fn ingest_reader<R: Read>(&self, mut reader: R) -> Result<u64, ReassemblyError> {
        let mut buffer = Buffer::take();
        let mut total = 0u64;
        loop {
            let n = match reader.read(buffer.as_mut_slice()) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.ingest(buffer.filled(n))?;
            total += n as u64;
        }
        self.flush_pending()?;
        Ok(total)
    }

    /// Number of bytes waiting in the accumulation buffer.
    pub fn pending_len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Applies the first `len` buffered bytes, consuming them unless the
    /// failure was an I/O error.
    fn apply_block(&self, pending: &mut BytesMut, len: usize) -> Result<(), ReassemblyError> {
        match self.apply(&pending[..len]) {
            Ok(_) => {
                pending.advance(len);
                Ok(())
            }
            Err(e) if e.is_verification_failure() => {
                warn!(len, "dropping block that failed verification");
                pending.advance(len);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    fn lock_pending(&self) -> Result<MutexGuard<'_, BytesMut>, ReassemblyError> {
        self.pending.lock().map_err(|_| ReassemblyError::Poisoned)
    }
}

impl<W: Write> Write for &Reassembler<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.ingest(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.flush_pending()?)
    }
}

impl<W: Write> Write for Reassembler<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.ingest(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.flush_pending()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReassemblyConfig;
    use crate::hash::{HashAlgorithm, digest_pieces};

    fn setup(data: &[u8], chunk_size: usize) -> Reassembler<Vec<u8>> {
        let algo = HashAlgorithm::default();
        let digests = digest_pieces(data, chunk_size, algo).unwrap();
        let config = ReassemblyConfig::new(chunk_size, data.len() as u64).unwrap();
        Reassembler::new(digests, config, Vec::new()).unwrap()
    }

    #[test]
    fn test_ingest_byte_at_a_time() {
        let data = b"AAAABBBBCC";
        let r = setup(data, 4);
        for byte in data.iter() {
            assert_eq!(r.ingest(std::slice::from_ref(byte)).unwrap(), 1);
            assert!(r.pending_len() < 4);
        }
        assert!(r.status().is_complete());
        assert_eq!(r.pending_len(), 0);
        assert_eq!(r.cleanup().unwrap(), data);
    }

    #[test]
    fn test_ingest_whole_stream_at_once() {
        let data = b"AAAABBBBCCCC";
        let r = setup(data, 4);
        r.ingest(data).unwrap();
        assert!(r.status().is_complete());
        assert_eq!(r.cleanup().unwrap(), data);
    }

    #[test]
    fn test_small_file_applied_directly() {
        let r = setup(b"tiny", 16);
        r.ingest(b"ti").unwrap();
        assert_eq!(r.pending_len(), 2);
        r.ingest(b"ny").unwrap();
        assert!(r.status().is_complete());
        assert_eq!(r.pending_len(), 0);
    }

    #[test]
    fn test_flush_pending_applies_remainder() {
        let data = b"AAAABBBBCC";
        let r = setup(data, 4);
        r.apply(b"CC").unwrap();
        r.ingest(b"AAAABB").unwrap();
        assert_eq!(r.pending_len(), 2);

        // "BB" alone is not a piece
        assert!(r.flush_pending().unwrap_err().is_verification_failure());
        assert_eq!(r.pending_len(), 0);

        r.ingest(b"BBBB").unwrap();
        assert!(r.status().is_complete());
    }

    #[test]
    fn test_bad_block_is_dropped() {
        let r = setup(b"AAAABBBB", 4);
        let err = r.ingest(b"XXXXBB").unwrap_err();
        assert!(err.is_verification_failure());
        assert_eq!(r.pending_len(), 2);
    }

    #[test]
    fn test_short_tail_flushed_on_its_own() {
        // The short final piece arrives on its own stream first
        let data = b"AAAABBBBCC";
        let r = setup(data, 4);
        r.ingest(b"CC").unwrap();
        assert_eq!(r.pending_len(), 2);
        assert_eq!(r.status().pieces_applied, 0);

        r.flush_pending().unwrap();
        assert_eq!(r.pending_len(), 0);
        assert_eq!(r.status().pieces_applied, 1);

        r.ingest(b"AAAABBBB").unwrap();
        assert!(r.status().is_complete());
        assert_eq!(r.cleanup().unwrap(), data);
    }

    #[test]
    fn test_tail_matching_earlier_prefix_waits_for_its_turn() {
        // The final piece "BB" equals the first half of piece 1
        let data = b"AAAABBCCBB";
        let r = setup(data, 4);
        for byte in data.iter() {
            r.ingest(std::slice::from_ref(byte)).unwrap();
        }
        r.flush_pending().unwrap();

        let status = r.status();
        assert!(status.is_complete());
        assert_eq!(status.flushed_pieces, 3);
        assert_eq!(r.cleanup().unwrap(), data);
    }

    #[test]
    fn test_pending_len_survives_poisoned_lock() {
        let r = setup(b"AAAABBBB", 4);
        r.ingest(b"AA").unwrap();

        let _ = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _guard = r.pending.lock().unwrap();
                    panic!("poison the accumulation buffer");
                })
                .join()
        });

        assert_eq!(r.pending_len(), 2);
        assert!(matches!(r.ingest(b"AA"), Err(ReassemblyError::Poisoned)));
    }

    #[test]
    fn test_ingest_reader_and_write_impl() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 253) as u8).collect();
        let r = setup(&data, 1000);
        assert_eq!(r.ingest_reader(&data[..]).unwrap(), 10_000);
        assert_eq!(r.cleanup().unwrap(), data);

        let mut r = setup(&data, 333);
        io::copy(&mut &data[..], &mut r).unwrap();
        r.flush().unwrap();
        assert!(r.status().is_complete());
        assert_eq!(r.cleanup().unwrap(), data);
    }
}
