//! Async reader adapter for streaming ingestion.
//!
//! # Example
//!
//! ```ignore
//! use chunkstitch::{ingest_async, Reassembler};
//! use futures_io::AsyncRead;
//!
//! async fn demo<R: AsyncRead>(reader: R, reassembler: &Reassembler<Vec<u8>>)
//!     -> Result<(), chunkstitch::ReassemblyError>
//! {
//!     let read = ingest_async(reader, reassembler).await?;
//!     println!("ingested {} bytes", read);
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::io::{self, Write};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_io::AsyncRead;
use pin_project_lite::pin_project;

use crate::error::ReassemblyError;
use crate::reassembler::Reassembler;

const READ_WINDOW: usize = 8192;

pin_project! {
    /// A future that reads an async source to the end and ingests it.
    ///
    /// Resolves to the number of bytes read. At end of stream the
    /// accumulation buffer is flushed. Applying pieces is synchronous and
    /// happens inside `poll`.
    pub struct IngestFuture<'a, R, W> {
        #[pin]
        reader: R,
        reassembler: &'a Reassembler<W>,
        buffer: Vec<u8>,
        total: u64,
        finished: bool,
    }
}

impl<R: AsyncRead, W: Write> Future for IngestFuture<'_, R, W> {
    type Output = Result<u64, ReassemblyError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut this = self.project();

        if *this.finished {
            return Poll::Ready(Ok(*this.total));
        }

        loop {
            match this.reader.as_mut().poll_read(cx, &mut this.buffer[..]) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                Poll::Ready(Err(e)) => {
                    *this.finished = true;
                    return Poll::Ready(Err(ReassemblyError::Io(e)));
                }
                Poll::Ready(Ok(0)) => {
                    // End of stream - apply whatever is still buffered
                    *this.finished = true;
                    let total = *this.total;
                    return Poll::Ready(this.reassembler.flush_pending().map(|()| total));
                }
                Poll::Ready(Ok(n)) => {
                    if let Err(e) = this.reassembler.ingest(&this.buffer[..n]) {
                        *this.finished = true;
                        return Poll::Ready(Err(e));
                    }
                    *this.total += n as u64;
                }
            }
        }
    }
}

/// Creates a future that ingests everything `reader` yields into `reassembler`.
///
/// Uses `futures_io::AsyncRead` for runtime-agnostic async I/O. For tokio
/// readers, convert with `tokio_util::compat::TokioAsyncReadCompatExt`:
///
/// ```ignore
/// use tokio_util::compat::TokioAsyncReadCompatExt;
///
/// let file = tokio::fs::File::open("download.part").await?;
/// chunkstitch::ingest_async(file.compat(), &reassembler).await?;
/// ```
pub fn ingest_async<R: AsyncRead, W: Write>(
    reader: R,
    reassembler: &Reassembler<W>,
) -> IngestFuture<'_, R, W> {
    IngestFuture {
        reader,
        reassembler,
        buffer: vec![0u8; READ_WINDOW],
        total: 0,
        finished: false,
    }
}
