// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory sink fake for both writer disciplines.

use std::io::{self, Write};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use tokio::io::AsyncWrite;

/// Message of the error a closed sink returns.
pub const CLOSED_MESSAGE: &str = "stream does not support writing";

/// Shared in-memory sink.
///
/// Clones share the same buffer, so a test can hand one clone to a writer
/// and inspect the bytes through another. [`MemorySink::close`] makes every
/// later write and flush fail, simulating a stream closed underneath the
/// writer.
///
/// # Example
///
/// ```
/// use odata_dry_tests::MemorySink;
/// use std::io::Write;
///
/// let sink = MemorySink::new();
/// let mut handle = sink.clone();
/// handle.write_all(b"{}").unwrap();
/// assert_eq!(sink.text(), "{}");
///
/// sink.close();
/// assert!(handle.flush().is_err());
/// ```
#[derive(Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemorySinkInner>>,
}

#[derive(Default)]
struct MemorySinkInner {
    data: Vec<u8>,
    closed: bool,
    write_count: usize,
    flush_count: usize,
}

impl MemorySink {
    /// An open, empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that is already closed.
    pub fn closed() -> Self {
        let sink = Self::new();
        sink.close();
        sink
    }

    fn lock(&self) -> MutexGuard<'_, MemorySinkInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Rejects all further writes and flushes.
    pub fn close(&self) {
        self.lock().closed = true;
    }

    /// True after [`MemorySink::close`].
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.lock().data.clone()
    }

    /// Contents as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.lock().data).into_owned()
    }

    /// Write attempts, including rejected ones.
    pub fn write_count(&self) -> usize {
        self.lock().write_count
    }

    /// Flush attempts, including rejected ones.
    pub fn flush_count(&self) -> usize {
        self.lock().flush_count
    }

    fn accept(&self, buf: &[u8]) -> io::Result<usize> {
        let mut inner = self.lock();
        inner.write_count += 1;
        if inner.closed {
            return Err(closed_error());
        }
        inner.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn settle(&self) -> io::Result<()> {
        let mut inner = self.lock();
        inner.flush_count += 1;
        if inner.closed {
            return Err(closed_error());
        }
        Ok(())
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, CLOSED_MESSAGE)
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.accept(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.settle()
    }
}

impl AsyncWrite for MemorySink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(self.accept(buf))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(self.settle())
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn closed_sink_counts_rejected_attempts() {
        let mut sink = MemorySink::closed();
        assert!(sink.is_closed());
        let err = Write::write(&mut sink, b"x").unwrap_err();
        assert_eq!(err.to_string(), CLOSED_MESSAGE);
        assert!(Write::flush(&mut sink).is_err());
        assert_eq!(sink.write_count(), 1);
        assert_eq!(sink.flush_count(), 1);
        assert!(sink.contents().is_empty());
    }

    #[tokio::test]
    async fn async_writes_share_the_buffer() {
        let sink = MemorySink::new();
        let mut handle = sink.clone();
        AsyncWriteExt::write_all(&mut handle, b"abc").await.unwrap();
        AsyncWriteExt::flush(&mut handle).await.unwrap();
        assert_eq!(sink.contents(), b"abc");
        assert_eq!(sink.flush_count(), 1);
        assert!(!sink.is_closed());
    }
}
