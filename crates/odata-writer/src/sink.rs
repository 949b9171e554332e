// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Exclusively-owned byte sink with an internal buffer.
//!
//! Emitters write into [`BufferedSink::buffer_mut`]; bytes reach the underlying
//! sink when the buffer reaches its capacity ([`BufferedSink::spill`]) or on an
//! explicit flush. After the sink fails once it is poisoned: pending bytes are
//! dropped since they can no longer be delivered.

use std::io::{self, Write};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{error, trace};

use crate::guard::WriterMode;

/// The sink variants. The variant always matches the writer's discipline.
pub(crate) enum SinkTarget {
    Blocking(Box<dyn Write + Send>),
    Async(Box<dyn AsyncWrite + Send + Unpin>),
}

impl SinkTarget {
    pub(crate) fn mode(&self) -> WriterMode {
        match self {
            Self::Blocking(_) => WriterMode::Synchronous,
            Self::Async(_) => WriterMode::Asynchronous,
        }
    }
}

pub(crate) struct BufferedSink {
    target: Option<SinkTarget>,
    buffer: Vec<u8>,
    capacity: usize,
    poisoned: bool,
    flush_attempted: bool,
}

impl BufferedSink {
    pub(crate) fn new(target: SinkTarget, capacity: usize) -> Self {
        Self {
            target: Some(target),
            buffer: Vec::with_capacity(capacity.min(64 * 1024)),
            capacity,
            poisoned: false,
            flush_attempted: false,
        }
    }

    /// Where emitters write. Writing here clears the flush-attempted mark.
    pub(crate) fn buffer_mut(&mut self) -> &mut Vec<u8> {
        self.flush_attempted = false;
        &mut self.buffer
    }

    pub(crate) fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub(crate) fn flush_attempted(&self) -> bool {
        self.flush_attempted
    }

    /// Drops the underlying sink. Buffered bytes are discarded.
    pub(crate) fn release(&mut self) {
        self.buffer.clear();
        self.target = None;
    }

    fn should_spill(&self) -> bool {
        !self.poisoned && self.buffer.len() >= self.capacity
    }

    fn fail(&mut self, err: io::Error) -> io::Error {
        error!(error = %err, dropped = self.buffer.len(), "sink failure");
        self.poisoned = true;
        self.buffer.clear();
        err
    }

    fn released() -> io::Error {
        io::Error::new(io::ErrorKind::NotConnected, "sink already released")
    }

    /// Hands the buffer to a blocking sink once it reaches capacity.
    pub(crate) fn spill(&mut self) -> io::Result<()> {
        if !self.should_spill() {
            return Ok(());
        }
        trace!(bytes = self.buffer.len(), "spilling buffer");
        let result = match self.target.as_mut() {
            Some(SinkTarget::Blocking(sink)) => sink.write_all(&self.buffer),
            Some(SinkTarget::Async(_)) => Err(mode_mismatch()),
            None => Err(Self::released()),
        };
        self.settle(result)
    }

    /// Hands the buffer to an async sink once it reaches capacity.
    pub(crate) async fn spill_async(&mut self) -> io::Result<()> {
        if !self.should_spill() {
            return Ok(());
        }
        trace!(bytes = self.buffer.len(), "spilling buffer");
        let result = match self.target.as_mut() {
            Some(SinkTarget::Async(sink)) => sink.write_all(&self.buffer).await,
            Some(SinkTarget::Blocking(_)) => Err(mode_mismatch()),
            None => Err(Self::released()),
        };
        self.settle(result)
    }

    /// Writes everything buffered and flushes a blocking sink.
    pub(crate) fn flush(&mut self) -> io::Result<()> {
        self.flush_attempted = true;
        if self.poisoned && self.buffer.is_empty() {
            return Ok(());
        }
        trace!(bytes = self.buffer.len(), "flushing");
        let result = match self.target.as_mut() {
            Some(SinkTarget::Blocking(sink)) => {
                sink.write_all(&self.buffer).and_then(|()| sink.flush())
            }
            Some(SinkTarget::Async(_)) => Err(mode_mismatch()),
            None => Err(Self::released()),
        };
        self.settle(result)
    }

    /// Writes everything buffered and flushes an async sink.
    pub(crate) async fn flush_async(&mut self) -> io::Result<()> {
        self.flush_attempted = true;
        if self.poisoned && self.buffer.is_empty() {
            return Ok(());
        }
        trace!(bytes = self.buffer.len(), "flushing");
        let result = match self.target.as_mut() {
            Some(SinkTarget::Async(sink)) => match sink.write_all(&self.buffer).await {
                Ok(()) => sink.flush().await,
                Err(err) => Err(err),
            },
            Some(SinkTarget::Blocking(_)) => Err(mode_mismatch()),
            None => Err(Self::released()),
        };
        self.settle(result)
    }

    fn settle(&mut self, result: io::Result<()>) -> io::Result<()> {
        match result {
            Ok(()) => {
                self.buffer.clear();
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }
}

// Unreachable behind the guard; reported as an I/O failure rather than a panic.
fn mode_mismatch() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "sink discipline does not match the call",
    )
}
