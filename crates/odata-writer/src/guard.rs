// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Calling-discipline guard.

use std::fmt;

use tracing::debug;

use crate::error::UsageError;

/// How a writer is driven. Fixed by the creation call, never changed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum WriterMode {
    /// Blocking calls over a `std::io::Write` sink.
    Synchronous,
    /// Awaited `_async` calls over a `tokio::io::AsyncWrite` sink.
    Asynchronous,
}

impl fmt::Display for WriterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synchronous => f.write_str("synchronous"),
            Self::Asynchronous => f.write_str("asynchronous"),
        }
    }
}

/// Rejects calls whose discipline differs from the writer's.
///
/// The check runs before the state machine and never changes writer state.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SyncAsyncGuard {
    mode: WriterMode,
}

impl SyncAsyncGuard {
    /// Binds the guard to `mode`.
    pub fn new(mode: WriterMode) -> Self {
        Self { mode }
    }

    /// The bound discipline.
    pub fn mode(&self) -> WriterMode {
        self.mode
    }

    /// Accepts `call` only if it matches the bound discipline.
    pub fn check(&self, call: WriterMode) -> Result<(), UsageError> {
        if call == self.mode {
            return Ok(());
        }
        debug!(required = %self.mode, attempted = %call, "discipline mismatch");
        Err(UsageError::SyncAsyncMismatch { required: self.mode })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_discipline_passes() {
        let guard = SyncAsyncGuard::new(WriterMode::Asynchronous);
        assert_eq!(guard.check(WriterMode::Asynchronous), Ok(()));
    }

    #[test]
    fn mismatch_names_required_mode() {
        for mode in [WriterMode::Synchronous, WriterMode::Asynchronous] {
            let other = match mode {
                WriterMode::Synchronous => WriterMode::Asynchronous,
                WriterMode::Asynchronous => WriterMode::Synchronous,
            };
            let guard = SyncAsyncGuard::new(mode);
            assert_eq!(
                guard.check(other),
                Err(UsageError::SyncAsyncMismatch { required: mode })
            );
        }
    }
}
