// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Bookkeeping for the error path: why the writer failed, and whether the
//! one-shot error payload has been written.

use crate::error::{StructuralError, StructuralReason, WriterError};
use crate::state::{Transition, WriterState};

/// The first failure that moved a writer into `Error`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FailureCause {
    /// An illegal transition was attempted.
    Structural,
    /// An item broke a payload rule.
    Validation,
    /// The sink failed.
    FatalSink,
    /// Disposal was attempted with unflushed bytes.
    DisposalConsistency,
    /// The caller wrote an error payload.
    ErrorPayload,
}

impl FailureCause {
    /// The cause `err` records. Usage errors leave the writer untouched and
    /// have none.
    pub fn of(err: &WriterError) -> Option<Self> {
        match err {
            WriterError::Structural(_) => Some(Self::Structural),
            WriterError::Validation(_) => Some(Self::Validation),
            WriterError::FatalSink { .. } => Some(Self::FatalSink),
            WriterError::DisposalConsistency { .. } => Some(Self::DisposalConsistency),
            WriterError::Usage(_) => None,
        }
    }
}

/// Tracks the error path of one writer.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ErrorChannel {
    cause: Option<FailureCause>,
    payload_written: bool,
}

impl ErrorChannel {
    /// A channel with nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// The first recorded failure.
    pub fn cause(&self) -> Option<FailureCause> {
        self.cause
    }

    /// True once an error payload has been emitted.
    pub fn payload_written(&self) -> bool {
        self.payload_written
    }

    /// Records `cause` unless an earlier one is already recorded.
    pub(crate) fn record(&mut self, cause: FailureCause) {
        self.cause.get_or_insert(cause);
    }

    /// Rejects a second error payload.
    pub(crate) fn check_write_error(&self, state: WriterState) -> Result<(), StructuralError> {
        if self.payload_written {
            return Err(StructuralError {
                transition: Transition::WriteError,
                state,
                reason: StructuralReason::WriteErrorAlreadyCalled,
            });
        }
        Ok(())
    }

    pub(crate) fn mark_written(&mut self) {
        self.payload_written = true;
        self.record(FailureCause::ErrorPayload);
    }
}
