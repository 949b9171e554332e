// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error taxonomy for the writer.
//!
//! Five categories, distinguished by where the failure comes from:
//!
//! | Category | Source | Writer state afterwards |
//! |---|---|---|
//! | [`StructuralError`] | illegal transition | `Error` |
//! | [`ValidationError`] | payload rule violation | `Error` |
//! | [`WriterError::FatalSink`] | the byte sink | `Error` |
//! | [`UsageError`] | wrong discipline, disposed writer | unchanged |
//! | [`WriterError::DisposalConsistency`] | dispose with unflushed bytes | `Error` |

use std::fmt;
use std::io;

use thiserror::Error;

use crate::guard::WriterMode;
use crate::state::{Transition, WriterState};

/// Why a transition was refused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum StructuralReason {
    /// The writer was created for the other top-level kind.
    TopLevelKindMismatch,
    /// A navigation link cannot be the first thing written.
    InvalidFromStart,
    /// `end()` with nothing open.
    NothingToEnd,
    /// A resource was started directly inside a resource.
    ResourceCannotContainResource,
    /// A resource set was started directly inside a resource.
    ResourceCannotContainResourceSet,
    /// A resource set was started directly inside a resource set.
    ResourceSetCannotContainResourceSet,
    /// A navigation link was started directly inside a resource set.
    ResourceSetCannotContainNestedLink,
    /// A navigation link was started directly inside a navigation link.
    NestedLinkCannotContainNestedLink,
    /// The navigation link already carries its resource or resource set.
    NestedLinkAlreadyHasContent,
    /// The writer has completed.
    InvalidFromCompleted,
    /// The writer is in the error state.
    InvalidFromError,
    /// An error payload has already been written.
    WriteErrorAlreadyCalled,
}

impl fmt::Display for StructuralReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::TopLevelKindMismatch => "the writer was created for the other top-level kind",
            Self::InvalidFromStart => "a navigation link needs an enclosing resource",
            Self::NothingToEnd => "nothing is open",
            Self::ResourceCannotContainResource => {
                "a resource can only contain resources through a navigation link"
            }
            Self::ResourceCannotContainResourceSet => {
                "a resource can only contain resource sets through a navigation link"
            }
            Self::ResourceSetCannotContainResourceSet => "resource sets cannot be nested directly",
            Self::ResourceSetCannotContainNestedLink => {
                "a navigation link must belong to a resource, not a resource set"
            }
            Self::NestedLinkCannotContainNestedLink => "navigation links cannot be nested directly",
            Self::NestedLinkAlreadyHasContent => "the navigation link already has content",
            Self::InvalidFromCompleted => "the writer has already completed",
            Self::InvalidFromError => {
                "no further writes are possible once the writer is in the error state"
            }
            Self::WriteErrorAlreadyCalled => "write_error has already been called",
        };
        f.write_str(text)
    }
}

/// An illegal state transition.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
#[error("cannot {transition} in state {state}: {reason}")]
pub struct StructuralError {
    /// The transition that was attempted.
    pub transition: Transition,
    /// The state the writer was in.
    pub state: WriterState,
    /// Why it was refused.
    pub reason: StructuralReason,
}

/// Which operation collection of a resource an error refers to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum OperationCollection {
    /// `ResourceItem::actions`.
    Actions,
    /// `ResourceItem::functions`.
    Functions,
}

impl fmt::Display for OperationCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Actions => f.write_str("actions"),
            Self::Functions => f.write_str("functions"),
        }
    }
}

/// A payload rule violation.
#[derive(Clone, PartialEq, Eq, Debug, Error)]
pub enum ValidationError {
    /// An operation collection holds an absent entry.
    #[error("the {collection} collection contains a null item")]
    EnumerableContainsNullItem {
        /// The offending collection.
        collection: OperationCollection,
    },
    /// Operations are only written in responses.
    #[error("operation '{metadata}' cannot be written in a request")]
    OperationInRequest {
        /// Metadata of the first operation.
        metadata: String,
    },
    /// Relative metadata must start with `#`.
    #[error("operation metadata '{metadata}' is neither absolute nor a '#' fragment")]
    InvalidMetadataReference {
        /// The rejected metadata.
        metadata: String,
    },
    /// An operation without a target.
    #[error("operation '{metadata}' must specify a target")]
    OperationMissingTarget {
        /// Metadata of the operation.
        metadata: String,
    },
    /// A function stored among actions, or the reverse.
    #[error("operation '{metadata}' is stored in the {collection} collection with the wrong kind")]
    OperationKindMismatch {
        /// The collection it was found in.
        collection: OperationCollection,
        /// Metadata of the operation.
        metadata: String,
    },
    /// A resource was finalized without an identity.
    #[error("resources must have a non-empty id")]
    EntriesMustHaveNonEmptyId,
    /// A media resource carries an ETag but no edit link.
    #[error("a media resource ETag requires an edit link")]
    MediaETagWithoutEditLink,
    /// A property name that is not a plain identifier.
    #[error("property name '{name}' is not a valid identifier")]
    InvalidPropertyName {
        /// The rejected name.
        name: String,
    },
    /// A collection link was given a single resource.
    #[error("collection navigation link '{url}' expects a resource set, not a resource")]
    ExpectedResourceSetForCollectionLink {
        /// The link's URL.
        url: String,
    },
    /// A single-valued link was given a resource set.
    #[error("single-valued navigation link '{url}' expects a resource, not a resource set")]
    ExpectedResourceForSingleLink {
        /// The link's URL.
        url: String,
    },
    /// A navigation link without a name.
    #[error("navigation links must specify a name")]
    NestedLinkMustSpecifyName,
    /// A response navigation link without a URL.
    #[error("navigation link '{name}' must specify a url in a response")]
    NestedLinkMustSpecifyUrl {
        /// The link's name.
        name: String,
    },
    /// Error payloads are only written in responses.
    #[error("an error payload cannot be written in a request")]
    ErrorPayloadInRequest,
}

/// Misuse of the writer itself. Never changes writer state.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum UsageError {
    /// A call of the wrong discipline.
    #[error("{}", mismatch_message(.required))]
    SyncAsyncMismatch {
        /// The discipline the writer was created with.
        required: WriterMode,
    },
    /// The writer has been disposed.
    #[error("the writer has already been disposed")]
    Disposed,
}

fn mismatch_message(required: &WriterMode) -> &'static str {
    match required {
        WriterMode::Synchronous => {
            "the writer was created for synchronous use; call the methods without the _async suffix"
        }
        WriterMode::Asynchronous => {
            "the writer was created for asynchronous use; call the _async methods"
        }
    }
}

/// The coarse kind of a [`WriterError`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ErrorCategory {
    /// Illegal transition.
    Structural,
    /// Payload rule violation.
    Validation,
    /// The byte sink failed.
    FatalSink,
    /// Wrong discipline or disposed writer.
    Usage,
    /// Disposal with unflushed bytes.
    DisposalConsistency,
}

/// Every failure a writer call can report.
#[derive(Debug, Error)]
pub enum WriterError {
    /// Illegal transition.
    #[error(transparent)]
    Structural(#[from] StructuralError),
    /// Payload rule violation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The sink rejected bytes or a flush.
    #[error("fatal sink failure: {source}")]
    FatalSink {
        /// The sink's own failure.
        #[source]
        source: io::Error,
    },
    /// Misuse of the writer.
    #[error(transparent)]
    Usage(#[from] UsageError),
    /// Dispose was called while bytes were still buffered.
    #[error("cannot dispose with {buffered} unflushed bytes; flush must be called before disposing")]
    DisposalConsistency {
        /// Bytes still in the writer's buffer.
        buffered: usize,
    },
}

impl WriterError {
    /// The category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Structural(_) => ErrorCategory::Structural,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::FatalSink { .. } => ErrorCategory::FatalSink,
            Self::Usage(_) => ErrorCategory::Usage,
            Self::DisposalConsistency { .. } => ErrorCategory::DisposalConsistency,
        }
    }

    /// The structural details, if this is a structural error.
    pub fn as_structural(&self) -> Option<&StructuralError> {
        match self {
            Self::Structural(err) => Some(err),
            _ => None,
        }
    }

    /// The validation details, if this is a validation error.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}
