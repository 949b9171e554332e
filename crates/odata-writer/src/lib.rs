// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! odata-writer: a state-machine driven OData payload writer.
//!
//! An [`ODataWriter`] accepts a sequence of `begin_*`/`end` calls describing a
//! resource (entry) or a resource set (feed) with nested navigation links, and
//! serializes it as JSON or Atom. Only structurally valid call sequences ever
//! reach the byte sink.
//!
//! # Pipeline
//!
//! Every content call runs through the same gates, in order:
//!
//! 1. [`SyncAsyncGuard`]: the call discipline must match the creation call.
//! 2. [`WriterStateMachine`]: the transition must be legal in the current state.
//! 3. [`ResourceValidator`]: the item must satisfy the payload rules.
//! 4. [`group_operations`] + [`FormatEmitter`]: bytes are produced into the
//!    writer's buffer, which spills to the sink at `buffer_capacity`.
//!
//! A structural, validation or sink failure moves the writer into
//! [`WriterState::Error`]. From there only [`ODataWriter::flush`], the one-shot
//! [`ODataWriter::write_error`] and [`ODataWriter::dispose`] are accepted.
//!
//! # Invariants
//!
//! - Exactly one [`WriterState`] is current; `Completed` and `Error` are terminal.
//! - A writer never mixes disciplines: sync calls on an async writer (and vice
//!   versa) fail with [`UsageError::SyncAsyncMismatch`] and leave state untouched.
//! - An error payload is written at most once per writer.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod channel;
pub mod emit;
mod error;
mod guard;
mod item;
mod operations;
mod settings;
mod sink;
mod state;
mod validate;
mod writer;

pub use channel::{ErrorChannel, FailureCause};
pub use emit::{AtomEmitter, FormatEmitter, JsonEmitter};
pub use error::{
    ErrorCategory, OperationCollection, StructuralError, StructuralReason, UsageError,
    ValidationError, WriterError,
};
pub use guard::{SyncAsyncGuard, WriterMode};
pub use item::{
    MediaResource, NestedLinkItem, ODataError, Operation, OperationKind, Property, ResourceItem,
    ResourceSetItem,
};
pub use operations::{group_operations, relation_of, OperationGroup};
pub use settings::{PayloadFormat, SettingsError, WriterSettings, DEFAULT_BUFFER_CAPACITY};
pub use state::{
    transition_verdict, LinkCardinality, Transition, WriterKind, WriterState, WriterStateMachine,
};
pub use validate::{ContentKind, ResourceValidator};
pub use writer::ODataWriter;
