// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The writer facade: one exclusively-owned sink, one state machine.

use std::io::Write;

use tokio::io::AsyncWrite;
use tracing::{debug, warn};

use crate::channel::{ErrorChannel, FailureCause};
use crate::emit::{self, FormatEmitter};
use crate::error::{UsageError, WriterError};
use crate::guard::{SyncAsyncGuard, WriterMode};
use crate::item::{NestedLinkItem, ODataError, ResourceItem, ResourceSetItem};
use crate::operations::group_operations;
use crate::settings::WriterSettings;
use crate::sink::{BufferedSink, SinkTarget};
use crate::state::{Scope, Transition, WriterKind, WriterState, WriterStateMachine};
use crate::validate::{ContentKind, ResourceValidator};

/// A content call after the discipline gate.
#[derive(Clone, Copy)]
enum Call<'a> {
    BeginResource(&'a ResourceItem),
    BeginResourceSet(&'a ResourceSetItem),
    BeginNestedLink(&'a NestedLinkItem),
    End,
}

impl Call<'_> {
    fn transition(self) -> Transition {
        match self {
            Self::BeginResource(_) => Transition::BeginResource,
            Self::BeginResourceSet(_) => Transition::BeginResourceSet,
            Self::BeginNestedLink(_) => Transition::BeginNestedLink,
            Self::End => Transition::End,
        }
    }
}

/// Writes one resource or one resource set payload into a sink.
///
/// The writer owns the sink until [`ODataWriter::dispose`]. Whether it is
/// driven synchronously or asynchronously is fixed by the constructor: the
/// `*_writer` constructors take a [`std::io::Write`] sink and accept only the
/// blocking methods, the `*_writer_async` constructors take a
/// [`tokio::io::AsyncWrite`] sink and accept only the `*_async` methods.
/// `dispose` and [`ODataWriter::state`] belong to neither discipline.
///
/// ```
/// use odata_writer::{ODataWriter, ResourceItem, WriterSettings, WriterState};
///
/// let mut writer = ODataWriter::resource_writer(Vec::<u8>::new(), &WriterSettings::default());
/// writer.begin_resource(&ResourceItem::new("http://odata.org/e(1)"))?;
/// writer.end()?;
/// assert_eq!(writer.state(), WriterState::Completed);
/// writer.flush()?;
/// writer.dispose()?;
/// # Ok::<(), odata_writer::WriterError>(())
/// ```
pub struct ODataWriter {
    guard: SyncAsyncGuard,
    machine: WriterStateMachine,
    validator: ResourceValidator,
    emitter: Box<dyn FormatEmitter>,
    sink: BufferedSink,
    channel: ErrorChannel,
    disposed: bool,
}

impl ODataWriter {
    /// A blocking writer for a single top-level resource.
    pub fn resource_writer<W>(sink: W, settings: &WriterSettings) -> Self
    where
        W: Write + Send + 'static,
    {
        Self::create(
            WriterKind::Resource,
            SinkTarget::Blocking(Box::new(sink)),
            settings,
        )
    }

    /// A blocking writer for a top-level resource set.
    pub fn resource_set_writer<W>(sink: W, settings: &WriterSettings) -> Self
    where
        W: Write + Send + 'static,
    {
        Self::create(
            WriterKind::ResourceSet,
            SinkTarget::Blocking(Box::new(sink)),
            settings,
        )
    }

    /// An asynchronous writer for a single top-level resource.
    #[allow(clippy::unused_async)]
    pub async fn resource_writer_async<W>(sink: W, settings: &WriterSettings) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::create(
            WriterKind::Resource,
            SinkTarget::Async(Box::new(sink)),
            settings,
        )
    }

    /// An asynchronous writer for a top-level resource set.
    #[allow(clippy::unused_async)]
    pub async fn resource_set_writer_async<W>(sink: W, settings: &WriterSettings) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::create(
            WriterKind::ResourceSet,
            SinkTarget::Async(Box::new(sink)),
            settings,
        )
    }

    fn create(kind: WriterKind, target: SinkTarget, settings: &WriterSettings) -> Self {
        let mode = target.mode();
        debug!(?kind, %mode, format = ?settings.format, is_request = settings.is_request, "writer created");
        Self {
            guard: SyncAsyncGuard::new(mode),
            machine: WriterStateMachine::new(kind),
            validator: ResourceValidator::new(settings.is_request),
            emitter: emit::emitter_for(settings),
            sink: BufferedSink::new(target, settings.buffer_capacity.max(1)),
            channel: ErrorChannel::new(),
            disposed: false,
        }
    }

    /// The current state.
    pub fn state(&self) -> WriterState {
        self.machine.state()
    }

    /// Resource or resource set, fixed at creation.
    pub fn kind(&self) -> WriterKind {
        self.machine.kind()
    }

    /// The discipline fixed at creation.
    pub fn mode(&self) -> WriterMode {
        self.guard.mode()
    }

    /// Why the writer is in `Error`, and whether an error payload was written.
    pub fn error_channel(&self) -> &ErrorChannel {
        &self.channel
    }

    /// Bytes emitted but not yet handed to the sink.
    pub fn buffered(&self) -> usize {
        self.sink.buffered()
    }

    /// True after a successful [`ODataWriter::dispose`].
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Starts a resource: the top-level one, an item of the current set, or
    /// the content of the current navigation link.
    pub fn begin_resource(&mut self, item: &ResourceItem) -> Result<(), WriterError> {
        self.run(Call::BeginResource(item))
    }

    /// Starts a resource set: the top-level one or the content of the
    /// current navigation link.
    pub fn begin_resource_set(&mut self, item: &ResourceSetItem) -> Result<(), WriterError> {
        self.run(Call::BeginResourceSet(item))
    }

    /// Starts a navigation link inside the current resource.
    pub fn begin_nested_link(&mut self, item: &NestedLinkItem) -> Result<(), WriterError> {
        self.run(Call::BeginNestedLink(item))
    }

    /// Closes the innermost open item. Closing the top-level item completes
    /// the writer.
    pub fn end(&mut self) -> Result<(), WriterError> {
        self.run(Call::End)
    }

    /// Hands buffered bytes to the sink and flushes it. Legal in every state.
    pub fn flush(&mut self) -> Result<(), WriterError> {
        self.admit(WriterMode::Synchronous)?;
        self.sink.flush().map_err(|source| self.fail(WriterError::FatalSink { source }))
    }

    /// Writes an error payload in-stream and moves the writer to `Error`.
    ///
    /// Allowed once per writer, from any state except `Completed`.
    /// `request_context_override` replaces the writer's request/response
    /// context for the check that error payloads appear only in responses.
    pub fn write_error(
        &mut self,
        error: &ODataError,
        request_context_override: Option<bool>,
    ) -> Result<(), WriterError> {
        self.admit(WriterMode::Synchronous)?;
        self.emit_error(error, request_context_override)?;
        self.sink.spill().map_err(|source| self.fail(WriterError::FatalSink { source }))
    }

    /// Async [`ODataWriter::begin_resource`].
    pub async fn begin_resource_async(&mut self, item: &ResourceItem) -> Result<(), WriterError> {
        self.run_async(Call::BeginResource(item)).await
    }

    /// Async [`ODataWriter::begin_resource_set`].
    pub async fn begin_resource_set_async(
        &mut self,
        item: &ResourceSetItem,
    ) -> Result<(), WriterError> {
        self.run_async(Call::BeginResourceSet(item)).await
    }

    /// Async [`ODataWriter::begin_nested_link`].
    pub async fn begin_nested_link_async(
        &mut self,
        item: &NestedLinkItem,
    ) -> Result<(), WriterError> {
        self.run_async(Call::BeginNestedLink(item)).await
    }

    /// Async [`ODataWriter::end`].
    pub async fn end_async(&mut self) -> Result<(), WriterError> {
        self.run_async(Call::End).await
    }

    /// Async [`ODataWriter::flush`].
    pub async fn flush_async(&mut self) -> Result<(), WriterError> {
        self.admit(WriterMode::Asynchronous)?;
        match self.sink.flush_async().await {
            Ok(()) => Ok(()),
            Err(source) => Err(self.fail(WriterError::FatalSink { source })),
        }
    }

    /// Async [`ODataWriter::write_error`].
    pub async fn write_error_async(
        &mut self,
        error: &ODataError,
        request_context_override: Option<bool>,
    ) -> Result<(), WriterError> {
        self.admit(WriterMode::Asynchronous)?;
        self.emit_error(error, request_context_override)?;
        self.spill_async().await
    }

    /// Releases the sink.
    ///
    /// Fails with [`WriterError::DisposalConsistency`] when bytes are buffered
    /// and no flush was attempted since they were written; the writer then
    /// moves to `Error` but stays usable for `flush` and a retried `dispose`.
    /// Disposal performs no I/O and is accepted from either discipline.
    pub fn dispose(&mut self) -> Result<(), WriterError> {
        if self.disposed {
            return Err(UsageError::Disposed.into());
        }
        let buffered = self.sink.buffered();
        if buffered > 0 && !self.sink.flush_attempted() {
            return Err(self.fail(WriterError::DisposalConsistency { buffered }));
        }
        self.sink.release();
        self.disposed = true;
        debug!(state = %self.machine.state(), "writer disposed");
        Ok(())
    }

    /// Disposal and discipline gate; rejections here never touch state.
    /// A disposed writer answers `Disposed` whichever discipline is used.
    fn admit(&self, mode: WriterMode) -> Result<(), UsageError> {
        if self.disposed {
            return Err(UsageError::Disposed);
        }
        self.guard.check(mode)
    }

    fn run(&mut self, call: Call<'_>) -> Result<(), WriterError> {
        self.admit(WriterMode::Synchronous)?;
        self.apply(call)?;
        self.sink.spill().map_err(|source| self.fail(WriterError::FatalSink { source }))
    }

    async fn run_async(&mut self, call: Call<'_>) -> Result<(), WriterError> {
        self.admit(WriterMode::Asynchronous)?;
        self.apply(call)?;
        self.spill_async().await
    }

    async fn spill_async(&mut self) -> Result<(), WriterError> {
        match self.sink.spill_async().await {
            Ok(()) => Ok(()),
            Err(source) => Err(self.fail(WriterError::FatalSink { source })),
        }
    }

    /// Records the failure and enters `Error` for every non-usage error.
    fn fail(&mut self, err: WriterError) -> WriterError {
        if let Some(cause) = FailureCause::of(&err) {
            self.channel.record(cause);
            self.machine.enter_error();
        }
        err
    }

    /// State check, validation, emission and state update for one call.
    fn apply(&mut self, call: Call<'_>) -> Result<(), WriterError> {
        if let Err(err) = self.machine.check(call.transition()) {
            return Err(self.fail(err.into()));
        }
        let result = match call {
            Call::BeginResource(item) => self.start_resource(item),
            Call::BeginResourceSet(item) => self.start_resource_set(item),
            Call::BeginNestedLink(item) => self.start_nested_link(item),
            Call::End => self.close_scope(),
        };
        result.map_err(|err| self.fail(err))
    }

    fn start_resource(&mut self, item: &ResourceItem) -> Result<(), WriterError> {
        if let Some(link) = self.machine.open_link() {
            self.validator
                .validate_nested_content(link, ContentKind::Resource)?;
        }
        self.validator.validate_resource(item)?;
        let groups = group_operations(item.operations());
        self.emitter
            .start_resource(self.sink.buffer_mut(), item, &groups)
            .map_err(|source| WriterError::FatalSink { source })?;
        self.machine.push_resource(item.id.clone());
        Ok(())
    }

    fn start_resource_set(&mut self, item: &ResourceSetItem) -> Result<(), WriterError> {
        if let Some(link) = self.machine.open_link() {
            self.validator
                .validate_nested_content(link, ContentKind::ResourceSet)?;
        }
        self.emitter
            .start_resource_set(self.sink.buffer_mut(), item)
            .map_err(|source| WriterError::FatalSink { source })?;
        self.machine.push_resource_set();
        Ok(())
    }

    fn start_nested_link(&mut self, item: &NestedLinkItem) -> Result<(), WriterError> {
        self.validator.validate_nested_link(item)?;
        self.emitter
            .start_nested_link(self.sink.buffer_mut(), item)
            .map_err(|source| WriterError::FatalSink { source })?;
        self.machine.push_nested_link(item.clone());
        Ok(())
    }

    fn close_scope(&mut self) -> Result<(), WriterError> {
        let emitted = match self.machine.current_scope() {
            Some(Scope::Resource { id }) => {
                self.validator.validate_finalized_resource(id.as_deref())?;
                self.emitter.end_resource(self.sink.buffer_mut())
            }
            Some(Scope::ResourceSet) => self.emitter.end_resource_set(self.sink.buffer_mut()),
            Some(Scope::NestedLink { .. }) => self.emitter.end_nested_link(self.sink.buffer_mut()),
            None => Ok(()),
        };
        emitted.map_err(|source| WriterError::FatalSink { source })?;
        self.machine.pop();
        Ok(())
    }

    fn emit_error(
        &mut self,
        error: &ODataError,
        request_context_override: Option<bool>,
    ) -> Result<(), WriterError> {
        if let Err(err) = self
            .validator
            .validate_error_payload(request_context_override)
        {
            return Err(self.fail(err.into()));
        }
        let state = self.machine.state();
        if let Err(err) = self.channel.check_write_error(state) {
            return Err(self.fail(err.into()));
        }
        if let Err(err) = self.machine.check(Transition::WriteError) {
            return Err(self.fail(err.into()));
        }
        if let Err(source) = self.emitter.write_error(self.sink.buffer_mut(), error) {
            return Err(self.fail(WriterError::FatalSink { source }));
        }
        self.channel.mark_written();
        self.machine.enter_error();
        Ok(())
    }
}

impl Drop for ODataWriter {
    fn drop(&mut self) {
        if !self.disposed && self.sink.buffered() > 0 {
            warn!(
                buffered = self.sink.buffered(),
                state = %self.machine.state(),
                "writer dropped without flush; buffered bytes are lost"
            );
        }
    }
}
