// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Script loading and replay.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use odata_dry_tests::{apply_step, apply_step_async, Step};
use odata_writer::{ODataWriter, WriterError, WriterKind, WriterSettings, WriterState};
use tokio::io::AsyncWrite;
use tracing::debug;

pub(crate) fn parse(bytes: &[u8]) -> Result<Vec<Step>> {
    serde_json::from_slice(bytes).context("script must be a JSON array of steps")
}

pub(crate) fn load(path: &Path) -> Result<Vec<Step>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading script {}", path.display()))?;
    parse(&bytes).with_context(|| format!("parsing script {}", path.display()))
}

fn rejected(index: usize, step: &Step, state: WriterState, err: WriterError) -> anyhow::Error {
    anyhow::Error::new(err).context(format!(
        "step {index} ({}) rejected; writer is now {state}",
        step.name()
    ))
}

/// Applies every step, stopping at the first rejection. A writer left
/// undisposed by the script is flushed and disposed afterwards.
pub(crate) fn replay_blocking<W>(
    sink: W,
    kind: WriterKind,
    settings: &WriterSettings,
    steps: &[Step],
) -> Result<WriterState>
where
    W: Write + Send + 'static,
{
    let mut writer = match kind {
        WriterKind::Resource => ODataWriter::resource_writer(sink, settings),
        WriterKind::ResourceSet => ODataWriter::resource_set_writer(sink, settings),
    };
    for (index, step) in steps.iter().enumerate() {
        if let Err(err) = apply_step(&mut writer, step) {
            return Err(rejected(index, step, writer.state(), err));
        }
        debug!(index, step = step.name(), state = %writer.state(), "step applied");
    }
    if !writer.is_disposed() {
        writer.flush().context("final flush")?;
        writer.dispose().context("final dispose")?;
    }
    Ok(writer.state())
}

/// [`replay_blocking`] through the `_async` methods.
pub(crate) async fn replay_async<W>(
    sink: W,
    kind: WriterKind,
    settings: &WriterSettings,
    steps: &[Step],
) -> Result<WriterState>
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    let mut writer = match kind {
        WriterKind::Resource => ODataWriter::resource_writer_async(sink, settings).await,
        WriterKind::ResourceSet => ODataWriter::resource_set_writer_async(sink, settings).await,
    };
    for (index, step) in steps.iter().enumerate() {
        if let Err(err) = apply_step_async(&mut writer, step).await {
            return Err(rejected(index, step, writer.state(), err));
        }
        debug!(index, step = step.name(), state = %writer.state(), "step applied");
    }
    if !writer.is_disposed() {
        writer.flush_async().await.context("final flush")?;
        writer.dispose().context("final dispose")?;
    }
    Ok(writer.state())
}
