// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `odata-write`: replays a JSON step script through an OData writer.
//! The payload goes to stdout, logs go to stderr.
#![forbid(unsafe_code)]

mod script;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use odata_writer::{WriterKind, WriterSettings};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Resource,
    ResourceSet,
}

impl From<Kind> for WriterKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Resource => Self::Resource,
            Kind::ResourceSet => Self::ResourceSet,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay an OData writer step script to stdout")]
struct Args {
    /// Writer settings (JSON: format, is_request, indent, buffer_capacity). Defaults apply when omitted.
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Step script (JSON array, e.g. [{"step":"begin_resource","item":{"id":"e1"}},{"step":"end"}])
    #[arg(long)]
    script: PathBuf,
    /// Top-level payload kind
    #[arg(long, value_enum, default_value_t = Kind::Resource)]
    kind: Kind,
    /// Drive the writer through the async methods
    #[arg(long = "async")]
    use_async: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let settings = match &args.settings {
        Some(path) => WriterSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => WriterSettings::default(),
    };
    let steps = script::load(&args.script)?;
    let kind = WriterKind::from(args.kind);
    info!(?kind, format = ?settings.format, steps = steps.len(), async_mode = args.use_async, "replaying script");

    let state = if args.use_async {
        script::replay_async(tokio::io::stdout(), kind, &settings, &steps).await?
    } else {
        script::replay_blocking(std::io::stdout(), kind, &settings, &steps)?
    };
    info!(%state, "script finished");
    Ok(())
}
