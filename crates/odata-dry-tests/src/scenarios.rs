// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Named step scripts and runners for both disciplines.
//!
//! A script is a list of [`Step`]s, serialized as tagged JSON objects
//! (`{"step":"begin_resource","item":{...}}`, `{"step":"end"}`). Runners
//! apply every step regardless of earlier failures and report each outcome,
//! so scenarios can assert on rejection and recovery alike.

use serde::{Deserialize, Serialize};

use odata_writer::{
    NestedLinkItem, ODataError, ODataWriter, ResourceItem, ResourceSetItem, WriterError,
    WriterKind, WriterSettings, WriterState,
};

use crate::fixtures;
use crate::sink::MemorySink;

/// One writer call.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// `begin_resource`.
    BeginResource {
        /// The resource.
        #[serde(default)]
        item: ResourceItem,
    },
    /// `begin_resource_set`.
    BeginResourceSet {
        /// The set.
        #[serde(default)]
        item: ResourceSetItem,
    },
    /// `begin_nested_link`.
    BeginNestedLink {
        /// The link.
        item: NestedLinkItem,
    },
    /// `end`.
    End,
    /// `flush`.
    Flush,
    /// `write_error`.
    WriteError {
        /// The error payload.
        #[serde(default)]
        error: ODataError,
        /// Request/response context override.
        #[serde(default)]
        request_context_override: Option<bool>,
    },
    /// `dispose`.
    Dispose,
}

impl Step {
    /// A `begin_resource` step.
    pub fn resource(item: ResourceItem) -> Self {
        Self::BeginResource { item }
    }

    /// A `begin_resource_set` step.
    pub fn resource_set(item: ResourceSetItem) -> Self {
        Self::BeginResourceSet { item }
    }

    /// A `begin_nested_link` step.
    pub fn nested_link(item: NestedLinkItem) -> Self {
        Self::BeginNestedLink { item }
    }

    /// A `write_error` step with no context override.
    pub fn error(error: ODataError) -> Self {
        Self::WriteError {
            error,
            request_context_override: None,
        }
    }

    /// The writer method this step calls.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BeginResource { .. } => "begin_resource",
            Self::BeginResourceSet { .. } => "begin_resource_set",
            Self::BeginNestedLink { .. } => "begin_nested_link",
            Self::End => "end",
            Self::Flush => "flush",
            Self::WriteError { .. } => "write_error",
            Self::Dispose => "dispose",
        }
    }
}

/// Applies `step` with the blocking methods.
pub fn apply_step(writer: &mut ODataWriter, step: &Step) -> Result<(), WriterError> {
    match step {
        Step::BeginResource { item } => writer.begin_resource(item),
        Step::BeginResourceSet { item } => writer.begin_resource_set(item),
        Step::BeginNestedLink { item } => writer.begin_nested_link(item),
        Step::End => writer.end(),
        Step::Flush => writer.flush(),
        Step::WriteError {
            error,
            request_context_override,
        } => writer.write_error(error, *request_context_override),
        Step::Dispose => writer.dispose(),
    }
}

/// Applies `step` with the `_async` methods.
pub async fn apply_step_async(writer: &mut ODataWriter, step: &Step) -> Result<(), WriterError> {
    match step {
        Step::BeginResource { item } => writer.begin_resource_async(item).await,
        Step::BeginResourceSet { item } => writer.begin_resource_set_async(item).await,
        Step::BeginNestedLink { item } => writer.begin_nested_link_async(item).await,
        Step::End => writer.end_async().await,
        Step::Flush => writer.flush_async().await,
        Step::WriteError {
            error,
            request_context_override,
        } => {
            writer
                .write_error_async(error, *request_context_override)
                .await
        }
        Step::Dispose => writer.dispose(),
    }
}

/// What one step did.
#[derive(Debug)]
pub struct StepOutcome {
    /// The step that ran.
    pub step: Step,
    /// Its result.
    pub result: Result<(), WriterError>,
    /// Writer state right after it.
    pub state: WriterState,
}

/// Everything a run produced.
#[derive(Debug)]
pub struct RunReport {
    /// One outcome per step, in order.
    pub outcomes: Vec<StepOutcome>,
    /// State after the last step.
    pub final_state: WriterState,
    /// What reached the sink.
    pub output: String,
}

impl RunReport {
    /// The first failing step and its error.
    pub fn first_failure(&self) -> Option<(usize, &WriterError)> {
        self.outcomes
            .iter()
            .enumerate()
            .find_map(|(i, outcome)| outcome.result.as_ref().err().map(|err| (i, err)))
    }

    /// The error of step `index`, if it failed.
    pub fn error_at(&self, index: usize) -> Option<&WriterError> {
        self.outcomes
            .get(index)
            .and_then(|outcome| outcome.result.as_ref().err())
    }

    /// True when every step succeeded.
    pub fn all_ok(&self) -> bool {
        self.first_failure().is_none()
    }
}

/// A named script for one writer kind.
#[derive(Clone, Debug)]
pub struct Scenario {
    /// Catalog key.
    pub name: &'static str,
    /// Resource or resource set writer.
    pub kind: WriterKind,
    /// Start with a closed sink.
    pub sink_closed: bool,
    /// The calls, in order.
    pub steps: Vec<Step>,
}

impl Scenario {
    fn sink(&self) -> MemorySink {
        if self.sink_closed {
            MemorySink::closed()
        } else {
            MemorySink::new()
        }
    }

    /// Runs the script with a blocking writer.
    pub fn run_blocking(&self, settings: &WriterSettings) -> RunReport {
        let sink = self.sink();
        let mut writer = match self.kind {
            WriterKind::Resource => ODataWriter::resource_writer(sink.clone(), settings),
            WriterKind::ResourceSet => ODataWriter::resource_set_writer(sink.clone(), settings),
        };
        let outcomes = self
            .steps
            .iter()
            .map(|step| StepOutcome {
                step: step.clone(),
                result: apply_step(&mut writer, step),
                state: writer.state(),
            })
            .collect();
        RunReport {
            outcomes,
            final_state: writer.state(),
            output: sink.text(),
        }
    }

    /// Runs the script with an asynchronous writer.
    pub async fn run_async(&self, settings: &WriterSettings) -> RunReport {
        let sink = self.sink();
        let mut writer = match self.kind {
            WriterKind::Resource => {
                ODataWriter::resource_writer_async(sink.clone(), settings).await
            }
            WriterKind::ResourceSet => {
                ODataWriter::resource_set_writer_async(sink.clone(), settings).await
            }
        };
        let mut outcomes = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let result = apply_step_async(&mut writer, step).await;
            outcomes.push(StepOutcome {
                step: step.clone(),
                result,
                state: writer.state(),
            });
        }
        RunReport {
            outcomes,
            final_state: writer.state(),
            output: sink.text(),
        }
    }
}

/// Names of every catalog scenario.
pub const SCENARIO_NAMES: [&str; 6] = [
    "default_action",
    "empty_id_error_recovery",
    "closed_sink",
    "expanded_feed",
    "write_after_completed",
    "dispose_without_flush",
];

/// The catalog scenario called `name`.
pub fn scenario(name: &str) -> Option<Scenario> {
    let (kind, sink_closed, steps) = match name {
        // One resource advertising `#action`, written and released cleanly.
        "default_action" => (
            WriterKind::Resource,
            false,
            vec![
                Step::resource(fixtures::entry_with_default_action()),
                Step::End,
                Step::Flush,
                Step::Dispose,
            ],
        ),
        // The missing id fails `end`; the error payload is still writable once.
        "empty_id_error_recovery" => (
            WriterKind::Resource,
            false,
            vec![
                Step::resource(fixtures::entry_without_id()),
                Step::End,
                Step::error(fixtures::sample_error()),
                Step::error(fixtures::sample_error()),
                Step::Flush,
                Step::Dispose,
            ],
        ),
        "closed_sink" => (
            WriterKind::Resource,
            true,
            vec![
                Step::resource(fixtures::entry(1)),
                Step::End,
                Step::Flush,
                Step::Flush,
                Step::Dispose,
            ],
        ),
        "expanded_feed" => (
            WriterKind::ResourceSet,
            false,
            vec![
                Step::resource_set(fixtures::paged_feed()),
                Step::resource(fixtures::entry(1)),
                Step::nested_link(fixtures::orders_link()),
                Step::resource_set(ResourceSetItem::default()),
                Step::resource(fixtures::entry(10)),
                Step::End,
                Step::resource(fixtures::entry(11)),
                Step::End,
                Step::End,
                Step::End,
                Step::nested_link(fixtures::customer_link()),
                Step::resource(fixtures::entry(20)),
                Step::End,
                Step::End,
                Step::End,
                Step::resource(fixtures::entry(2)),
                Step::End,
                Step::End,
                Step::Flush,
                Step::Dispose,
            ],
        ),
        "write_after_completed" => (
            WriterKind::Resource,
            false,
            vec![
                Step::resource(fixtures::entry(1)),
                Step::End,
                Step::resource(fixtures::entry(2)),
                Step::Flush,
                Step::Dispose,
            ],
        ),
        "dispose_without_flush" => (
            WriterKind::Resource,
            false,
            vec![
                Step::resource(fixtures::entry(1)),
                Step::End,
                Step::Dispose,
                Step::Flush,
                Step::Dispose,
                Step::Dispose,
            ],
        ),
        _ => return None,
    };
    let name = SCENARIO_NAMES.into_iter().find(|known| *known == name)?;
    Some(Scenario {
        name,
        kind,
        sink_closed,
        steps,
    })
}

/// Every catalog scenario, in [`SCENARIO_NAMES`] order.
pub fn catalog() -> Vec<Scenario> {
    SCENARIO_NAMES.into_iter().filter_map(scenario).collect()
}
