// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles, fixtures and scenarios for the OData writer.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`sink`] - Closable in-memory sink for blocking and async writers
//! - [`fixtures`] - Sample resources, links, operations and errors
//! - [`scenarios`] - Named step scripts and runners for both disciplines

pub mod fixtures;
pub mod scenarios;
pub mod sink;

pub use fixtures::{
    default_action, default_function, entry, entry_with_default_action, entry_without_id,
    media_resource, DEFAULT_ACTION_TARGET, DEFAULT_FUNCTION_TARGET,
};
pub use scenarios::{
    apply_step, apply_step_async, catalog, scenario, RunReport, Scenario, Step, StepOutcome,
    SCENARIO_NAMES,
};
pub use sink::{MemorySink, CLOSED_MESSAGE};
