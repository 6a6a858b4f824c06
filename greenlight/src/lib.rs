//! Reactive auto-trigger engine for transient UI affordances
//!
//! This crate watches a live, constantly-mutating UI element tree for
//! semantically-typed actionable elements (confirmation and continue
//! affordances), decides — exactly once per logical occurrence — whether to
//! trigger each one automatically, and keeps a confidence-weighted running
//! estimate of the time saved versus an equivalent manual interaction.
//!
//! The host supplies two capabilities: an [`ElementLocator`] that resolves
//! search descriptors into [`CandidateElement`] snapshots and performs the
//! actual trigger, and a mutation subscription feeding
//! [`MutationRecord`] batches into [`Engine::start`]. Everything else —
//! relevance filtering, debouncing, classification, dedup, ROI estimation,
//! and durable session analytics — lives here.

use serde::{Deserialize, Serialize};

pub mod action;
pub mod analytics;
pub mod classifier;
pub mod config;
pub mod dedup;
pub mod descriptor;
pub mod element;
pub mod engine;
pub mod errors;
pub mod observer;
pub mod roi;
pub mod store;
#[cfg(test)]
mod tests;

pub use action::{ActionPattern, ActionType};
pub use analytics::{AnalyticsExport, AnalyticsSummary, PersistedState, TargetAggregate};
pub use config::{ConfigUpdate, EngineConfig};
pub use dedup::{DedupGuard, DedupStats};
pub use descriptor::Descriptor;
pub use element::{CandidateElement, ElementLocator, Position, TargetInfo};
pub use engine::{Engine, EngineStatus, TriggerContext};
pub use errors::AutomationError;
pub use observer::{ChangeFilter, ChangeObserver, DebounceGate, MutationRecord, NodeSummary};
pub use roi::{RoiEstimator, RoiStatistics};
pub use store::{JsonFileStore, MemoryStore, StateStore};

/// Result of one trigger attempt through [`Engine::on_trigger`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerOutcome {
    /// Whether the attempt was authorized, performed, and recorded. A
    /// dedup rejection is a normal `false`, not an error.
    pub accepted: bool,
    /// Estimated milliseconds of manual work this trigger saved.
    pub estimated_time_saved_ms: f64,
}

impl TriggerOutcome {
    pub(crate) fn rejected() -> Self {
        Self {
            accepted: false,
            estimated_time_saved_ms: 0.0,
        }
    }
}
