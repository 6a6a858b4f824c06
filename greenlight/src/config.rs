//! Engine configuration.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::action::ActionType;
use crate::analytics::DEFAULT_OPERATION_WINDOW_MS;
use crate::dedup::DEFAULT_COOLDOWN_PERIOD_MS;
use crate::observer::DEFAULT_DEBOUNCE_DELAY_MS;

/// Tunable knobs of the engine. Everything else is compile-time data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Minimum spacing between two triggers considered "the same".
    pub cooldown_period_ms: u64,
    /// Quiet period required after the last relevant mutation before a
    /// re-scan is signalled.
    pub debounce_delay_ms: u64,
    /// Time-bucket granularity of the persisted acceptance dedup.
    pub operation_window_ms: u64,
    /// Action types the engine is allowed to trigger automatically.
    pub enabled_actions: BTreeSet<ActionType>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cooldown_period_ms: DEFAULT_COOLDOWN_PERIOD_MS,
            debounce_delay_ms: DEFAULT_DEBOUNCE_DELAY_MS,
            operation_window_ms: DEFAULT_OPERATION_WINDOW_MS,
            enabled_actions: ActionType::ALL.into_iter().collect(),
        }
    }
}

impl EngineConfig {
    pub fn is_enabled(&self, action: ActionType) -> bool {
        self.enabled_actions.contains(&action)
    }
}

/// Partial configuration update; unset fields keep their current values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_period_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_window_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_actions: Option<BTreeSet<ActionType>>,
}

impl ConfigUpdate {
    /// Fold this update into an existing configuration.
    pub fn apply_to(&self, config: &mut EngineConfig) {
        if let Some(cooldown) = self.cooldown_period_ms {
            config.cooldown_period_ms = cooldown;
        }
        if let Some(debounce) = self.debounce_delay_ms {
            config.debounce_delay_ms = debounce;
        }
        if let Some(window) = self.operation_window_ms {
            config.operation_window_ms = window;
        }
        if let Some(enabled) = &self.enabled_actions {
            config.enabled_actions = enabled.clone();
        }
    }
}
