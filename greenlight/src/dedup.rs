//! Dedup Guard: at most one trigger per logical occurrence.
//!
//! Two independent checks are both required. The element-identity key
//! catches literal re-triggering of the same visual node across rapid
//! re-scans; the operation key catches the host re-rendering an
//! equivalent-but-distinct node for the same logical action. The observed
//! host UI does both.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::element::CandidateElement;
use crate::ActionType;

pub const DEFAULT_COOLDOWN_PERIOD_MS: u64 = 2_000;

/// Records older than this multiple of the cooldown are purged.
const EXPIRY_FACTOR: u64 = 5;
/// Hard cap per map; oldest entries beyond it are evicted.
const MAX_TRACKED_ENTRIES: usize = 100;

/// Derive the identity key for a candidate element.
///
/// Pure in `(element, target, now_ms)` so dedup logic is testable with
/// synthetic elements and fixed clocks. Combines tag, classes, text, target,
/// a rounded position bucket, and a second-granularity time bucket; the
/// position and time components make the key inherently short-lived, which
/// is why it is never persisted.
pub fn element_identity_key(
    element: &CandidateElement,
    target: Option<&str>,
    now_ms: u64,
) -> String {
    format!(
        "{}:{}:{}:{}:{},{}:{}",
        element.tag,
        element.class_names,
        element.display_text.trim(),
        target.unwrap_or(""),
        element.position.x.round() as i64,
        element.position.y.round() as i64,
        now_ms / 1_000,
    )
}

/// Counters exposed through the engine status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DedupStats {
    pub elements_tracked: usize,
    pub operations_tracked: usize,
    pub cooldown_period_ms: u64,
}

/// Cooldown bookkeeping for recently-triggered elements and operations.
#[derive(Debug)]
pub struct DedupGuard {
    cooldown_period_ms: u64,
    recent_element_triggers: HashMap<String, u64>,
    recent_operation_triggers: HashMap<String, u64>,
}

impl DedupGuard {
    pub fn new(cooldown_period_ms: u64) -> Self {
        Self {
            cooldown_period_ms,
            recent_element_triggers: HashMap::new(),
            recent_operation_triggers: HashMap::new(),
        }
    }

    pub fn set_cooldown_period(&mut self, cooldown_period_ms: u64) {
        self.cooldown_period_ms = cooldown_period_ms;
    }

    /// Operation key: `(target ?? "unknown") : (action ?? "unknown")`.
    ///
    /// Target-less actions collapse into one "unknown" bucket, so unrelated
    /// untargeted actions within the cooldown window deduplicate against
    /// each other. Intentionally conservative.
    fn operation_key(target: Option<&str>, action: Option<ActionType>) -> String {
        format!(
            "{}:{}",
            target.unwrap_or("unknown"),
            action.map(|a| a.as_str()).unwrap_or("unknown"),
        )
    }

    /// Whether triggering this element for this operation is currently
    /// permitted.
    pub fn can_trigger(
        &self,
        element: &CandidateElement,
        target: Option<&str>,
        action: Option<ActionType>,
        now_ms: u64,
    ) -> bool {
        let element_key = element_identity_key(element, target, now_ms);
        if let Some(&last) = self.recent_element_triggers.get(&element_key) {
            if now_ms.saturating_sub(last) < self.cooldown_period_ms {
                trace!(%element_key, "element within cooldown");
                return false;
            }
        }

        let operation_key = Self::operation_key(target, action);
        if let Some(&last) = self.recent_operation_triggers.get(&operation_key) {
            if now_ms.saturating_sub(last) < self.cooldown_period_ms {
                trace!(%operation_key, "operation within cooldown");
                return false;
            }
        }

        true
    }

    /// Record a trigger against both maps, then clean up expired and excess
    /// entries.
    pub fn record_trigger(
        &mut self,
        element: &CandidateElement,
        target: Option<&str>,
        action: Option<ActionType>,
        now_ms: u64,
    ) {
        let element_key = element_identity_key(element, target, now_ms);
        self.recent_element_triggers.insert(element_key, now_ms);

        let operation_key = Self::operation_key(target, action);
        self.recent_operation_triggers.insert(operation_key, now_ms);

        self.cleanup(now_ms);
    }

    fn cleanup(&mut self, now_ms: u64) {
        let expire_after = self.cooldown_period_ms * EXPIRY_FACTOR;
        self.recent_element_triggers
            .retain(|_, &mut at| now_ms.saturating_sub(at) <= expire_after);
        self.recent_operation_triggers
            .retain(|_, &mut at| now_ms.saturating_sub(at) <= expire_after);

        evict_oldest(&mut self.recent_element_triggers, MAX_TRACKED_ENTRIES);
        evict_oldest(&mut self.recent_operation_triggers, MAX_TRACKED_ENTRIES);
    }

    pub fn stats(&self) -> DedupStats {
        DedupStats {
            elements_tracked: self.recent_element_triggers.len(),
            operations_tracked: self.recent_operation_triggers.len(),
            cooldown_period_ms: self.cooldown_period_ms,
        }
    }

    pub fn reset(&mut self) {
        self.recent_element_triggers.clear();
        self.recent_operation_triggers.clear();
    }
}

fn evict_oldest(map: &mut HashMap<String, u64>, max_entries: usize) {
    if map.len() <= max_entries {
        return;
    }
    let mut entries: Vec<(String, u64)> = map.drain().collect();
    entries.sort_by_key(|&(_, at)| at);
    let excess = entries.len() - max_entries;
    map.extend(entries.into_iter().skip(excess));
}
