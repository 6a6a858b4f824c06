//! Session Analytics Store: durable, deduplicated, aggregate recording of
//! accepted actions.
//!
//! Deduplication here is a second, coarser layer than the Dedup Guard — it
//! protects the persisted counters even if a caller bypasses the guard.
//! Every mutating call writes through to the durable slot; a failed write
//! degrades to in-memory operation with a warning, never to a crash.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::action::ActionType;
use crate::store::StateStore;

pub const DEFAULT_OPERATION_WINDOW_MS: u64 = 5_000;

/// Durable slot name for the persisted state.
pub const STORAGE_KEY: &str = "greenlight-analytics";

/// Operation records older than this multiple of the window are purged.
const OPERATION_EXPIRY_FACTOR: u64 = 10;
/// Bound on the session and workflow logs; oldest entries are dropped.
const MAX_LOG_ENTRIES: usize = 500;
/// How many recent operations the summary exposes.
const RECENT_TAIL: usize = 20;

const STATE_VERSION: &str = "1";

/// Fallback target name for operations with no target metadata. Untargeted
/// operations of one action type share a single dedup bucket per window.
const UNKNOWN_TARGET: &str = "unknown";

/// Per-target aggregate counters. Never deleted except by explicit reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetAggregate {
    #[serde(default)]
    pub accept_count: u64,
    #[serde(default)]
    pub first_seen: u64,
    #[serde(default)]
    pub last_seen: u64,
    #[serde(default)]
    pub total_added: u64,
    #[serde(default)]
    pub total_deleted: u64,
    #[serde(default, with = "action_pairs")]
    pub action_types: BTreeMap<ActionType, u64>,
}

/// One accepted operation, as appended to the session log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationLogEntry {
    pub target: String,
    pub action: Option<ActionType>,
    #[serde(default)]
    pub added_lines: u64,
    #[serde(default)]
    pub deleted_lines: u64,
    #[serde(default)]
    pub time_saved_ms: f64,
    #[serde(default)]
    pub timestamp_ms: u64,
    #[serde(default)]
    pub operation_id: String,
}

/// Entry in the cumulative ROI workflow log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSession {
    pub target: String,
    pub action: Option<ActionType>,
    #[serde(default)]
    pub time_saved_ms: f64,
    #[serde(default)]
    pub timestamp_ms: u64,
    #[serde(default)]
    pub operation_id: String,
}

/// Cumulative ROI totals inside the persisted layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiTotals {
    #[serde(default)]
    pub total_time_saved: f64,
    #[serde(default)]
    pub workflow_sessions: Vec<WorkflowSession>,
}

/// The versioned durable layout. Loaders accept any prior version missing
/// newer fields by defaulting them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub files: Vec<(String, TargetAggregate)>,
    #[serde(default)]
    pub sessions: Vec<OperationLogEntry>,
    #[serde(default, with = "action_pairs")]
    pub action_type_counts: BTreeMap<ActionType, u64>,
    #[serde(default)]
    pub total_accepted: u64,
    #[serde(default)]
    pub session_start: u64,
    #[serde(default)]
    pub roi: RoiTotals,
    #[serde(default)]
    pub saved_at: u64,
}

/// Read-only session overview derived from the current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_accepted: u64,
    pub session_start_ms: u64,
    pub session_duration_ms: u64,
    pub operations_tracked: usize,
    pub total_targets: usize,
    pub total_added: u64,
    pub total_deleted: u64,
    pub most_active_targets: Vec<(String, u64)>,
    pub action_counts: Vec<(ActionType, u64)>,
    pub total_time_saved_ms: f64,
    pub average_saved_per_operation_ms: f64,
    pub recent_operations: Vec<OperationLogEntry>,
}

/// Full export: overview plus the exact durable snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsExport {
    pub summary: AnalyticsSummary,
    pub snapshot: PersistedState,
    pub exported_at_ms: u64,
}

pub struct AnalyticsStore {
    store: Arc<dyn StateStore>,
    operation_window_ms: u64,
    files: BTreeMap<String, TargetAggregate>,
    /// operation id → acceptance timestamp; intentionally not persisted
    /// (the time-bucketed ids are short-lived by construction).
    operations: HashMap<String, u64>,
    sessions: Vec<OperationLogEntry>,
    action_type_counts: BTreeMap<ActionType, u64>,
    total_accepted: u64,
    session_start_ms: u64,
    total_time_saved_ms: f64,
    workflow_sessions: Vec<WorkflowSession>,
}

impl AnalyticsStore {
    /// Create a store bound to a durable slot, restoring any prior state.
    /// Malformed or missing stored data falls back to a fresh state with a
    /// recoverable warning; it never panics.
    pub fn new(store: Arc<dyn StateStore>, operation_window_ms: u64, now_ms: u64) -> Self {
        let mut analytics = Self {
            store,
            operation_window_ms,
            files: BTreeMap::new(),
            operations: HashMap::new(),
            sessions: Vec::new(),
            action_type_counts: BTreeMap::new(),
            total_accepted: 0,
            session_start_ms: now_ms,
            total_time_saved_ms: 0.0,
            workflow_sessions: Vec::new(),
        };
        analytics.restore(now_ms);
        analytics
    }

    pub fn set_operation_window(&mut self, operation_window_ms: u64) {
        self.operation_window_ms = operation_window_ms;
    }

    pub fn total_accepted(&self) -> u64 {
        self.total_accepted
    }

    pub fn total_time_saved_ms(&self) -> f64 {
        self.total_time_saved_ms
    }

    fn operation_id(&self, target: Option<&str>, action: Option<ActionType>, ts_ms: u64) -> String {
        format!(
            "{}:{}:{}",
            target.unwrap_or(UNKNOWN_TARGET),
            action.map(|a| a.as_str()).unwrap_or(UNKNOWN_TARGET),
            ts_ms / self.operation_window_ms.max(1),
        )
    }

    /// Whether an equivalent operation was already accepted in the same
    /// time bucket.
    pub fn is_duplicate(&self, target: Option<&str>, action: Option<ActionType>, ts_ms: u64) -> bool {
        self.operations
            .contains_key(&self.operation_id(target, action, ts_ms))
    }

    /// Record one accepted action. Returns `false` — without mutating any
    /// counter — when the operation duplicates one already accepted in its
    /// time bucket; this is the exactly-once contract at the persistence
    /// boundary.
    pub fn record_acceptance(
        &mut self,
        target: Option<&str>,
        action: Option<ActionType>,
        time_saved_ms: f64,
        added_lines: u64,
        deleted_lines: u64,
        now_ms: u64,
    ) -> bool {
        if self.is_duplicate(target, action, now_ms) {
            debug!(?target, ?action, "duplicate operation, skipping record");
            return false;
        }

        let operation_id = self.operation_id(target, action, now_ms);
        self.operations.insert(operation_id.clone(), now_ms);

        let target_name = target.unwrap_or(UNKNOWN_TARGET).to_string();
        let aggregate = self.files.entry(target_name.clone()).or_insert_with(|| {
            TargetAggregate {
                first_seen: now_ms,
                ..Default::default()
            }
        });
        aggregate.accept_count += 1;
        aggregate.last_seen = now_ms;
        // Zero-delta updates must not disturb the cumulative totals.
        if added_lines > 0 || deleted_lines > 0 {
            aggregate.total_added += added_lines;
            aggregate.total_deleted += deleted_lines;
        }
        if let Some(action) = action {
            *aggregate.action_types.entry(action).or_insert(0) += 1;
            *self.action_type_counts.entry(action).or_insert(0) += 1;
        }

        self.sessions.push(OperationLogEntry {
            target: target_name.clone(),
            action,
            added_lines,
            deleted_lines,
            time_saved_ms,
            timestamp_ms: now_ms,
            operation_id: operation_id.clone(),
        });
        trim_front(&mut self.sessions, MAX_LOG_ENTRIES);

        self.total_accepted += 1;
        self.total_time_saved_ms += time_saved_ms;
        self.workflow_sessions.push(WorkflowSession {
            target: target_name,
            action,
            time_saved_ms,
            timestamp_ms: now_ms,
            operation_id,
        });
        trim_front(&mut self.workflow_sessions, MAX_LOG_ENTRIES);

        self.persist(now_ms);
        true
    }

    /// Purge operation records old enough that their bucket can no longer
    /// recur.
    pub fn cleanup_operations(&mut self, now_ms: u64) {
        let expire_after = self.operation_window_ms * OPERATION_EXPIRY_FACTOR;
        self.operations
            .retain(|_, &mut at| now_ms.saturating_sub(at) <= expire_after);
    }

    /// The exact durable layout for the current state.
    pub fn snapshot(&self, now_ms: u64) -> PersistedState {
        PersistedState {
            version: STATE_VERSION.to_string(),
            files: self
                .files
                .iter()
                .map(|(name, agg)| (name.clone(), agg.clone()))
                .collect(),
            sessions: self.sessions.clone(),
            action_type_counts: self.action_type_counts.clone(),
            total_accepted: self.total_accepted,
            session_start: self.session_start_ms,
            roi: RoiTotals {
                total_time_saved: self.total_time_saved_ms,
                workflow_sessions: self.workflow_sessions.clone(),
            },
            saved_at: now_ms,
        }
    }

    /// Read-only session overview.
    pub fn summary(&self, now_ms: u64) -> AnalyticsSummary {
        let mut total_added = 0;
        let mut total_deleted = 0;
        let mut by_activity: Vec<(String, u64)> = self
            .files
            .iter()
            .map(|(name, agg)| {
                total_added += agg.total_added;
                total_deleted += agg.total_deleted;
                (name.clone(), agg.accept_count)
            })
            .collect();
        by_activity.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        by_activity.truncate(5);

        let mut action_counts: Vec<(ActionType, u64)> = self
            .action_type_counts
            .iter()
            .map(|(&action, &count)| (action, count))
            .collect();
        action_counts.sort_by(|a, b| b.1.cmp(&a.1));

        let recent_start = self.sessions.len().saturating_sub(RECENT_TAIL);
        AnalyticsSummary {
            total_accepted: self.total_accepted,
            session_start_ms: self.session_start_ms,
            session_duration_ms: now_ms.saturating_sub(self.session_start_ms),
            operations_tracked: self.operations.len(),
            total_targets: self.files.len(),
            total_added,
            total_deleted,
            most_active_targets: by_activity,
            action_counts,
            total_time_saved_ms: self.total_time_saved_ms,
            average_saved_per_operation_ms: if self.total_accepted > 0 {
                self.total_time_saved_ms / self.total_accepted as f64
            } else {
                0.0
            },
            recent_operations: self.sessions[recent_start..].to_vec(),
        }
    }

    /// Full export: overview plus the durable snapshot.
    pub fn export(&self, now_ms: u64) -> AnalyticsExport {
        AnalyticsExport {
            summary: self.summary(now_ms),
            snapshot: self.snapshot(now_ms),
            exported_at_ms: now_ms,
        }
    }

    /// Destructive reset: zero all counters and clear the durable slot.
    pub fn clear_all(&mut self, now_ms: u64) {
        self.files.clear();
        self.operations.clear();
        self.sessions.clear();
        self.action_type_counts.clear();
        self.total_accepted = 0;
        self.session_start_ms = now_ms;
        self.total_time_saved_ms = 0.0;
        self.workflow_sessions.clear();
        if let Err(err) = self.store.remove(STORAGE_KEY) {
            warn!(%err, "failed to clear durable analytics slot");
        }
    }

    fn persist(&self, now_ms: u64) {
        let snapshot = self.snapshot(now_ms);
        let serialized = match serde_json::to_string(&snapshot) {
            Ok(s) => s,
            Err(err) => {
                warn!(%err, "failed to serialize analytics state");
                return;
            }
        };
        if let Err(err) = self.store.save(STORAGE_KEY, &serialized) {
            warn!(%err, "analytics write-through failed, continuing un-persisted");
        }
    }

    /// Restore from the durable slot, recovering field-by-field. Corrupt
    /// fields are replaced with defaults rather than discarding the record.
    fn restore(&mut self, now_ms: u64) {
        let raw = match self.store.load(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(err) => {
                warn!(%err, "failed to read durable analytics slot, starting fresh");
                return;
            }
        };
        let value: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(err) => {
                warn!(%err, "stored analytics state is not valid JSON, starting fresh");
                return;
            }
        };

        if let Some(entries) = value.get("files").and_then(Value::as_array) {
            for entry in entries {
                let Some(pair) = entry.as_array().filter(|p| p.len() == 2) else {
                    continue;
                };
                let Some(name) = pair[0].as_str() else { continue };
                let aggregate: TargetAggregate =
                    serde_json::from_value(pair[1].clone()).unwrap_or_default();
                self.files.insert(name.to_string(), aggregate);
            }
        }
        if let Some(entries) = value.get("sessions").and_then(Value::as_array) {
            self.sessions = entries
                .iter()
                .filter_map(|e| serde_json::from_value(e.clone()).ok())
                .collect();
            trim_front(&mut self.sessions, MAX_LOG_ENTRIES);
        }
        if let Some(counts) = value.get("actionTypeCounts") {
            let pairs: Vec<(ActionType, u64)> =
                serde_json::from_value(counts.clone()).unwrap_or_default();
            self.action_type_counts = pairs.into_iter().collect();
        }
        self.total_accepted = value
            .get("totalAccepted")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        self.session_start_ms = value
            .get("sessionStart")
            .and_then(Value::as_u64)
            .unwrap_or(now_ms);
        if let Some(roi) = value.get("roi") {
            self.total_time_saved_ms = roi
                .get("totalTimeSaved")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            if let Some(entries) = roi.get("workflowSessions").and_then(Value::as_array) {
                self.workflow_sessions = entries
                    .iter()
                    .filter_map(|e| serde_json::from_value(e.clone()).ok())
                    .collect();
                trim_front(&mut self.workflow_sessions, MAX_LOG_ENTRIES);
            }
        }
        debug!(
            total_accepted = self.total_accepted,
            targets = self.files.len(),
            "restored analytics state"
        );
    }
}

fn trim_front<T>(log: &mut Vec<T>, max: usize) {
    if log.len() > max {
        log.drain(..log.len() - max);
    }
}

/// Persist action-count maps as `[[type, count], ...]` pairs, matching the
/// durable layout.
mod action_pairs {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<ActionType, u64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let pairs: Vec<(ActionType, u64)> = map.iter().map(|(&k, &v)| (k, v)).collect();
        pairs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<ActionType, u64>, D::Error> {
        let pairs: Vec<(ActionType, u64)> = Vec::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
