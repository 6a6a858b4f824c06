//! Change Observer: turns a noisy stream of tree-mutation batches into a
//! rate-limited "something relevant changed" signal.
//!
//! The decision logic is split into two pure pieces — [`ChangeFilter`] for
//! relevance and [`DebounceGate`] for coalescing — so both can be driven by
//! tests with synthetic records and fixed clocks. [`ChangeObserver::run`]
//! wires them to a live subscription.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::action;

/// Debounce window: quiet period required after the last relevant event.
pub const DEFAULT_DEBOUNCE_DELAY_MS: u64 = 500;
/// Global rescan cooldown: minimum spacing between two emissions, however
/// the bursts fall.
pub const RESCAN_COOLDOWN_MS: u64 = 1_000;

/// Class fragments that mark a node as structurally interesting.
const STRUCTURAL_CLASS_HINTS: [&str; 5] = ["composer", "code-block", "diff", "button", "tool-former"];
/// Class fragments that make a `class` attribute change relevant.
const CLASS_CHANGE_HINTS: [&str; 2] = ["composer", "code-block"];

/// Flattened description of a mutated node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSummary {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub classes: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub role: Option<String>,
}

impl NodeSummary {
    fn is_clickable(&self) -> bool {
        self.tag.eq_ignore_ascii_case("button")
            || self.role.as_deref().is_some_and(|r| r.eq_ignore_ascii_case("button"))
    }
}

/// One observed tree mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MutationRecord {
    /// Nodes were added to or removed from the tree.
    #[serde(rename_all = "camelCase")]
    ChildList {
        #[serde(default)]
        added: Vec<NodeSummary>,
        #[serde(default)]
        removed: Vec<NodeSummary>,
    },
    /// An attribute changed on an existing node.
    #[serde(rename_all = "camelCase")]
    Attribute { name: String, target: NodeSummary },
}

impl MutationRecord {
    /// Parse a JSON array of mutation records, skipping malformed entries
    /// individually — one bad record never discards the batch.
    pub fn parse_batch(value: &serde_json::Value) -> Vec<MutationRecord> {
        let Some(entries) = value.as_array() else {
            warn!("mutation batch is not an array, ignoring");
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(|entry| match serde_json::from_value(entry.clone()) {
                Ok(record) => Some(record),
                Err(err) => {
                    debug!(%err, "skipping malformed mutation record");
                    None
                }
            })
            .collect()
    }
}

/// Pure relevance filter over mutation records.
#[derive(Debug, Clone, Default)]
pub struct ChangeFilter;

impl ChangeFilter {
    pub fn new() -> Self {
        Self
    }

    /// Whether any record in the batch warrants a re-scan.
    pub fn batch_relevant(&self, records: &[MutationRecord]) -> bool {
        records.iter().any(|r| self.is_relevant(r))
    }

    /// Relevance rules:
    /// - an added node whose text matches an action keyword, whose classes
    ///   match a structural hint, or which is itself clickable;
    /// - a `class` attribute change on a structurally-hinted node;
    /// - a `disabled` attribute change on a node with relevant content.
    /// Everything else is noise and is discarded without scheduling work.
    pub fn is_relevant(&self, record: &MutationRecord) -> bool {
        match record {
            MutationRecord::ChildList { added, .. } => {
                added.iter().any(|node| self.has_relevant_content(node))
            }
            MutationRecord::Attribute { name, target } => match name.as_str() {
                "class" => CLASS_CHANGE_HINTS.iter().any(|hint| target.classes.contains(hint)),
                "disabled" => self.has_relevant_content(target),
                _ => false,
            },
        }
    }

    fn has_relevant_content(&self, node: &NodeSummary) -> bool {
        let text = node.text.to_lowercase();
        action::all_keywords().any(|kw| text.contains(kw))
            || STRUCTURAL_CLASS_HINTS.iter().any(|hint| node.classes.contains(hint))
            || node.is_clickable()
    }
}

/// Pure debounce-plus-cooldown state machine.
///
/// Relevant events within the debounce window collapse into one emission,
/// scheduled `debounce_delay` after the last event of the burst. A separate
/// cooldown suppresses scheduling entirely while the previous emission is
/// younger than `cooldown` — this caps worst-case re-scan frequency no
/// matter what shape the burst takes.
#[derive(Debug, Clone)]
pub struct DebounceGate {
    debounce_delay_ms: u64,
    cooldown_ms: u64,
    pending_deadline: Option<u64>,
    last_emission: Option<u64>,
}

impl DebounceGate {
    pub fn new(debounce_delay_ms: u64, cooldown_ms: u64) -> Self {
        Self {
            debounce_delay_ms,
            cooldown_ms,
            pending_deadline: None,
            last_emission: None,
        }
    }

    /// Note a relevant event at `now_ms`. Returns whether an emission is now
    /// pending (false while the cooldown suppresses scheduling).
    pub fn record(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last_emission {
            if now_ms.saturating_sub(last) < self.cooldown_ms {
                return false;
            }
        }
        self.pending_deadline = Some(now_ms + self.debounce_delay_ms);
        true
    }

    /// Deadline of the pending emission, if one is scheduled.
    pub fn deadline(&self) -> Option<u64> {
        self.pending_deadline
    }

    /// Fire the pending emission if its deadline has passed. Returns true
    /// exactly when the caller should emit.
    pub fn fire(&mut self, now_ms: u64) -> bool {
        match self.pending_deadline {
            Some(deadline) if now_ms >= deadline => {
                self.pending_deadline = None;
                self.last_emission = Some(now_ms);
                true
            }
            _ => false,
        }
    }

    /// Drop any pending emission without firing it.
    pub fn cancel(&mut self) {
        self.pending_deadline = None;
    }
}

/// Async loop binding the filter and gate to a live mutation subscription.
pub struct ChangeObserver {
    filter: ChangeFilter,
    gate: DebounceGate,
}

impl ChangeObserver {
    pub fn new(debounce_delay_ms: u64) -> Self {
        Self {
            filter: ChangeFilter::new(),
            gate: DebounceGate::new(debounce_delay_ms, RESCAN_COOLDOWN_MS),
        }
    }

    /// Consume mutation batches until the subscription closes, sending one
    /// `()` per settled burst on `signal`. Dropping the returned future (or
    /// aborting its task) cancels the pending debounce timer.
    pub async fn run(
        mut self,
        mut batches: mpsc::Receiver<Vec<MutationRecord>>,
        signal: mpsc::Sender<()>,
    ) {
        let origin = Instant::now();
        loop {
            let deadline = self.gate.deadline();
            tokio::select! {
                maybe_batch = batches.recv() => {
                    match maybe_batch {
                        Some(records) => {
                            let now_ms = origin.elapsed().as_millis() as u64;
                            if self.filter.batch_relevant(&records) {
                                self.gate.record(now_ms);
                            }
                        }
                        None => {
                            debug!("mutation subscription closed, observer stopping");
                            break;
                        }
                    }
                }
                _ = async {
                    match deadline {
                        Some(at) => tokio::time::sleep_until(origin + Duration::from_millis(at)).await,
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    let now_ms = origin.elapsed().as_millis() as u64;
                    if self.gate.fire(now_ms) && signal.send(()).await.is_err() {
                        debug!("recheck channel closed, observer stopping");
                        break;
                    }
                }
            }
        }
    }
}
