//! ROI Estimator: online, confidence-aware estimate of time saved per
//! action type.
//!
//! Samples are kept in bounded FIFO windows and averaged over the most
//! recent few, so the estimate tracks current behavior rather than the full
//! history. Until enough samples accumulate, estimates are clamped to a
//! conservative fraction of the configured manual cost — a handful of
//! atypical early samples must not produce inflated savings claims.

use std::collections::{BTreeMap, HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::action::ActionType;

/// Assumed cost of an automated trigger before any measurements exist.
pub const AUTOMATED_BASELINE_MS: f64 = 150.0;

/// Samples needed before an estimate is fully trusted.
const CONFIDENCE_THRESHOLD: usize = 5;
/// FIFO bound per sample sequence.
const MAX_SAMPLES: usize = 50;
/// Averages are computed over this many most-recent samples.
const RECENT_WINDOW: usize = 10;
/// Below this confidence the conservative clamp applies.
const CLAMP_BELOW_CONFIDENCE: f64 = 0.5;
/// Fraction of the base manual cost used by the conservative clamp.
const CONSERVATIVE_FACTOR: f64 = 0.7;

#[derive(Debug, Clone)]
struct SampleSet {
    manual: VecDeque<f64>,
    automated: VecDeque<f64>,
    average_manual: f64,
    average_automated: f64,
    confidence: f64,
    last_updated_ms: u64,
}

impl SampleSet {
    fn seeded(action: ActionType) -> Self {
        Self {
            manual: VecDeque::new(),
            automated: VecDeque::new(),
            average_manual: action.pattern().base_manual_cost_ms,
            average_automated: AUTOMATED_BASELINE_MS,
            confidence: 0.0,
            last_updated_ms: 0,
        }
    }

    fn sample_count(&self) -> usize {
        self.manual.len() + self.automated.len()
    }
}

/// Per-type summary, rounded for display and status export.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRoiSummary {
    pub average_manual_ms: i64,
    pub average_automated_ms: i64,
    pub estimated_saved_ms: i64,
    pub confidence_pct: i64,
    pub sample_count: usize,
    pub efficiency_pct: i64,
}

/// Aggregate view across all action types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiStatistics {
    pub action_types: BTreeMap<ActionType, ActionRoiSummary>,
    pub total_measurements: usize,
    pub average_confidence_pct: i64,
    pub global_efficiency_pct: i64,
}

/// Rolling manual/automated cost model for every action type.
#[derive(Debug)]
pub struct RoiEstimator {
    measurements: HashMap<ActionType, SampleSet>,
}

impl Default for RoiEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl RoiEstimator {
    /// A fresh estimator seeded with the compile-time defaults per type.
    pub fn new() -> Self {
        let measurements = ActionType::ALL
            .into_iter()
            .map(|action| (action, SampleSet::seeded(action)))
            .collect();
        Self { measurements }
    }

    /// Record how long a manual execution of this action took.
    pub fn record_manual(&mut self, action: ActionType, elapsed_ms: f64, now_ms: u64) {
        let set = self
            .measurements
            .entry(action)
            .or_insert_with(|| SampleSet::seeded(action));
        set.manual.push_back(elapsed_ms);
        if set.manual.len() > MAX_SAMPLES {
            set.manual.pop_front();
        }
        Self::update_averages(set, now_ms);
    }

    /// Record the measured cost of an automated trigger.
    pub fn record_automated(&mut self, action: ActionType, elapsed_ms: f64, now_ms: u64) {
        let set = self
            .measurements
            .entry(action)
            .or_insert_with(|| SampleSet::seeded(action));
        set.automated.push_back(elapsed_ms);
        if set.automated.len() > MAX_SAMPLES {
            set.automated.pop_front();
        }
        Self::update_averages(set, now_ms);
    }

    fn update_averages(set: &mut SampleSet, now_ms: u64) {
        if !set.manual.is_empty() {
            set.average_manual = recent_mean(&set.manual);
        }
        if !set.automated.is_empty() {
            set.average_automated = recent_mean(&set.automated);
        }
        set.confidence = (set.sample_count() as f64 / CONFIDENCE_THRESHOLD as f64).min(1.0);
        set.last_updated_ms = now_ms;
    }

    /// Estimated milliseconds saved by automating one occurrence of this
    /// action.
    ///
    /// With a stabilized model this is simply `avg_manual − avg_automated`.
    /// While confidence is below 0.5 the result is additionally capped at
    /// `base_manual_cost × 0.7 − automated_baseline`; with no sample set at
    /// all it falls back to `base_manual_cost − automated_baseline`.
    pub fn estimate_saved(&self, action: ActionType) -> f64 {
        let base = action.pattern().base_manual_cost_ms;
        let Some(set) = self.measurements.get(&action) else {
            return (base - AUTOMATED_BASELINE_MS).max(0.0);
        };

        let raw = (set.average_manual - set.average_automated).max(0.0);
        if set.confidence < CLAMP_BELOW_CONFIDENCE {
            let conservative = (base * CONSERVATIVE_FACTOR - AUTOMATED_BASELINE_MS).max(0.0);
            return raw.min(conservative);
        }
        raw
    }

    /// Rounded per-type summaries plus sample-count-weighted global figures.
    pub fn statistics(&self) -> RoiStatistics {
        let mut action_types = BTreeMap::new();
        let mut total_confidence = 0.0;
        let mut weighted_manual = 0.0;
        let mut weighted_automated = 0.0;
        let mut total_samples = 0usize;

        for (&action, set) in &self.measurements {
            let sample_count = set.sample_count();
            let efficiency_pct = if set.average_manual > 0.0 {
                ((set.average_manual - set.average_automated) / set.average_manual * 100.0).round()
                    as i64
            } else {
                0
            };
            action_types.insert(
                action,
                ActionRoiSummary {
                    average_manual_ms: set.average_manual.round() as i64,
                    average_automated_ms: set.average_automated.round() as i64,
                    estimated_saved_ms: self.estimate_saved(action).round() as i64,
                    confidence_pct: (set.confidence * 100.0).round() as i64,
                    sample_count,
                    efficiency_pct,
                },
            );

            total_confidence += set.confidence;
            weighted_manual += set.average_manual * sample_count as f64;
            weighted_automated += set.average_automated * sample_count as f64;
            total_samples += sample_count;
        }

        let average_confidence_pct = if self.measurements.is_empty() {
            0
        } else {
            (total_confidence / self.measurements.len() as f64 * 100.0).round() as i64
        };
        let global_efficiency_pct = if total_samples > 0 && weighted_manual > 0.0 {
            ((weighted_manual - weighted_automated) / weighted_manual * 100.0).round() as i64
        } else {
            0
        };

        RoiStatistics {
            action_types,
            total_measurements: total_samples,
            average_confidence_pct,
            global_efficiency_pct,
        }
    }

    /// Clear all samples and restore the compile-time defaults per type.
    pub fn reset(&mut self) {
        debug!("resetting ROI measurements to defaults");
        self.measurements = ActionType::ALL
            .into_iter()
            .map(|action| (action, SampleSet::seeded(action)))
            .collect();
    }
}

fn recent_mean(samples: &VecDeque<f64>) -> f64 {
    let window = samples.len().min(RECENT_WINDOW);
    let recent = samples.iter().rev().take(window);
    recent.sum::<f64>() / window as f64
}
