//! Tests for the ROI estimator.

use crate::roi::{RoiEstimator, AUTOMATED_BASELINE_MS};
use crate::ActionType;

#[test]
fn stabilized_estimate_uses_measured_averages() {
    let mut roi = RoiEstimator::new();
    for (i, ms) in [15_000.0, 14_000.0, 16_000.0].into_iter().enumerate() {
        roi.record_manual(ActionType::Accept, ms, i as u64);
    }
    for (i, ms) in [120.0, 140.0].into_iter().enumerate() {
        roi.record_automated(ActionType::Accept, ms, 10 + i as u64);
    }

    let stats = roi.statistics();
    let accept = &stats.action_types[&ActionType::Accept];
    assert_eq!(accept.sample_count, 5);
    assert_eq!(accept.confidence_pct, 100);
    assert_eq!(accept.average_manual_ms, 15_000);
    assert_eq!(accept.average_automated_ms, 130);

    // Confidence ≥ 0.5, so the estimate is the raw difference of averages.
    let estimate = roi.estimate_saved(ActionType::Accept);
    assert!((estimate - 14_870.0).abs() < 1e-6);
}

#[test]
fn confidence_grows_with_samples_and_saturates() {
    let mut roi = RoiEstimator::new();
    let mut previous = 0.0;
    for i in 0..8u64 {
        roi.record_manual(ActionType::Run, 20_000.0, i);
        let confidence =
            roi.statistics().action_types[&ActionType::Run].confidence_pct as f64 / 100.0;
        assert!(confidence >= previous, "confidence must never decrease");
        previous = confidence;
    }
    // 8 samples against a threshold of 5: saturated.
    assert_eq!(roi.statistics().action_types[&ActionType::Run].confidence_pct, 100);
}

#[test]
fn low_confidence_estimates_are_conservatively_clamped() {
    let mut roi = RoiEstimator::new();
    // One wildly atypical manual sample: confidence 0.2.
    roi.record_manual(ActionType::Accept, 100_000.0, 0);

    let base = ActionType::Accept.pattern().base_manual_cost_ms;
    let bound = base * 0.7 - AUTOMATED_BASELINE_MS;
    let estimate = roi.estimate_saved(ActionType::Accept);
    assert!(estimate <= bound);
    assert!((estimate - bound).abs() < 1e-6);
}

#[test]
fn fresh_estimator_stays_under_the_conservative_bound() {
    let roi = RoiEstimator::new();
    for action in ActionType::ALL {
        let base = action.pattern().base_manual_cost_ms;
        let bound = (base * 0.7 - AUTOMATED_BASELINE_MS).max(0.0);
        assert!(roi.estimate_saved(action) <= bound, "{action} exceeded the clamp");
    }
}

#[test]
fn estimate_never_goes_negative() {
    let mut roi = RoiEstimator::new();
    // Automation that is slower than the manual path.
    for i in 0..5u64 {
        roi.record_manual(ActionType::Resume, 100.0, i);
        roi.record_automated(ActionType::Resume, 5_000.0, i);
    }
    assert_eq!(roi.estimate_saved(ActionType::Resume), 0.0);
}

#[test]
fn sample_windows_are_bounded_fifo() {
    let mut roi = RoiEstimator::new();
    for i in 0..60u64 {
        roi.record_manual(ActionType::Apply, 1_000.0, i);
    }
    // 50 manual samples retained, none automated.
    assert_eq!(roi.statistics().action_types[&ActionType::Apply].sample_count, 50);
}

#[test]
fn averages_track_the_most_recent_ten_samples() {
    let mut roi = RoiEstimator::new();
    for i in 0..10u64 {
        roi.record_manual(ActionType::Execute, 1_000.0, i);
    }
    for i in 10..20u64 {
        roi.record_manual(ActionType::Execute, 2_000.0, i);
    }
    let stats = roi.statistics();
    assert_eq!(stats.action_types[&ActionType::Execute].average_manual_ms, 2_000);
}

#[test]
fn global_efficiency_is_sample_count_weighted() {
    let mut roi = RoiEstimator::new();
    for i in 0..5u64 {
        roi.record_manual(ActionType::Accept, 10_000.0, i);
        roi.record_automated(ActionType::Accept, 100.0, i);
    }

    let stats = roi.statistics();
    assert_eq!(stats.total_measurements, 10);
    // Only Accept carries samples: global efficiency equals its per-type
    // efficiency, (10000 − 100) / 10000 = 99%.
    assert_eq!(stats.global_efficiency_pct, 99);
    assert_eq!(stats.action_types[&ActionType::Accept].efficiency_pct, 99);
}

#[test]
fn reset_restores_compile_time_defaults() {
    let mut roi = RoiEstimator::new();
    for i in 0..10u64 {
        roi.record_manual(ActionType::Accept, 500.0, i);
        roi.record_automated(ActionType::Accept, 400.0, i);
    }
    roi.reset();

    let stats = roi.statistics();
    let accept = &stats.action_types[&ActionType::Accept];
    assert_eq!(accept.sample_count, 0);
    assert_eq!(accept.confidence_pct, 0);
    assert_eq!(
        accept.average_manual_ms,
        ActionType::Accept.pattern().base_manual_cost_ms as i64
    );
    assert_eq!(accept.average_automated_ms, AUTOMATED_BASELINE_MS as i64);
}
