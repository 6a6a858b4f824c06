//! Tests for the dedup guard, driven with synthetic elements and a fixed
//! clock.

use crate::dedup::{element_identity_key, DedupGuard, DEFAULT_COOLDOWN_PERIOD_MS};
use crate::element::CandidateElement;
use crate::ActionType;

fn accept_button() -> CandidateElement {
    CandidateElement::new("button", "Accept")
        .with_classes("anysphere-primary-button")
        .with_position(120.0, 480.0)
}

fn guard() -> DedupGuard {
    DedupGuard::new(DEFAULT_COOLDOWN_PERIOD_MS)
}

#[test]
fn identity_key_is_deterministic_for_a_fixed_clock() {
    let element = accept_button();
    let a = element_identity_key(&element, Some("a.rs"), 10_500);
    let b = element_identity_key(&element, Some("a.rs"), 10_900);
    // Same second bucket, same key.
    assert_eq!(a, b);

    let later = element_identity_key(&element, Some("a.rs"), 11_100);
    assert_ne!(a, later);

    let other_target = element_identity_key(&element, Some("b.rs"), 10_500);
    assert_ne!(a, other_target);
}

#[test]
fn identity_key_buckets_position_by_rounding() {
    let exact = accept_button();
    let jittered = accept_button().with_position(120.4, 479.6);
    assert_eq!(
        element_identity_key(&exact, None, 1_000),
        element_identity_key(&jittered, None, 1_000),
    );
}

#[test]
fn same_element_is_rejected_within_the_cooldown() {
    let mut guard = guard();
    let element = accept_button();

    assert!(guard.can_trigger(&element, Some("a.rs"), Some(ActionType::Accept), 1_000));
    guard.record_trigger(&element, Some("a.rs"), Some(ActionType::Accept), 1_000);

    assert!(!guard.can_trigger(&element, Some("a.rs"), Some(ActionType::Accept), 1_100));
    assert!(!guard.can_trigger(&element, Some("a.rs"), Some(ActionType::Accept), 2_900));
}

#[test]
fn rerendered_equivalent_node_is_rejected_by_the_operation_key() {
    let mut guard = guard();
    let first = accept_button();
    // The host re-rendered the same logical affordance at a new position
    // with a new class — a distinct identity key.
    let rerendered = CandidateElement::new("div", "Accept")
        .with_classes("anysphere-text-button")
        .with_position(130.0, 502.0);

    guard.record_trigger(&first, Some("a.rs"), Some(ActionType::Accept), 1_000);
    assert!(!guard.can_trigger(&rerendered, Some("a.rs"), Some(ActionType::Accept), 1_500));
}

#[test]
fn trigger_is_permitted_again_after_the_cooldown() {
    let mut guard = guard();
    let element = accept_button();

    guard.record_trigger(&element, Some("a.rs"), Some(ActionType::Accept), 1_000);
    assert!(guard.can_trigger(&element, Some("a.rs"), Some(ActionType::Accept), 3_000));
}

#[test]
fn unrelated_untargeted_actions_share_the_unknown_bucket() {
    let mut guard = guard();
    let first = accept_button().with_position(10.0, 10.0);
    let second = accept_button().with_position(900.0, 900.0);

    guard.record_trigger(&first, None, Some(ActionType::Accept), 1_000);
    // Different visual node, but no target metadata: the operation key
    // degrades to the constant "unknown" bucket and suppresses it.
    assert!(!guard.can_trigger(&second, None, Some(ActionType::Accept), 1_500));
    // A different action type uses a different bucket.
    assert!(guard.can_trigger(&second, None, Some(ActionType::Run), 1_500));
}

#[test]
fn maps_are_bounded_and_evict_oldest_first() {
    let mut guard = guard();
    for i in 0..150u64 {
        let element =
            CandidateElement::new("button", format!("Accept {i}")).with_position(i as f64, 0.0);
        let target = format!("file-{i}.rs");
        guard.record_trigger(&element, Some(&target), Some(ActionType::Accept), 1_000 + i);
    }

    let stats = guard.stats();
    assert_eq!(stats.elements_tracked, 100);
    assert_eq!(stats.operations_tracked, 100);

    // The newest operation is still tracked; the oldest were evicted.
    assert!(!guard.can_trigger(
        &CandidateElement::new("span", "other"),
        Some("file-149.rs"),
        Some(ActionType::Accept),
        1_200,
    ));
}

#[test]
fn stale_records_are_purged_on_the_next_trigger() {
    let mut guard = guard();
    let element = accept_button();
    guard.record_trigger(&element, Some("a.rs"), Some(ActionType::Accept), 1_000);

    // 5 × cooldown later, the next record's cleanup drops the stale entries.
    let fresh = CandidateElement::new("button", "Run").with_position(5.0, 5.0);
    guard.record_trigger(&fresh, Some("b.rs"), Some(ActionType::Run), 20_000);

    let stats = guard.stats();
    assert_eq!(stats.elements_tracked, 1);
    assert_eq!(stats.operations_tracked, 1);
}

#[test]
fn reset_clears_all_tracking() {
    let mut guard = guard();
    guard.record_trigger(&accept_button(), Some("a.rs"), Some(ActionType::Accept), 1_000);
    guard.reset();

    let stats = guard.stats();
    assert_eq!(stats.elements_tracked, 0);
    assert_eq!(stats.operations_tracked, 0);
    assert!(guard.can_trigger(&accept_button(), Some("a.rs"), Some(ActionType::Accept), 1_100));
}
