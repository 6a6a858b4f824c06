//! Durable persistence across engine restarts.

use std::sync::Arc;

use async_trait::async_trait;
use greenlight::{
    ActionType, AutomationError, CandidateElement, Descriptor, ElementLocator, Engine,
    EngineConfig, JsonFileStore, TargetInfo, TriggerContext,
};

/// Locator stub whose trigger always succeeds instantly.
struct NullLocator;

#[async_trait]
impl ElementLocator for NullLocator {
    async fn find_first_visible_match(
        &self,
        _descriptors: &[Descriptor],
    ) -> Result<Option<CandidateElement>, AutomationError> {
        Ok(None)
    }

    async fn find_all_matches(
        &self,
        _descriptors: &[Descriptor],
    ) -> Result<Vec<CandidateElement>, AutomationError> {
        Ok(Vec::new())
    }

    async fn find_target_context(
        &self,
        _element: &CandidateElement,
    ) -> Result<Option<TargetInfo>, AutomationError> {
        Ok(None)
    }

    async fn trigger(&self, _element: &CandidateElement) -> Result<(), AutomationError> {
        Ok(())
    }
}

fn engine_over(dir: &std::path::Path) -> anyhow::Result<Engine> {
    let store = Arc::new(JsonFileStore::new(dir)?);
    Ok(Engine::new(Arc::new(NullLocator), store, EngineConfig::default()))
}

fn accept_button() -> CandidateElement {
    CandidateElement::new("button", "Accept").with_position(10.0, 20.0)
}

#[tokio::test]
async fn analytics_survive_an_engine_restart() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;

    let exported = {
        let engine = engine_over(dir.path())?;
        let context = TriggerContext::for_target(TargetInfo {
            name: "src/main.rs".to_string(),
            added_lines: 12,
            deleted_lines: 4,
        });
        let outcome = engine
            .on_trigger(&accept_button(), ActionType::Accept, &context)
            .await;
        assert!(outcome.accepted);
        engine.export_analytics()
    };

    // A brand-new engine over the same directory restores the state.
    let engine = engine_over(dir.path())?;
    let status = engine.status();
    assert_eq!(status.total_accepted, 1);

    let reloaded = engine.export_analytics();
    assert_eq!(reloaded.snapshot.total_accepted, exported.snapshot.total_accepted);
    assert_eq!(reloaded.snapshot.files, exported.snapshot.files);
    assert_eq!(reloaded.snapshot.action_type_counts, exported.snapshot.action_type_counts);
    assert_eq!(reloaded.snapshot.session_start, exported.snapshot.session_start);
    assert_eq!(reloaded.snapshot.roi, exported.snapshot.roi);

    let (name, aggregate) = &reloaded.snapshot.files[0];
    assert_eq!(name, "src/main.rs");
    assert_eq!(aggregate.accept_count, 1);
    assert_eq!(aggregate.total_added, 12);
    assert_eq!(aggregate.total_deleted, 4);
    Ok(())
}

#[tokio::test]
async fn corrupt_slot_file_starts_fresh_without_panicking() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(
        dir.path().join("greenlight-analytics.json"),
        b"\x00\xffdefinitely not json",
    )?;

    let engine = engine_over(dir.path())?;
    assert_eq!(engine.status().total_accepted, 0);

    // The engine keeps working and overwrites the bad slot on first write.
    let outcome = engine
        .on_trigger(
            &accept_button(),
            ActionType::Accept,
            &TriggerContext::default(),
        )
        .await;
    assert!(outcome.accepted);

    let engine = engine_over(dir.path())?;
    assert_eq!(engine.status().total_accepted, 1);
    Ok(())
}

#[tokio::test]
async fn clear_analytics_empties_the_durable_slot() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    {
        let engine = engine_over(dir.path())?;
        engine
            .on_trigger(
                &accept_button(),
                ActionType::Accept,
                &TriggerContext::default(),
            )
            .await;
        engine.clear_analytics();
    }

    let engine = engine_over(dir.path())?;
    assert_eq!(engine.status().total_accepted, 0);
    Ok(())
}
