//! The engine: lifecycle, recheck cycle, and the controller-facing call
//! contract.
//!
//! An [`Engine`] is an explicitly constructed instance owning all of its
//! state — guard maps, ROI samples, analytics — so hosts can run several
//! independent engines (and tests can run hundreds). All mutation happens
//! in short critical sections on one internal lock; the only operation with
//! externally-observable latency is the locator's trigger action, which is
//! never awaited while the lock is held.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::action::ActionType;
use crate::analytics::{AnalyticsExport, AnalyticsStore};
use crate::classifier;
use crate::config::{ConfigUpdate, EngineConfig};
use crate::dedup::{DedupGuard, DedupStats};
use crate::descriptor;
use crate::element::{CandidateElement, ElementLocator, TargetInfo};
use crate::observer::{ChangeObserver, MutationRecord};
use crate::roi::{RoiEstimator, RoiStatistics};
use crate::store::StateStore;
use crate::TriggerOutcome;

/// Caller-supplied context for a trigger attempt.
#[derive(Debug, Clone, Default)]
pub struct TriggerContext {
    pub target: Option<TargetInfo>,
}

impl TriggerContext {
    pub fn for_target(target: TargetInfo) -> Self {
        Self {
            target: Some(target),
        }
    }

    fn target_name(&self) -> Option<&str> {
        self.target.as_ref().map(|t| t.name.as_str())
    }
}

/// Point-in-time view of the engine, for hosts and control surfaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub running: bool,
    pub total_accepted: u64,
    pub total_failed: u64,
    pub config: EngineConfig,
    pub roi: RoiStatistics,
    pub dedup: DedupStats,
}

struct Core {
    config: EngineConfig,
    dedup: DedupGuard,
    roi: RoiEstimator,
    analytics: AnalyticsStore,
    total_failed: u64,
    running: bool,
}

struct WatchHandle {
    observer: JoinHandle<()>,
    recheck: JoinHandle<()>,
}

/// The detection–dedup–telemetry engine.
pub struct Engine {
    locator: Arc<dyn ElementLocator>,
    core: Arc<Mutex<Core>>,
    watch: Mutex<Option<WatchHandle>>,
}

impl Engine {
    /// Construct an engine over a locator capability and a durable store.
    /// Prior analytics state is restored from the store immediately.
    pub fn new(
        locator: Arc<dyn ElementLocator>,
        store: Arc<dyn StateStore>,
        config: EngineConfig,
    ) -> Self {
        let now = now_ms();
        let core = Core {
            dedup: DedupGuard::new(config.cooldown_period_ms),
            roi: RoiEstimator::new(),
            analytics: AnalyticsStore::new(store, config.operation_window_ms, now),
            config,
            total_failed: 0,
            running: false,
        };
        Self {
            locator,
            core: Arc::new(Mutex::new(core)),
            watch: Mutex::new(None),
        }
    }

    /// Begin watching a mutation subscription. Starting while already
    /// started is a no-op. Must be called within a Tokio runtime.
    #[instrument(skip(self, batches))]
    pub fn start(&self, batches: mpsc::Receiver<Vec<MutationRecord>>) {
        let mut watch = lock(&self.watch);
        if watch.is_some() {
            debug!("engine already running, start is a no-op");
            return;
        }

        let debounce_delay_ms = {
            let mut core = lock(&self.core);
            core.running = true;
            core.config.debounce_delay_ms
        };

        let (signal_tx, mut signal_rx) = mpsc::channel(8);
        let observer_task =
            tokio::spawn(ChangeObserver::new(debounce_delay_ms).run(batches, signal_tx));

        let locator = self.locator.clone();
        let core = self.core.clone();
        let recheck_task = tokio::spawn(async move {
            while signal_rx.recv().await.is_some() {
                run_recheck(&locator, &core).await;
            }
        });

        *watch = Some(WatchHandle {
            observer: observer_task,
            recheck: recheck_task,
        });
        info!("engine started");
    }

    /// Stop watching: cancels any pending debounce and detaches the
    /// mutation subscription. In-flight trigger attempts are not forcibly
    /// cancelled. Stopping while stopped is a no-op.
    #[instrument(skip(self))]
    pub fn stop(&self) {
        let mut watch = lock(&self.watch);
        if let Some(handle) = watch.take() {
            handle.observer.abort();
            handle.recheck.abort();
            info!("engine stopped");
        }
        lock(&self.core).running = false;
    }

    pub fn is_running(&self) -> bool {
        lock(&self.core).running
    }

    /// The single trigger entry point: dedup authorization, the locator's
    /// trigger action (timed), ROI recording, analytics recording.
    #[instrument(skip(self, element, context), fields(action = %action))]
    pub async fn on_trigger(
        &self,
        element: &CandidateElement,
        action: ActionType,
        context: &TriggerContext,
    ) -> TriggerOutcome {
        trigger_once(&self.locator, &self.core, element, action, context).await
    }

    /// Feed a measured manual-workflow duration into the ROI model.
    pub fn record_manual(&self, action: ActionType, elapsed_ms: f64) {
        lock(&self.core).roi.record_manual(action, elapsed_ms, now_ms());
    }

    pub fn status(&self) -> EngineStatus {
        let core = lock(&self.core);
        EngineStatus {
            running: core.running,
            total_accepted: core.analytics.total_accepted(),
            total_failed: core.total_failed,
            config: core.config.clone(),
            roi: core.roi.statistics(),
            dedup: core.dedup.stats(),
        }
    }

    /// Apply a partial configuration update. A changed debounce delay takes
    /// effect on the next `start`.
    pub fn configure(&self, update: &ConfigUpdate) -> EngineConfig {
        let mut core = lock(&self.core);
        update.apply_to(&mut core.config);
        let cooldown = core.config.cooldown_period_ms;
        let window = core.config.operation_window_ms;
        core.dedup.set_cooldown_period(cooldown);
        core.analytics.set_operation_window(window);
        core.config.clone()
    }

    /// Disable every action type except the given ones.
    pub fn enable_only(&self, actions: &[ActionType]) -> EngineConfig {
        let mut core = lock(&self.core);
        core.config.enabled_actions = actions.iter().copied().collect();
        core.config.clone()
    }

    /// Full analytics export: session overview plus the durable snapshot.
    pub fn export_analytics(&self) -> AnalyticsExport {
        let now = now_ms();
        let mut core = lock(&self.core);
        core.analytics.cleanup_operations(now);
        core.analytics.export(now)
    }

    /// Destructive reset of analytics, ROI samples, and dedup state.
    pub fn clear_analytics(&self) {
        let now = now_ms();
        let mut core = lock(&self.core);
        core.analytics.clear_all(now);
        core.roi.reset();
        core.dedup.reset();
        core.total_failed = 0;
        info!("analytics cleared");
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.watch).take() {
            handle.observer.abort();
            handle.recheck.abort();
        }
    }
}

/// One debounced re-scan: locate candidates, classify the first actionable
/// one, and attempt a trigger. Locator errors mean "no candidates this
/// cycle", never a stopped engine.
async fn run_recheck(locator: &Arc<dyn ElementLocator>, core: &Arc<Mutex<Core>>) {
    let mut descriptors = descriptor::actionable_containers();
    if lock(core).config.is_enabled(ActionType::Resume) {
        descriptors.extend(descriptor::resume_links());
    }

    let candidates = match locator.find_all_matches(&descriptors).await {
        Ok(candidates) => candidates,
        Err(err) => {
            warn!(%err, "locator failed, no candidates this cycle");
            return;
        }
    };

    for element in candidates {
        if !element.is_visible || !element.is_interactable {
            continue;
        }
        let Some(action) = classifier::classify(&element) else {
            continue;
        };
        if !lock(core).config.is_enabled(action) {
            debug!(action = %action, "first actionable candidate is disabled, skipping cycle");
            return;
        }

        let target = match locator.find_target_context(&element).await {
            Ok(target) => target,
            Err(err) => {
                warn!(%err, "target context lookup failed, proceeding untargeted");
                None
            }
        };
        let context = TriggerContext { target };
        trigger_once(locator, core, &element, action, &context).await;
        return;
    }
}

async fn trigger_once(
    locator: &Arc<dyn ElementLocator>,
    core: &Arc<Mutex<Core>>,
    element: &CandidateElement,
    action: ActionType,
    context: &TriggerContext,
) -> TriggerOutcome {
    let now = now_ms();
    {
        let mut core = lock(core);
        if !core.config.is_enabled(action) {
            debug!(action = %action, "action type disabled");
            return TriggerOutcome::rejected();
        }
        let target = context.target_name();
        if !core.dedup.can_trigger(element, target, Some(action), now) {
            debug!(action = %action, "dedup guard rejected trigger");
            return TriggerOutcome::rejected();
        }
        // Reserve the cooldown slot before the await so no interleaved call
        // can pass the guard for the same occurrence.
        core.dedup.record_trigger(element, target, Some(action), now);
    }

    let started = std::time::Instant::now();
    let result = locator.trigger(element).await;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;

    let mut core = lock(core);
    match result {
        Err(err) => {
            warn!(%err, action = %action, "trigger action failed");
            core.total_failed += 1;
            TriggerOutcome::rejected()
        }
        Ok(()) => {
            let now = now_ms();
            core.roi.record_automated(action, elapsed_ms, now);
            let estimated_saved = core.roi.estimate_saved(action);
            let (added, deleted) = context
                .target
                .as_ref()
                .map(|t| (t.added_lines, t.deleted_lines))
                .unwrap_or((0, 0));
            let recorded = core.analytics.record_acceptance(
                context.target_name(),
                Some(action),
                estimated_saved,
                added,
                deleted,
                now,
            );
            if recorded {
                info!(
                    action = %action,
                    target = context.target_name().unwrap_or("unknown"),
                    elapsed_ms,
                    estimated_saved_ms = estimated_saved,
                    "trigger accepted"
                );
            }
            TriggerOutcome {
                accepted: recorded,
                estimated_time_saved_ms: estimated_saved,
            }
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
