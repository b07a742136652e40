use chrono::{DateTime, Utc};
use pkg_types::config::EngineConfig;
use pkg_types::countdown::{CountdownRecord, CountdownSummary};
use pkg_types::lease::LeaseId;
use pkg_types::validate::validate_lease_id;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::fetcher::{BatchFetcher, LeaseSource};
use crate::recompute::LocalRecomputer;
use crate::schedule::{Scheduler, TokioScheduler};
use crate::state::{EngineCore, EngineState};
use crate::sync::{SyncReport, SyncScheduler};

/// Countdowns for a dynamic set of leases.
///
/// Owns the record store and both periodic tasks. Feed it the tracked lease
/// ids with [`set_tracked`](Self::set_tracked); read snapshots through the
/// accessors. Dropping the engine cancels its schedules; [`dispose`](Self::dispose)
/// does the same explicitly and makes the shutdown final.
pub struct CountdownEngine {
    core: Arc<EngineCore>,
    sync: SyncScheduler,
    recomputer: LocalRecomputer,
    /// Serializes lifecycle transitions
    transitions: Mutex<()>,
}

impl CountdownEngine {
    /// Engine on the wall clock and tokio timers.
    pub fn new(config: EngineConfig, source: Arc<dyn LeaseSource>) -> anyhow::Result<Self> {
        Self::with_parts(
            config,
            source,
            Arc::new(SystemClock),
            Arc::new(TokioScheduler),
        )
    }

    pub fn with_parts(
        config: EngineConfig,
        source: Arc<dyn LeaseSource>,
        clock: Arc<dyn Clock>,
        scheduler: Arc<dyn Scheduler>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let core = Arc::new(EngineCore::new(clock));
        let fetcher = Arc::new(BatchFetcher::new(source, config.batch_size));
        let sync = SyncScheduler::new(
            core.clone(),
            fetcher,
            scheduler.clone(),
            config.sync_interval(),
        );
        let recomputer = LocalRecomputer::new(core.clone(), scheduler, config.tick_interval());
        Ok(Self {
            core,
            sync,
            recomputer,
            transitions: Mutex::new(()),
        })
    }

    /// Replace the tracked lease set. Order and duplicates are ignored.
    ///
    /// An unchanged set is a no-op. A changed non-empty set restarts both
    /// schedules (with an immediate sync) and drops records for leases that
    /// left the set. An empty set stops everything and clears the store.
    pub async fn set_tracked<I, T>(&self, ids: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<LeaseId>,
    {
        let next: BTreeSet<LeaseId> = ids
            .into_iter()
            .map(Into::into)
            .filter(|id: &LeaseId| match validate_lease_id(id.as_str()) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Ignoring tracked id: {}", e);
                    false
                }
            })
            .collect();

        let _transition = self.transitions.lock().await;
        {
            let state = self.core.state.read().await;
            match state.phase {
                EngineState::Disposed => {
                    warn!("set_tracked called on a disposed engine, ignoring");
                    return;
                }
                _ if state.tracked == next => {
                    debug!("Tracked set unchanged ({} leases)", next.len());
                    return;
                }
                _ => {}
            }
        }

        self.sync.stop().await;
        self.recomputer.stop().await;

        let (from, to, count) = {
            let mut state = self.core.state.write().await;
            let from = state.phase;
            let count = next.len();
            state.epoch += 1;
            if next.is_empty() {
                state.store.clear();
                state.phase = EngineState::Idle;
            } else {
                let removed = state.store.retain_tracked(&next);
                if removed > 0 {
                    debug!("Dropped {} records for untracked leases", removed);
                }
                state.phase = EngineState::Active;
            }
            state.tracked = next;
            (from, state.phase, count)
        };
        info!("Countdown engine {} → {} ({} leases)", from, to, count);

        if to == EngineState::Active {
            self.sync.start().await;
            self.recomputer.start().await;
        }
        self.core.publish();
    }

    /// Stop both schedules for good. Later `set_tracked` calls are ignored.
    pub async fn dispose(&self) {
        let _transition = self.transitions.lock().await;
        self.sync.stop().await;
        self.recomputer.stop().await;
        {
            let mut state = self.core.state.write().await;
            if state.phase == EngineState::Disposed {
                return;
            }
            state.epoch += 1;
            state.phase = EngineState::Disposed;
            state.tracked.clear();
            state.store.clear();
        }
        info!("Countdown engine disposed");
        self.core.publish();
    }

    /// Manual sync. Never fails; problems land in the report and `last_sync_error`.
    pub async fn refresh_now(&self) -> SyncReport {
        self.sync.trigger_now().await
    }

    /// Run one recompute pass immediately instead of waiting for the next tick.
    pub async fn tick_now(&self) {
        self.recomputer.tick_now().await;
    }

    pub async fn get_countdown(&self, id: &LeaseId) -> Option<CountdownRecord> {
        self.core.state.read().await.store.get(id).cloned()
    }

    pub async fn get_all(&self) -> Vec<CountdownRecord> {
        self.filtered(|_| true).await
    }

    pub async fn get_expired(&self) -> Vec<CountdownRecord> {
        self.filtered(|r| r.is_expired).await
    }

    pub async fn get_active(&self) -> Vec<CountdownRecord> {
        self.filtered(|r| !r.is_expired).await
    }

    pub async fn summary(&self) -> CountdownSummary {
        self.core.state.read().await.store.summary()
    }

    pub async fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.sync.last_sync_time().await
    }

    pub async fn last_sync_error(&self) -> Option<String> {
        self.sync.last_sync_error().await
    }

    pub async fn state(&self) -> EngineState {
        self.core.state.read().await.phase
    }

    pub async fn tracked_ids(&self) -> Vec<LeaseId> {
        self.core.state.read().await.tracked.iter().cloned().collect()
    }

    /// Revision counter, bumped after every tick, merge, and lifecycle change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.core.subscribe()
    }

    async fn filtered(&self, keep: impl Fn(&CountdownRecord) -> bool) -> Vec<CountdownRecord> {
        self.core
            .state
            .read()
            .await
            .store
            .records()
            .filter(|r| keep(*r))
            .cloned()
            .collect()
    }
}
