use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use pkg_constants::countdown::SYNC_TASK_NAME;
use pkg_types::lease::LeaseId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::fetcher::{BatchFetcher, FetchOutcome};
use crate::merge::merge;
use crate::recompute::tick;
use crate::schedule::{ScheduleHandle, Scheduler, Task};
use crate::state::{EngineCore, EngineState};

/// What one sync cycle did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Distinct lease ids sent to the server
    pub requested: usize,
    pub chunks: usize,
    pub failed_chunks: usize,
    /// Records merged into the store
    pub merged: usize,
    /// The result arrived after a reset or stop and was dropped
    pub discarded: bool,
    pub error: Option<String>,
}

/// Periodic fetch-and-merge against the authoritative source.
pub struct SyncScheduler {
    core: Arc<EngineCore>,
    fetcher: Arc<BatchFetcher>,
    scheduler: Arc<dyn Scheduler>,
    interval: Duration,
    handle: Mutex<Option<ScheduleHandle>>,
}

impl SyncScheduler {
    pub(crate) fn new(
        core: Arc<EngineCore>,
        fetcher: Arc<BatchFetcher>,
        scheduler: Arc<dyn Scheduler>,
        interval: Duration,
    ) -> Self {
        Self {
            core,
            fetcher,
            scheduler,
            interval,
            handle: Mutex::new(None),
        }
    }

    /// Sync now, then every interval. Replaces any running schedule.
    pub async fn start(&self) {
        let core = self.core.clone();
        let fetcher = self.fetcher.clone();
        let task: Task = Arc::new(move || {
            let core = core.clone();
            let fetcher = fetcher.clone();
            async move {
                run_sync_cycle(&core, &fetcher).await;
            }
            .boxed()
        });
        let handle = self.scheduler.schedule(SYNC_TASK_NAME, self.interval, task);
        let previous = self.handle.lock().await.replace(handle);
        if let Some(previous) = previous {
            previous.cancel();
        }
        info!(
            "SyncScheduler started (interval={}ms, batch={})",
            self.interval.as_millis(),
            self.fetcher.batch_size()
        );
    }

    pub async fn stop(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            handle.cancel();
            info!("SyncScheduler stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    /// One out-of-band sync. The periodic schedule keeps its phase.
    pub async fn trigger_now(&self) -> SyncReport {
        run_sync_cycle(&self.core, &self.fetcher).await
    }

    pub async fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.core.state.read().await.last_sync_time
    }

    pub async fn last_sync_error(&self) -> Option<String> {
        self.core.state.read().await.last_sync_error.clone()
    }
}

/// Fetch all tracked leases and merge the result.
///
/// The state lock is not held during the fetch. If the tracked set was reset
/// or the engine stopped while the fetch was in flight, the result is dropped.
pub(crate) async fn run_sync_cycle(core: &EngineCore, fetcher: &BatchFetcher) -> SyncReport {
    let (epoch, ids) = {
        let state = core.state.read().await;
        if state.phase != EngineState::Active {
            debug!("Sync skipped: engine is {}", state.phase);
            return SyncReport {
                discarded: true,
                ..Default::default()
            };
        }
        (state.epoch, state.tracked.iter().cloned().collect::<Vec<LeaseId>>())
    };

    let outcome = fetcher.fetch(&ids).await;
    let now = core.clock.now();
    let mut report = SyncReport {
        requested: ids.len(),
        chunks: outcome.chunks_requested,
        failed_chunks: outcome.failures.len(),
        error: describe_failures(&outcome),
        ..Default::default()
    };

    {
        let mut guard = core.state.write().await;
        let state = &mut *guard;
        if state.epoch != epoch || state.phase != EngineState::Active {
            debug!(
                "Discarding sync result for {} leases: tracked set changed during fetch",
                ids.len()
            );
            report.discarded = true;
            return report;
        }

        let (fetched, untracked): (Vec<_>, Vec<_>) = outcome
            .records
            .into_iter()
            .partition(|r| state.tracked.contains(&r.lease_id));
        if !untracked.is_empty() {
            warn!("Ignoring {} records for untracked leases", untracked.len());
        }

        report.merged = merge(&mut state.store, &fetched, now);
        if report.merged > 0 {
            tick(&mut state.store, now);
        }
        if report.chunks > report.failed_chunks {
            state.last_sync_time = Some(now);
        }
        state.last_sync_error = report.error.clone();
    }
    core.publish();

    if report.failed_chunks == 0 {
        info!(
            "Sync complete: {} records merged ({} leases, {} chunks)",
            report.merged, report.requested, report.chunks
        );
    } else {
        warn!(
            "Sync partially failed: {} records merged, {}/{} chunks failed",
            report.merged, report.failed_chunks, report.chunks
        );
    }
    report
}

fn describe_failures(outcome: &FetchOutcome) -> Option<String> {
    let last = outcome.failures.last()?;
    if outcome.failures.len() == 1 {
        Some(format!(
            "chunk {}/{} ({} leases) failed: {}",
            last.index + 1,
            outcome.chunks_requested,
            last.lease_ids.len(),
            last.reason
        ))
    } else {
        Some(format!(
            "{}/{} chunks failed; last: {}",
            outcome.failures.len(),
            outcome.chunks_requested,
            last.reason
        ))
    }
}
