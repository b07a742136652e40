use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use pkg_constants::countdown::TICK_TASK_NAME;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

use crate::format::{format_remaining, percent_complete};
use crate::schedule::{ScheduleHandle, Scheduler, Task};
use crate::state::EngineCore;
use crate::store::CountdownStore;

/// The derived half of a countdown record.
#[derive(Debug, Clone, PartialEq)]
pub struct Derived {
    pub remaining_ms: i64,
    pub is_expired: bool,
    pub formatted_remaining: String,
    pub percent_complete: f64,
}

/// Compute the derived fields from the authoritative ones and `now`.
pub fn derive(start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> Derived {
    let remaining_ms = (end - now).num_milliseconds();
    Derived {
        remaining_ms,
        is_expired: remaining_ms <= 0,
        formatted_remaining: format_remaining(remaining_ms),
        percent_complete: percent_complete(now, start, end),
    }
}

/// Recompute every record's derived fields at `now`. No I/O.
pub fn tick(store: &mut CountdownStore, now: DateTime<Utc>) {
    for record in store.records_mut() {
        let derived = derive(record.start_time, record.authoritative_end_time, now);
        record.remaining_ms = derived.remaining_ms;
        record.is_expired = derived.is_expired;
        record.formatted_remaining = derived.formatted_remaining;
        record.percent_complete = derived.percent_complete;
    }
}

/// High-frequency local task that keeps derived fields current between syncs.
pub struct LocalRecomputer {
    core: Arc<EngineCore>,
    scheduler: Arc<dyn Scheduler>,
    interval: Duration,
    handle: Mutex<Option<ScheduleHandle>>,
}

impl LocalRecomputer {
    pub(crate) fn new(core: Arc<EngineCore>, scheduler: Arc<dyn Scheduler>, interval: Duration) -> Self {
        Self {
            core,
            scheduler,
            interval,
            handle: Mutex::new(None),
        }
    }

    /// Start ticking. Replaces any running schedule.
    pub async fn start(&self) {
        let core = self.core.clone();
        let task: Task = Arc::new(move || {
            let core = core.clone();
            async move { run_tick(&core).await }.boxed()
        });
        let handle = self.scheduler.schedule(TICK_TASK_NAME, self.interval, task);
        let previous = self.handle.lock().await.replace(handle);
        if let Some(previous) = previous {
            previous.cancel();
        }
        info!("LocalRecomputer started (interval={}ms)", self.interval.as_millis());
    }

    pub async fn stop(&self) {
        if let Some(handle) = self.handle.lock().await.take() {
            handle.cancel();
            info!("LocalRecomputer stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    /// Run one recompute pass now.
    pub async fn tick_now(&self) {
        run_tick(&self.core).await;
    }
}

async fn run_tick(core: &EngineCore) {
    let now = core.clock.now();
    {
        let mut state = core.state.write().await;
        if state.store.is_empty() {
            return;
        }
        tick(&mut state.store, now);
    }
    core.publish();
}
