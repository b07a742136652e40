//! Periodic task scheduling.
//!
//! The engine never touches timers directly. It hands a [`Task`] to a
//! [`Scheduler`] and keeps the returned [`ScheduleHandle`]; cancelling or
//! dropping the handle stops the schedule. [`TokioScheduler`] drives real
//! intervals, [`ManualScheduler`] lets tests fire runs by hand.

use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// A repeatable unit of work. Each call produces one run.
pub type Task = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Runs a task every `every`, starting immediately, until the handle is cancelled.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, name: &str, every: Duration, task: Task) -> ScheduleHandle;
}

/// Cancel token for one schedule. Dropping it cancels the schedule.
pub struct ScheduleHandle {
    name: String,
    cancelled: Arc<AtomicBool>,
    wake: Option<Arc<Notify>>,
}

impl ScheduleHandle {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Stop future runs. A run already in progress is allowed to finish.
    pub fn cancel(self) {
        drop(self);
    }

    fn cancel_inner(&mut self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(wake) = &self.wake {
            wake.notify_one();
        }
        debug!("Schedule {} cancelled", self.name);
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        self.cancel_inner();
    }
}

impl std::fmt::Debug for ScheduleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleHandle")
            .field("name", &self.name)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Scheduler backed by `tokio::time::interval`. Must be used inside a tokio runtime.
///
/// Missed ticks (e.g. after the process was suspended) are skipped rather
/// than replayed in a burst.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, name: &str, every: Duration, task: Task) -> ScheduleHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let wake = Arc::new(Notify::new());

        let flag = cancelled.clone();
        let notified = wake.clone();
        let label = name.to_string();
        // Detached; the loop observes the flag and exits after any in-flight run.
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = notified.notified() => break,
                }
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                task().await;
            }
            debug!("Schedule {} stopped", label);
        });

        ScheduleHandle {
            name: name.to_string(),
            cancelled,
            wake: Some(wake),
        }
    }
}

struct ManualEntry {
    name: String,
    every: Duration,
    task: Task,
    cancelled: Arc<AtomicBool>,
}

/// Timer-free scheduler for tests. Nothing runs until [`ManualScheduler::fire`] is called.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    entries: Arc<Mutex<Vec<ManualEntry>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every live schedule named `name` once, in scheduling order.
    /// Returns how many runs were executed.
    pub async fn fire(&self, name: &str) -> usize {
        let tasks: Vec<Task> = self
            .lock()
            .iter()
            .filter(|e| e.name == name && !e.cancelled.load(Ordering::SeqCst))
            .map(|e| e.task.clone())
            .collect();
        for task in &tasks {
            task().await;
        }
        tasks.len()
    }

    /// Number of live (not cancelled) schedules named `name`.
    pub fn active(&self, name: &str) -> usize {
        self.lock()
            .iter()
            .filter(|e| e.name == name && !e.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Number of schedules ever created under `name`, cancelled or not.
    pub fn scheduled_total(&self, name: &str) -> usize {
        self.lock().iter().filter(|e| e.name == name).count()
    }

    /// Interval of the live schedule named `name`, if any.
    pub fn interval_of(&self, name: &str) -> Option<Duration> {
        self.lock()
            .iter()
            .find(|e| e.name == name && !e.cancelled.load(Ordering::SeqCst))
            .map(|e| e.every)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ManualEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, name: &str, every: Duration, task: Task) -> ScheduleHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        self.lock().push(ManualEntry {
            name: name.to_string(),
            every,
            task,
            cancelled: cancelled.clone(),
        });
        ScheduleHandle {
            name: name.to_string(),
            cancelled,
            wake: None,
        }
    }
}
