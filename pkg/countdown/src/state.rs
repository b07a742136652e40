use chrono::{DateTime, Utc};
use pkg_types::lease::LeaseId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{RwLock, watch};

use crate::clock::Clock;
use crate::store::CountdownStore;

/// Engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// No tracked leases, nothing scheduled
    Idle,
    /// Leases tracked, sync and tick schedules running
    Active,
    /// Shut down for good
    Disposed,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Active => write!(f, "Active"),
            Self::Disposed => write!(f, "Disposed"),
        }
    }
}

pub(crate) struct CoreState {
    pub(crate) phase: EngineState,
    /// Bumped on every reset/stop; sync results fetched under an older epoch are discarded.
    pub(crate) epoch: u64,
    pub(crate) tracked: BTreeSet<LeaseId>,
    pub(crate) store: CountdownStore,
    pub(crate) last_sync_time: Option<DateTime<Utc>>,
    pub(crate) last_sync_error: Option<String>,
}

/// State shared between the facade and the scheduled tasks.
pub(crate) struct EngineCore {
    pub(crate) state: RwLock<CoreState>,
    pub(crate) clock: Arc<dyn Clock>,
    revision: watch::Sender<u64>,
}

impl EngineCore {
    pub(crate) fn new(clock: Arc<dyn Clock>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: RwLock::new(CoreState {
                phase: EngineState::Idle,
                epoch: 0,
                tracked: BTreeSet::new(),
                store: CountdownStore::new(),
                last_sync_time: None,
                last_sync_error: None,
            }),
            clock,
            revision,
        }
    }

    /// Tell subscribers the store changed.
    pub(crate) fn publish(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}
