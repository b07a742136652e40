//! In-memory lease source shared by the unit tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use pkg_types::lease::{AuthoritativeRecord, LeaseId};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::fetcher::LeaseSource;

pub(crate) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
}

pub(crate) fn record_for(id: &LeaseId, start: DateTime<Utc>, days: u32) -> AuthoritativeRecord {
    AuthoritativeRecord {
        lease_id: id.clone(),
        start_time: start,
        duration_days: days,
        authoritative_end_time: start + Duration::days(days as i64),
    }
}

#[derive(Default)]
struct FakeState {
    records: BTreeMap<LeaseId, AuthoritativeRecord>,
    calls: Vec<Vec<LeaseId>>,
    poison: HashSet<LeaseId>,
    extra: Vec<AuthoritativeRecord>,
    gate: Option<Arc<Notify>>,
}

/// Answers like the bulk endpoint: returns the known records among the requested ids.
#[derive(Default)]
pub(crate) struct FakeLeaseSource {
    state: Mutex<FakeState>,
}

impl FakeLeaseSource {
    /// Serve a 1-day lease starting at `base_time()` for each id.
    pub(crate) fn serving(ids: &[LeaseId]) -> Self {
        let source = Self::default();
        for id in ids {
            source.set_record(record_for(id, base_time(), 1));
        }
        source
    }

    pub(crate) fn set_record(&self, record: AuthoritativeRecord) {
        self.state
            .lock()
            .unwrap()
            .records
            .insert(record.lease_id.clone(), record);
    }

    pub(crate) fn set_duration_days(&self, id: &LeaseId, days: u32) {
        if let Some(r) = self.state.lock().unwrap().records.get_mut(id) {
            r.duration_days = days;
        }
    }

    /// Any chunk containing `id` fails as a transport error.
    pub(crate) fn fail_chunks_containing(&self, id: &LeaseId) {
        self.state.lock().unwrap().poison.insert(id.clone());
    }

    pub(crate) fn clear_failures(&self) {
        self.state.lock().unwrap().poison.clear();
    }

    /// Append a record to every successful response, requested or not.
    pub(crate) fn inject_extra(&self, record: AuthoritativeRecord) {
        self.state.lock().unwrap().extra.push(record);
    }

    /// Make subsequent requests wait until the returned gate is notified.
    pub(crate) fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().unwrap().gate = Some(gate.clone());
        gate
    }

    pub(crate) fn release_hold(&self) {
        self.state.lock().unwrap().gate = None;
    }

    pub(crate) fn calls(&self) -> Vec<Vec<LeaseId>> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl LeaseSource for FakeLeaseSource {
    async fn fetch_chunk(&self, ids: &[LeaseId]) -> anyhow::Result<Vec<AuthoritativeRecord>> {
        let gate = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(ids.to_vec());
            state.gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let state = self.state.lock().unwrap();
        if ids.iter().any(|id| state.poison.contains(id)) {
            anyhow::bail!("503 Service Unavailable");
        }
        let mut out: Vec<AuthoritativeRecord> = ids
            .iter()
            .filter_map(|id| state.records.get(id).cloned())
            .collect();
        out.extend(state.extra.iter().cloned());
        Ok(out)
    }
}
