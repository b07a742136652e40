use chrono::{DateTime, Utc};
use pkg_types::countdown::{CountdownRecord, CountdownSummary};
use pkg_types::lease::{AuthoritativeRecord, LeaseId};
use std::collections::{BTreeMap, BTreeSet};

use crate::recompute::derive;

/// Countdown records keyed by lease id.
///
/// Owned by the engine. Authoritative fields are written only by the sync
/// merger, derived fields only by the recompute pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountdownStore {
    records: BTreeMap<LeaseId, CountdownRecord>,
}

impl CountdownStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &LeaseId) -> Option<&CountdownRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &LeaseId) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in lease id order.
    pub fn records(&self) -> impl Iterator<Item = &CountdownRecord> {
        self.records.values()
    }

    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = &mut CountdownRecord> {
        self.records.values_mut()
    }

    /// Insert a new record or replace the authoritative fields of an existing one.
    /// A new record starts with derived fields computed at `now`; an existing record
    /// keeps its derived fields until the next recompute pass.
    pub fn upsert_authoritative(&mut self, record: &AuthoritativeRecord, now: DateTime<Utc>) {
        match self.records.get_mut(&record.lease_id) {
            Some(existing) => {
                existing.start_time = record.start_time;
                existing.duration_days = record.duration_days;
                existing.authoritative_end_time = record.authoritative_end_time;
            }
            None => {
                let derived = derive(record.start_time, record.authoritative_end_time, now);
                self.records.insert(
                    record.lease_id.clone(),
                    CountdownRecord {
                        lease_id: record.lease_id.clone(),
                        start_time: record.start_time,
                        duration_days: record.duration_days,
                        authoritative_end_time: record.authoritative_end_time,
                        remaining_ms: derived.remaining_ms,
                        is_expired: derived.is_expired,
                        formatted_remaining: derived.formatted_remaining,
                        percent_complete: derived.percent_complete,
                    },
                );
            }
        }
    }

    /// Drop records whose lease is no longer tracked. Returns how many were removed.
    pub fn retain_tracked(&mut self, tracked: &BTreeSet<LeaseId>) -> usize {
        let before = self.records.len();
        self.records.retain(|id, _| tracked.contains(id));
        before - self.records.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn summary(&self) -> CountdownSummary {
        let expired = self.records.values().filter(|r| r.is_expired).count();
        CountdownSummary {
            total: self.records.len(),
            active: self.records.len() - expired,
            expired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn auth(id: &str, start: DateTime<Utc>, hours: i64) -> AuthoritativeRecord {
        AuthoritativeRecord {
            lease_id: LeaseId::new(id),
            start_time: start,
            duration_days: 1,
            authoritative_end_time: start + Duration::hours(hours),
        }
    }

    #[test]
    fn test_insert_derives_fields() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let mut store = CountdownStore::new();
        store.upsert_authoritative(&auth("a", now - Duration::hours(1), 2), now);

        let rec = store.get(&LeaseId::new("a")).expect("should find record");
        assert_eq!(rec.remaining_ms, Duration::hours(1).num_milliseconds());
        assert!(!rec.is_expired);
        assert_eq!(rec.formatted_remaining, "1h 0m");
    }

    #[test]
    fn test_update_replaces_authoritative_only() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let mut store = CountdownStore::new();
        store.upsert_authoritative(&auth("a", now, 2), now);
        let derived_before = store.get(&LeaseId::new("a")).unwrap().remaining_ms;

        let mut updated = auth("a", now, 5);
        updated.duration_days = 2;
        store.upsert_authoritative(&updated, now + Duration::minutes(10));

        let rec = store.get(&LeaseId::new("a")).unwrap();
        assert_eq!(rec.duration_days, 2);
        assert_eq!(rec.authoritative_end_time, now + Duration::hours(5));
        assert_eq!(rec.remaining_ms, derived_before);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_retain_tracked() {
        let now = Utc::now();
        let mut store = CountdownStore::new();
        for id in ["a", "b", "c"] {
            store.upsert_authoritative(&auth(id, now, 1), now);
        }
        let tracked: BTreeSet<LeaseId> = ["b", "c", "d"].into_iter().map(LeaseId::from).collect();
        assert_eq!(store.retain_tracked(&tracked), 1);
        assert!(!store.contains(&LeaseId::new("a")));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_summary() {
        let now = Utc::now();
        let mut store = CountdownStore::new();
        store.upsert_authoritative(&auth("live", now, 3), now);
        store.upsert_authoritative(&auth("gone", now - Duration::hours(5), 1), now);
        assert_eq!(
            store.summary(),
            CountdownSummary {
                total: 2,
                active: 1,
                expired: 1
            }
        );
    }
}
