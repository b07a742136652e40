use chrono::{DateTime, Utc};
use pkg_types::lease::AuthoritativeRecord;

use crate::store::CountdownStore;

/// Upsert fetched authoritative records into the store by lease id.
///
/// Records already in the store but missing from `fetched` are left as they
/// are: a lease can be absent from one sync because its chunk failed.
/// Applying the same records twice leaves the store unchanged.
/// Returns the number of records merged.
pub fn merge(store: &mut CountdownStore, fetched: &[AuthoritativeRecord], now: DateTime<Utc>) -> usize {
    for record in fetched {
        store.upsert_authoritative(record, now);
    }
    fetched.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recompute::tick;
    use crate::testing::{base_time, record_for};
    use chrono::Duration;
    use pkg_types::lease::LeaseId;

    #[test]
    fn test_merge_is_idempotent() {
        let now = base_time() + Duration::hours(6);
        let fetched: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|id| record_for(&LeaseId::new(*id), base_time(), 2))
            .collect();

        let mut once = CountdownStore::new();
        merge(&mut once, &fetched, now);
        let mut twice = once.clone();
        merge(&mut twice, &fetched, now);

        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }

    #[test]
    fn test_absent_records_untouched() {
        let now = base_time();
        let a = LeaseId::new("a");
        let b = LeaseId::new("b");
        let mut store = CountdownStore::new();
        merge(
            &mut store,
            &[record_for(&a, base_time(), 1), record_for(&b, base_time(), 1)],
            now,
        );
        let a_before = store.get(&a).cloned().unwrap();

        // next sync only returns b, with a new duration
        let moved = record_for(&b, base_time() + Duration::days(1), 3);
        assert_eq!(merge(&mut store, std::slice::from_ref(&moved), now), 1);

        assert_eq!(store.get(&a), Some(&a_before));
        let b_rec = store.get(&b).unwrap();
        assert_eq!(b_rec.duration_days, 3);
        assert_eq!(b_rec.start_time, moved.start_time);
        assert_eq!(b_rec.authoritative_end_time, moved.authoritative_end_time);
    }

    #[test]
    fn test_merge_then_tick_reflects_new_end_time() {
        let now = base_time() + Duration::hours(12);
        let id = LeaseId::new("a");
        let mut store = CountdownStore::new();
        merge(&mut store, &[record_for(&id, base_time(), 1)], now);
        assert_eq!(store.get(&id).unwrap().formatted_remaining, "12h 0m");

        merge(&mut store, &[record_for(&id, base_time(), 2)], now);
        tick(&mut store, now);
        assert_eq!(store.get(&id).unwrap().formatted_remaining, "1d 12h 0m");
    }
}
