use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lease::{AuthoritativeRecord, LeaseId};

/// Live countdown for one tracked lease.
///
/// The first four fields are authoritative and only change through a sync merge.
/// The remaining fields are derived from `(start_time, authoritative_end_time, now)`
/// and are rewritten on every recompute pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountdownRecord {
    pub lease_id: LeaseId,
    pub start_time: DateTime<Utc>,
    pub duration_days: u32,
    pub authoritative_end_time: DateTime<Utc>,

    /// `authoritative_end_time - now`, in milliseconds (negative once overdue)
    pub remaining_ms: i64,
    pub is_expired: bool,
    pub formatted_remaining: String,
    /// 0..=100
    pub percent_complete: f64,
}

impl CountdownRecord {
    /// The authoritative half of this record.
    pub fn authoritative(&self) -> AuthoritativeRecord {
        AuthoritativeRecord {
            lease_id: self.lease_id.clone(),
            start_time: self.start_time,
            duration_days: self.duration_days,
            authoritative_end_time: self.authoritative_end_time,
        }
    }
}

/// Counts over the current store contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownSummary {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
}
