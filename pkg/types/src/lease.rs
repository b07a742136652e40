use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque lease identifier (a storage order id on the server side).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseId(String);

impl LeaseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for LeaseId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for LeaseId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Server-provided source of truth for a lease's timing.
/// Returned per lease by the bulk countdown endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthoritativeRecord {
    pub lease_id: LeaseId,
    /// When the lease's timed period began
    pub start_time: DateTime<Utc>,
    /// Estimated lease duration in days
    pub duration_days: u32,
    /// Server-computed end; may differ from `start_time + duration_days`
    pub authoritative_end_time: DateTime<Utc>,
}

/// Body of a bulk countdown request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkCountdownRequest {
    pub lease_ids: Vec<LeaseId>,
}
