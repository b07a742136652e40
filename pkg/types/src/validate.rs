use anyhow::{Result, bail};

use crate::lease::AuthoritativeRecord;

/// Validate a lease identifier.
/// Rules: non-empty, no surrounding whitespace.
pub fn validate_lease_id(id: &str) -> Result<()> {
    if id.is_empty() {
        bail!("lease id must not be empty");
    }
    if id.trim() != id {
        bail!("lease id '{}' must not have leading or trailing whitespace", id);
    }
    Ok(())
}

/// Validate an authoritative record received from the server.
///
/// An end time at or before the start time is accepted: such a lease is
/// degenerate but well-defined (see `percent_complete`).
pub fn validate_record(record: &AuthoritativeRecord) -> Result<()> {
    validate_lease_id(record.lease_id.as_str())?;
    if record.duration_days == 0 {
        bail!(
            "lease '{}' has durationDays 0 (must be at least 1)",
            record.lease_id
        );
    }
    Ok(())
}
