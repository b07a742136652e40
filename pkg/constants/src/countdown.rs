//! Engine scheduling defaults.

/// How often the engine pulls authoritative records from the server (10 minutes).
pub const DEFAULT_SYNC_INTERVAL_MS: u64 = 600_000;

/// How often derived countdown fields are recomputed locally.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;

/// Maximum lease ids per bulk request; the authoritative source rejects larger batches.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Milliseconds per unit, used by the remaining-time formatter.
pub const MS_PER_DAY: i64 = 86_400_000;
pub const MS_PER_HOUR: i64 = 3_600_000;
pub const MS_PER_MINUTE: i64 = 60_000;
pub const MS_PER_SECOND: i64 = 1_000;

/// Scheduler task names, also used as log labels.
pub const SYNC_TASK_NAME: &str = "countdown-sync";
pub const TICK_TASK_NAME: &str = "countdown-tick";
