//! Countdown synchronization engine.
//!
//! Tracks how much time remains on a dynamic set of leases. Authoritative
//! timing (start, duration, end) is pulled from the server in bounded batches
//! on a slow schedule; the derived fields (remaining time, expiry, percent
//! complete, display string) are recomputed locally every tick without any
//! network access.
//!
//! ```text
//! set_tracked(ids) ──► SyncScheduler ──► BatchFetcher ──► LeaseSource (HTTP)
//!                          │
//!                          ▼ merge
//!                    CountdownStore ◄── LocalRecomputer (every tick)
//!                          │
//!                          ▼
//!          get_countdown / get_all / get_expired / get_active
//! ```

pub mod clock;
pub mod engine;
pub mod fetcher;
pub mod format;
pub mod merge;
pub mod recompute;
pub mod schedule;
pub mod source;
pub mod state;
pub mod store;
pub mod sync;

#[cfg(test)]
mod testing;

pub use engine::CountdownEngine;
pub use state::EngineState;
pub use sync::SyncReport;
