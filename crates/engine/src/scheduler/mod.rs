//! Trigger scheduling with a live job table.
//!
//! One job per active trigger, keyed by trigger id. The table is guarded by
//! a single async mutex: `start`/`reload` swap it atomically, the tick loop
//! collects due jobs under the same lock, and a job already in flight is
//! skipped rather than queued. Firing logic records an outcome and
//! reschedules in every branch, so a failing trigger never stalls.

mod core;
mod entry;


pub use self::core::TriggerScheduler;
pub use self::entry::{JobEntry, JobStatus};
