//! Per-trigger job-table entry types.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Scheduling state for a single trigger job.
#[derive(Debug, Clone)]
pub struct JobEntry {
    /// Trigger identifier (job-table key).
    pub trigger_id: i64,
    /// Trigger name at load time, for status output.
    pub name: String,
    /// Next instant this job is due.
    pub next_fire: DateTime<Utc>,
    /// Set while a firing is running. Due scans skip in-flight jobs, so an
    /// overdue fire is skipped, never queued.
    pub in_flight: bool,
}

/// Point-in-time snapshot of one scheduled job.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub id: i64,
    pub name: String,
    pub next_fire: DateTime<Utc>,
}
