//! Execution history: append-only run outcomes and derived statistics.
//!
//! Records are stamped (id + fired_at) here and persisted through the
//! trigger store. Statistics are computed from the stored history on every
//! call, never cached.

use std::sync::Arc;

use chrono::Duration;
use uuid::Uuid;

use duewatch_core::{Clock, ExecutionRecord, ExecutionStats, NewExecution, Outcome, Result};
use duewatch_store::TriggerStore;

/// Records trigger firings and answers history/statistics queries.
pub struct ExecutionRecorder {
    store: Arc<dyn TriggerStore>,
    clock: Arc<dyn Clock>,
}

impl ExecutionRecorder {
    pub fn new(store: Arc<dyn TriggerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Assign an id and firing timestamp to a pending record.
    pub fn stamp(&self, new: NewExecution) -> ExecutionRecord {
        ExecutionRecord {
            id: Uuid::new_v4(),
            trigger_id: new.trigger_id,
            trigger_name: new.trigger_name,
            fired_at: self.clock.now(),
            outcome: new.outcome,
            notifications_sent: new.notifications_sent,
            companies_processed: new.companies_processed,
            error_message: new.error_message,
            details: new.details,
        }
    }

    /// Persist an already-stamped record.
    pub async fn persist(&self, record: &ExecutionRecord) -> Result<()> {
        self.store.record_execution(record).await
    }

    /// Stamp and persist in one step.
    pub async fn append(&self, new: NewExecution) -> Result<ExecutionRecord> {
        let record = self.stamp(new);
        self.persist(&record).await?;
        Ok(record)
    }

    /// History for one trigger, newest first.
    pub async fn history(
        &self,
        trigger_id: i64,
        limit: Option<usize>,
    ) -> Result<Vec<ExecutionRecord>> {
        self.store.executions_for(trigger_id, limit).await
    }

    /// History across all triggers, newest first.
    pub async fn all_history(&self, limit: Option<usize>) -> Result<Vec<ExecutionRecord>> {
        self.store.all_executions(limit).await
    }

    /// Aggregate statistics for one trigger's full history.
    pub async fn stats(&self, trigger_id: i64) -> Result<ExecutionStats> {
        let records = self.store.executions_for(trigger_id, None).await?;

        let total = records.len() as u64;
        let successes = records
            .iter()
            .filter(|r| r.outcome == Outcome::Success)
            .count() as u64;
        let failures = total - successes;
        let total_notifications: u64 =
            records.iter().map(|r| r.notifications_sent as u64).sum();
        let total_companies: u64 =
            records.iter().map(|r| r.companies_processed as u64).sum();
        // Newest-first ordering makes the first record the last run.
        let last_run = records.first().map(|r| r.fired_at);

        let success_rate =
            (successes as f64 / total.max(1) as f64 * 100.0 * 100.0).round() / 100.0;

        Ok(ExecutionStats {
            total,
            successes,
            failures,
            total_notifications,
            total_companies,
            last_run,
            success_rate,
        })
    }

    /// Delete records older than `days`; returns how many were removed.
    pub async fn purge_older_than(&self, days: i64) -> Result<u64> {
        let cutoff = self.clock.now() - Duration::days(days);
        self.store.delete_executions_before(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use duewatch_core::ManualClock;
    use duewatch_store::MemoryStore;

    fn new_execution(outcome: Outcome, sent: u32, companies: u32) -> NewExecution {
        NewExecution {
            trigger_id: 1,
            trigger_name: "daily digest".to_string(),
            outcome,
            notifications_sent: sent,
            companies_processed: companies,
            error_message: None,
            details: None,
        }
    }

    fn recorder_at(
        now: chrono::DateTime<Utc>,
    ) -> (ExecutionRecorder, Arc<MemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(now));
        let recorder = ExecutionRecorder::new(store.clone(), clock.clone());
        (recorder, store, clock)
    }

    #[tokio::test]
    async fn append_stamps_id_and_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 8, 0, 0).unwrap();
        let (recorder, _, _) = recorder_at(now);

        let record = recorder
            .append(new_execution(Outcome::Success, 3, 2))
            .await
            .unwrap();

        assert!(!record.id.is_nil());
        assert_eq!(record.fired_at, now);
        assert_eq!(record.notifications_sent, 3);
    }

    #[tokio::test]
    async fn stats_two_successes_one_failure() {
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 8, 0, 0).unwrap();
        let (recorder, _, clock) = recorder_at(now);

        for outcome in [Outcome::Success, Outcome::Success, Outcome::Failure] {
            recorder
                .append(new_execution(outcome, 2, 1))
                .await
                .unwrap();
            clock.advance(Duration::hours(1));
        }

        let stats = recorder.stats(1).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.successes, 2);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.success_rate, 66.67);
        assert_eq!(stats.total_notifications, 6);
        assert_eq!(stats.total_companies, 3);
        assert_eq!(
            stats.last_run,
            Some(now + Duration::hours(2)),
            "last_run is the newest firing"
        );
    }

    #[tokio::test]
    async fn stats_empty_history_is_zero_rate_not_an_error() {
        let (recorder, _, _) = recorder_at(Utc::now());

        let stats = recorder.stats(99).await.unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.last_run, None);
    }

    #[tokio::test]
    async fn purge_removes_old_records_and_returns_count() {
        let now = Utc.with_ymd_and_hms(2026, 8, 6, 8, 0, 0).unwrap();
        let (recorder, _, clock) = recorder_at(now - Duration::days(120));

        recorder
            .append(new_execution(Outcome::Success, 1, 1))
            .await
            .unwrap();
        clock.set(now);
        recorder
            .append(new_execution(Outcome::Success, 1, 1))
            .await
            .unwrap();

        let removed = recorder.purge_older_than(90).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(recorder.history(1, None).await.unwrap().len(), 1);
    }
}
