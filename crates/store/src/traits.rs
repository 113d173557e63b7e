//! Storage trait definitions.

use chrono::{DateTime, Utc};

use duewatch_core::{Company, ExecutionRecord, Result, Trigger};

/// CRUD persistence for trigger definitions and their execution history.
#[async_trait::async_trait]
pub trait TriggerStore: Send + Sync {
    /// Persist a new trigger. The input `id` is ignored; the returned
    /// trigger carries the assigned id and creation timestamps.
    async fn create(&self, trigger: Trigger) -> Result<Trigger>;

    async fn get_by_id(&self, id: i64) -> Result<Option<Trigger>>;

    async fn get_all(&self) -> Result<Vec<Trigger>>;

    /// Only triggers with `active = true`.
    async fn get_active(&self) -> Result<Vec<Trigger>>;

    /// Overwrite an existing trigger's definition fields.
    async fn update(&self, trigger: &Trigger) -> Result<()>;

    /// Returns `false` when the id did not exist.
    async fn delete(&self, id: i64) -> Result<bool>;

    /// Stamp `last_run` and the recomputed `next_run` after a firing.
    async fn mark_fired(
        &self,
        id: i64,
        last_run: DateTime<Utc>,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Append one execution record. Records are never mutated afterwards.
    async fn record_execution(&self, record: &ExecutionRecord) -> Result<()>;

    /// History for one trigger, newest first.
    async fn executions_for(
        &self,
        trigger_id: i64,
        limit: Option<usize>,
    ) -> Result<Vec<ExecutionRecord>>;

    /// History across all triggers, newest first.
    async fn all_executions(&self, limit: Option<usize>) -> Result<Vec<ExecutionRecord>>;

    /// Delete records fired before `cutoff`; returns how many were removed.
    async fn delete_executions_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Read-only view of the companies the CRUD layer owns.
#[async_trait::async_trait]
pub trait CompanyDirectory: Send + Sync {
    /// Companies with `status = active` and at least one active module.
    async fn list_active_companies(&self) -> Result<Vec<Company>>;
}
