//! In-memory storage backend.
//!
//! Backs tests and runs without a configured database. Uses
//! `std::sync::RwLock`; no await points are held across locks, so plain
//! sync locks are safe inside the async trait methods.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use duewatch_core::{Company, Error, ExecutionRecord, Result, Trigger};

use crate::traits::{CompanyDirectory, TriggerStore};

/// Shared in-memory backend implementing both storage traits.
#[derive(Default)]
pub struct MemoryStore {
    triggers: RwLock<HashMap<i64, Trigger>>,
    executions: RwLock<Vec<ExecutionRecord>>,
    companies: RwLock<Vec<Company>>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    /// Replace the seeded company list (tests and demo runs).
    pub fn set_companies(&self, companies: Vec<Company>) {
        *self.companies.write().expect("companies lock poisoned") = companies;
    }
}

#[async_trait::async_trait]
impl TriggerStore for MemoryStore {
    async fn create(&self, mut trigger: Trigger) -> Result<Trigger> {
        let now = Utc::now();
        trigger.id = self.next_id.fetch_add(1, Ordering::SeqCst);
        trigger.created_at = Some(now);
        trigger.updated_at = Some(now);
        self.triggers
            .write()
            .expect("triggers lock poisoned")
            .insert(trigger.id, trigger.clone());
        Ok(trigger)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Trigger>> {
        Ok(self
            .triggers
            .read()
            .expect("triggers lock poisoned")
            .get(&id)
            .cloned())
    }

    async fn get_all(&self) -> Result<Vec<Trigger>> {
        let mut all: Vec<Trigger> = self
            .triggers
            .read()
            .expect("triggers lock poisoned")
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|t| t.id);
        Ok(all)
    }

    async fn get_active(&self) -> Result<Vec<Trigger>> {
        Ok(self.get_all().await?.into_iter().filter(|t| t.active).collect())
    }

    async fn update(&self, trigger: &Trigger) -> Result<()> {
        let mut guard = self.triggers.write().expect("triggers lock poisoned");
        match guard.get_mut(&trigger.id) {
            Some(existing) => {
                let mut updated = trigger.clone();
                updated.created_at = existing.created_at;
                updated.updated_at = Some(Utc::now());
                *existing = updated;
                Ok(())
            }
            None => Err(Error::TriggerNotFound(trigger.id)),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let removed = self
            .triggers
            .write()
            .expect("triggers lock poisoned")
            .remove(&id)
            .is_some();
        if removed {
            // Mirror the FK cascade of the SQL backend.
            self.executions
                .write()
                .expect("executions lock poisoned")
                .retain(|r| r.trigger_id != id);
        }
        Ok(removed)
    }

    async fn mark_fired(
        &self,
        id: i64,
        last_run: DateTime<Utc>,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut guard = self.triggers.write().expect("triggers lock poisoned");
        let trigger = guard.get_mut(&id).ok_or(Error::TriggerNotFound(id))?;
        trigger.last_run = Some(last_run);
        trigger.next_run = next_run;
        trigger.updated_at = Some(Utc::now());
        Ok(())
    }

    async fn record_execution(&self, record: &ExecutionRecord) -> Result<()> {
        self.executions
            .write()
            .expect("executions lock poisoned")
            .push(record.clone());
        Ok(())
    }

    async fn executions_for(
        &self,
        trigger_id: i64,
        limit: Option<usize>,
    ) -> Result<Vec<ExecutionRecord>> {
        let mut records: Vec<ExecutionRecord> = self
            .executions
            .read()
            .expect("executions lock poisoned")
            .iter()
            .filter(|r| r.trigger_id == trigger_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.fired_at.cmp(&a.fired_at));
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    async fn all_executions(&self, limit: Option<usize>) -> Result<Vec<ExecutionRecord>> {
        let mut records: Vec<ExecutionRecord> = self
            .executions
            .read()
            .expect("executions lock poisoned")
            .clone();
        records.sort_by(|a, b| b.fired_at.cmp(&a.fired_at));
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    async fn delete_executions_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut guard = self.executions.write().expect("executions lock poisoned");
        let before = guard.len();
        guard.retain(|r| r.fired_at >= cutoff);
        Ok((before - guard.len()) as u64)
    }
}

#[async_trait::async_trait]
impl CompanyDirectory for MemoryStore {
    async fn list_active_companies(&self) -> Result<Vec<Company>> {
        Ok(self
            .companies
            .read()
            .expect("companies lock poisoned")
            .iter()
            .filter(|c| {
                matches!(c.status, duewatch_core::CompanyStatus::Active) && c.has_active_module()
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use duewatch_core::{Frequency, Outcome, Priority};
    use uuid::Uuid;

    fn make_trigger(name: &str) -> Trigger {
        Trigger {
            id: 0,
            name: name.to_string(),
            description: String::new(),
            frequency: Frequency::Daily,
            time_of_day: "08:00".to_string(),
            recipients: vec!["ops@example.com".to_string()],
            priority_filter: Priority::ALL.to_vec(),
            active: true,
            last_run: None,
            next_run: None,
            created_at: None,
            updated_at: None,
        }
    }

    fn make_record(trigger_id: i64, fired_at: DateTime<Utc>) -> ExecutionRecord {
        ExecutionRecord {
            id: Uuid::new_v4(),
            trigger_id,
            trigger_name: "t".to_string(),
            fired_at,
            outcome: Outcome::Success,
            notifications_sent: 1,
            companies_processed: 1,
            error_message: None,
            details: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = store.create(make_trigger("a")).await.unwrap();
        let b = store.create(make_trigger("b")).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert!(a.created_at.is_some());
    }

    #[tokio::test]
    async fn get_active_filters_inactive() {
        let store = MemoryStore::new();
        let mut inactive = make_trigger("off");
        inactive.active = false;
        store.create(make_trigger("on")).await.unwrap();
        store.create(inactive).await.unwrap();

        let active = store.get_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "on");
    }

    #[tokio::test]
    async fn update_unknown_id_errors() {
        let store = MemoryStore::new();
        let mut trigger = make_trigger("x");
        trigger.id = 42;
        assert!(matches!(
            store.update(&trigger).await,
            Err(Error::TriggerNotFound(42))
        ));
    }

    #[tokio::test]
    async fn delete_cascades_to_executions() {
        let store = MemoryStore::new();
        let trigger = store.create(make_trigger("a")).await.unwrap();
        store
            .record_execution(&make_record(trigger.id, Utc::now()))
            .await
            .unwrap();

        assert!(store.delete(trigger.id).await.unwrap());
        assert!(store.all_executions(None).await.unwrap().is_empty());
        assert!(!store.delete(trigger.id).await.unwrap());
    }

    #[tokio::test]
    async fn executions_sorted_newest_first_with_limit() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for i in 0..3 {
            store
                .record_execution(&make_record(1, now - Duration::hours(i)))
                .await
                .unwrap();
        }

        let records = store.executions_for(1, Some(2)).await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].fired_at > records[1].fired_at);
    }

    #[tokio::test]
    async fn purge_removes_only_old_records() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .record_execution(&make_record(1, now - Duration::days(100)))
            .await
            .unwrap();
        store
            .record_execution(&make_record(1, now))
            .await
            .unwrap();

        let removed = store
            .delete_executions_before(now - Duration::days(90))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.all_executions(None).await.unwrap().len(), 1);
    }
}
