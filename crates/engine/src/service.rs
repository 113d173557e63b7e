//! Trigger CRUD façade.
//!
//! Validates input and keeps `next_run` consistent: it is recomputed on
//! create, on every update, and on activation. The HTTP layer calls
//! `TriggerScheduler::reload` after any mutation here.

use std::sync::Arc;

use tracing::info;

use duewatch_core::{Clock, Error, NewTrigger, Result, Trigger, TriggerPatch};
use duewatch_store::TriggerStore;

use crate::schedule;

pub struct TriggerService {
    store: Arc<dyn TriggerStore>,
    clock: Arc<dyn Clock>,
}

impl TriggerService {
    pub fn new(store: Arc<dyn TriggerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn validate(name: &str, recipients: &[String]) -> Result<()> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("name is required".to_string()));
        }
        if recipients.iter().all(|r| r.trim().is_empty()) {
            return Err(Error::InvalidInput(
                "at least one recipient is required".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn create(&self, new: NewTrigger) -> Result<Trigger> {
        Self::validate(&new.name, &new.recipients)?;

        let mut trigger = Trigger {
            id: 0,
            name: new.name,
            description: new.description,
            frequency: new.frequency,
            time_of_day: new.time_of_day,
            recipients: new.recipients,
            priority_filter: new.priority_filter,
            active: new.active,
            last_run: None,
            next_run: None,
            created_at: None,
            updated_at: None,
        };
        trigger.next_run = Some(schedule::next_fire_time(&trigger, self.clock.now()));

        let created = self.store.create(trigger).await?;
        info!(trigger_id = created.id, name = %created.name, "trigger created");
        Ok(created)
    }

    pub async fn get(&self, id: i64) -> Result<Trigger> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or(Error::TriggerNotFound(id))
    }

    pub async fn list(&self) -> Result<Vec<Trigger>> {
        self.store.get_all().await
    }

    pub async fn update(&self, id: i64, patch: TriggerPatch) -> Result<Trigger> {
        let mut trigger = self.get(id).await?;

        if let Some(name) = patch.name {
            trigger.name = name;
        }
        if let Some(description) = patch.description {
            trigger.description = description;
        }
        if let Some(frequency) = patch.frequency {
            trigger.frequency = frequency;
        }
        if let Some(time_of_day) = patch.time_of_day {
            trigger.time_of_day = time_of_day;
        }
        if let Some(recipients) = patch.recipients {
            trigger.recipients = recipients;
        }
        if let Some(priority_filter) = patch.priority_filter {
            trigger.priority_filter = priority_filter;
        }
        if let Some(active) = patch.active {
            trigger.active = active;
        }

        Self::validate(&trigger.name, &trigger.recipients)?;
        trigger.next_run = Some(schedule::next_fire_time(&trigger, self.clock.now()));

        self.store.update(&trigger).await?;
        info!(trigger_id = id, "trigger updated");
        Ok(trigger)
    }

    pub async fn set_active(&self, id: i64, active: bool) -> Result<Trigger> {
        let mut trigger = self.get(id).await?;
        trigger.active = active;
        if active {
            trigger.next_run = Some(schedule::next_fire_time(&trigger, self.clock.now()));
        }
        self.store.update(&trigger).await?;
        info!(trigger_id = id, active, "trigger state changed");
        Ok(trigger)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if !self.store.delete(id).await? {
            return Err(Error::TriggerNotFound(id));
        }
        info!(trigger_id = id, "trigger deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use duewatch_core::{Frequency, ManualClock, Priority};
    use duewatch_store::MemoryStore;

    fn service() -> (TriggerService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 8, 6, 9, 0, 0).unwrap(),
        ));
        (TriggerService::new(store.clone(), clock), store)
    }

    fn draft(name: &str) -> NewTrigger {
        NewTrigger {
            name: name.to_string(),
            description: String::new(),
            frequency: Frequency::Daily,
            time_of_day: "08:00".to_string(),
            recipients: vec!["ops@example.com".to_string()],
            priority_filter: Priority::ALL.to_vec(),
            active: true,
        }
    }

    #[tokio::test]
    async fn create_computes_next_run() {
        let (service, _) = service();

        let trigger = service.create(draft("digest")).await.unwrap();

        // 09:00 is past 08:00, so the first fire is tomorrow.
        assert_eq!(
            trigger.next_run,
            Some(Utc.with_ymd_and_hms(2026, 8, 7, 8, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn create_rejects_empty_name_and_recipients() {
        let (service, _) = service();

        let mut nameless = draft("");
        nameless.name = "  ".to_string();
        assert!(matches!(
            service.create(nameless).await,
            Err(Error::InvalidInput(_))
        ));

        let mut no_recipients = draft("x");
        no_recipients.recipients = vec![];
        assert!(matches!(
            service.create(no_recipients).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn update_recomputes_next_run() {
        let (service, _) = service();
        let trigger = service.create(draft("digest")).await.unwrap();

        let updated = service
            .update(
                trigger.id,
                TriggerPatch {
                    time_of_day: Some("10:00".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // 10:00 is still ahead of the 09:00 clock, so it fires today.
        assert_eq!(
            updated.next_run,
            Some(Utc.with_ymd_and_hms(2026, 8, 6, 10, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn update_unknown_id_is_not_found() {
        let (service, _) = service();
        assert!(matches!(
            service.update(77, TriggerPatch::default()).await,
            Err(Error::TriggerNotFound(77))
        ));
    }

    #[tokio::test]
    async fn activation_recomputes_next_run() {
        let (service, _) = service();
        let mut inactive = draft("digest");
        inactive.active = false;
        let trigger = service.create(inactive).await.unwrap();

        let activated = service.set_active(trigger.id, true).await.unwrap();
        assert!(activated.active);
        assert!(activated.next_run.is_some());
    }

    #[tokio::test]
    async fn delete_unknown_id_is_not_found() {
        let (service, _) = service();
        assert!(matches!(
            service.delete(5).await,
            Err(Error::TriggerNotFound(5))
        ));
    }
}
