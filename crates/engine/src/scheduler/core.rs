//! [`TriggerScheduler`] — owns the live job table and fires due triggers.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use duewatch_core::{
    Clock, Error, ExecutionRecord, NewExecution, Outcome, Result, Trigger,
};
use duewatch_notify::Notifier;
use duewatch_store::{CompanyDirectory, TriggerStore};

use crate::alerts;
use crate::recorder::ExecutionRecorder;
use crate::schedule;

use super::entry::{JobEntry, JobStatus};

/// Stateful scheduler binding each active trigger to a scheduled job.
///
/// Job-table mutations (`start`, `reload`) and due scans are mutually
/// exclusive through one async mutex. A trigger's firing runs outside the
/// lock, but its job stays marked in-flight until the outcome is recorded,
/// so the same id is never fired re-entrantly.
pub struct TriggerScheduler {
    store: Arc<dyn TriggerStore>,
    directory: Arc<dyn CompanyDirectory>,
    notifier: Option<Arc<dyn Notifier>>,
    recorder: ExecutionRecorder,
    clock: Arc<dyn Clock>,
    jobs: Mutex<HashMap<i64, JobEntry>>,
}

impl TriggerScheduler {
    pub fn new(
        store: Arc<dyn TriggerStore>,
        directory: Arc<dyn CompanyDirectory>,
        notifier: Option<Arc<dyn Notifier>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let recorder = ExecutionRecorder::new(store.clone(), clock.clone());
        Self {
            store,
            directory,
            notifier,
            recorder,
            clock,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Load every active trigger and register one job per id.
    ///
    /// An unreachable store is fatal here: there is no job table to run
    /// without it. Malformed rows were already skipped (with a warning) by
    /// the store's decoder and do not abort startup.
    pub async fn start(&self) -> Result<usize> {
        let count = self.load_jobs().await?;
        info!(jobs = count, "trigger scheduler started");
        Ok(count)
    }

    /// Atomically replace the whole job table from persisted state.
    ///
    /// Invoked after any trigger CRUD change. The table lock is held across
    /// the store read and the swap, so no job can fire mid-reload with
    /// stale parameters.
    pub async fn reload(&self) -> Result<usize> {
        let count = self.load_jobs().await?;
        info!(jobs = count, "trigger jobs reloaded");
        Ok(count)
    }

    async fn load_jobs(&self) -> Result<usize> {
        let mut jobs = self.jobs.lock().await;
        let triggers = self.store.get_active().await?;
        let now = self.clock.now();

        jobs.clear();
        for trigger in triggers {
            let next_fire = schedule::next_fire_time(&trigger, now);
            debug!(
                trigger_id = trigger.id,
                name = %trigger.name,
                %next_fire,
                "job scheduled"
            );
            jobs.insert(
                trigger.id,
                JobEntry {
                    trigger_id: trigger.id,
                    name: trigger.name,
                    next_fire,
                    in_flight: false,
                },
            );
        }
        Ok(jobs.len())
    }

    /// Point-in-time snapshot of the job table, ordered by trigger id.
    pub async fn status(&self) -> Vec<JobStatus> {
        let jobs = self.jobs.lock().await;
        let mut statuses: Vec<JobStatus> = jobs
            .values()
            .map(|job| JobStatus {
                id: job.trigger_id,
                name: job.name.clone(),
                next_fire: job.next_fire,
            })
            .collect();
        statuses.sort_by_key(|s| s.id);
        statuses
    }

    /// Background loop: scan for due jobs every `tick`.
    pub async fn run(self: Arc<Self>, tick: Duration) {
        info!(interval_secs = tick.as_secs(), "scheduler loop running");
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    /// One due scan. Collects due, not-in-flight jobs under the lock, marks
    /// them in flight, then executes them outside it.
    pub async fn tick(&self) {
        let now = self.clock.now();
        let due: Vec<i64> = {
            let mut jobs = self.jobs.lock().await;
            jobs.values_mut()
                .filter(|job| !job.in_flight && job.next_fire <= now)
                .map(|job| {
                    job.in_flight = true;
                    job.trigger_id
                })
                .collect()
        };

        for trigger_id in due {
            if let Err(e) = self.execute(trigger_id).await {
                warn!(trigger_id, error = %e, "scheduled execution failed");
            }
        }
    }

    /// Manually fire one trigger, bypassing its schedule.
    ///
    /// Unknown ids surface as [`Error::TriggerNotFound`] with no record
    /// written. A trigger already in flight is rejected rather than fired
    /// twice.
    pub async fn execute_now(&self, trigger_id: i64) -> Result<ExecutionRecord> {
        {
            let mut jobs = self.jobs.lock().await;
            if let Some(job) = jobs.get_mut(&trigger_id) {
                if job.in_flight {
                    return Err(Error::InvalidInput(format!(
                        "trigger {trigger_id} is currently firing"
                    )));
                }
                job.in_flight = true;
            }
        }
        self.execute(trigger_id).await
    }

    /// Fetch the trigger and run one firing; always clears the in-flight
    /// marker afterwards.
    async fn execute(&self, trigger_id: i64) -> Result<ExecutionRecord> {
        let result = match self.store.get_by_id(trigger_id).await {
            Ok(Some(trigger)) => Ok(self.fire(&trigger).await),
            Ok(None) => Err(Error::TriggerNotFound(trigger_id)),
            Err(e) => Err(e),
        };

        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.get_mut(&trigger_id) {
            job.in_flight = false;
        }
        result
    }

    /// One complete firing: decide the outcome, record it, and reschedule.
    ///
    /// Rescheduling happens in every branch, including failures, so a
    /// failing trigger still fires at its next natural slot instead of
    /// stalling forever.
    async fn fire(&self, trigger: &Trigger) -> ExecutionRecord {
        let fired_at = self.clock.now();
        info!(trigger_id = trigger.id, name = %trigger.name, "executing trigger");

        let outcome = self.run_firing(trigger).await;
        let record = self.recorder.stamp(outcome);
        if let Err(e) = self.recorder.persist(&record).await {
            // History write failure does not change the already-decided outcome.
            warn!(trigger_id = trigger.id, error = %e, "failed to record execution outcome");
        }

        let next_fire = schedule::next_fire_time(trigger, self.clock.now());
        if let Err(e) = self
            .store
            .mark_fired(trigger.id, fired_at, Some(next_fire))
            .await
        {
            // The trigger may have been deleted mid-fire.
            warn!(trigger_id = trigger.id, error = %e, "failed to persist next run");
        }
        {
            let mut jobs = self.jobs.lock().await;
            if let Some(job) = jobs.get_mut(&trigger.id) {
                job.next_fire = next_fire;
            }
        }

        info!(
            trigger_id = trigger.id,
            outcome = %record.outcome,
            notifications = record.notifications_sent,
            %next_fire,
            "trigger execution finished"
        );
        record
    }

    /// Decide the firing outcome. Configuration problems short-circuit
    /// before any alert computation is attempted.
    async fn run_firing(&self, trigger: &Trigger) -> NewExecution {
        let failure = |message: String| NewExecution {
            trigger_id: trigger.id,
            trigger_name: trigger.name.clone(),
            outcome: Outcome::Failure,
            notifications_sent: 0,
            companies_processed: 0,
            error_message: Some(message),
            details: None,
        };

        if trigger.recipients.is_empty() {
            warn!(trigger_id = trigger.id, "no recipients configured");
            return failure("no recipients configured".to_string());
        }

        let notifier = match &self.notifier {
            Some(notifier) => notifier.clone(),
            None => {
                warn!(trigger_id = trigger.id, "notification transport not configured");
                return failure("notification transport not configured".to_string());
            }
        };

        let companies = match self.directory.list_active_companies().await {
            Ok(companies) => companies,
            Err(e) => return failure(format!("failed to list companies: {e}")),
        };

        let evaluated = alerts::evaluate(&companies, self.clock.now());
        let companies_reviewed = evaluated.len();
        let filtered = alerts::filter_by_priority(evaluated, &trigger.priority_filter);

        if filtered.is_empty() {
            // Nothing due is a normal outcome, not an error.
            debug!(trigger_id = trigger.id, "no alerts match the priority filter");
            return NewExecution {
                trigger_id: trigger.id,
                trigger_name: trigger.name.clone(),
                outcome: Outcome::Success,
                notifications_sent: 0,
                companies_processed: 0,
                error_message: None,
                details: Some(serde_json::json!({
                    "companies_reviewed": companies_reviewed,
                    "companies_processed": 0,
                    "alerts": 0,
                })),
            };
        }

        let total_alerts: usize = filtered.iter().map(|c| c.alerts.len()).sum();
        match notifier.send(&trigger.recipients, &filtered).await {
            Ok(report) => NewExecution {
                trigger_id: trigger.id,
                trigger_name: trigger.name.clone(),
                outcome: Outcome::Success,
                notifications_sent: report.notifications_sent,
                companies_processed: filtered.len() as u32,
                error_message: None,
                details: Some(serde_json::json!({
                    "companies": filtered.len(),
                    "alerts": total_alerts,
                    "recipients": trigger.recipients.len(),
                    "priorities": serde_json::to_value(&trigger.priority_filter)
                        .unwrap_or_default(),
                })),
            },
            Err(e) => {
                warn!(trigger_id = trigger.id, error = %e, "notification dispatch failed");
                NewExecution {
                    trigger_id: trigger.id,
                    trigger_name: trigger.name.clone(),
                    outcome: Outcome::Failure,
                    notifications_sent: 0,
                    companies_processed: filtered.len() as u32,
                    error_message: Some(format!("failed to send notifications: {e}")),
                    details: None,
                }
            }
        }
    }
}
