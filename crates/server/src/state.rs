use std::sync::Arc;

use duewatch_core::Clock;
use duewatch_engine::{ExecutionRecorder, TriggerScheduler, TriggerService};
use duewatch_store::CompanyDirectory;

pub struct AppState {
    pub scheduler: Arc<TriggerScheduler>,
    pub service: TriggerService,
    pub recorder: ExecutionRecorder,
    pub directory: Arc<dyn CompanyDirectory>,
    pub clock: Arc<dyn Clock>,
    /// Default retention window for the execution-history purge endpoint.
    pub retention_days: i64,
}
