//! Deadline evaluation and trigger scheduling.
//!
//! This crate provides:
//! - Alert engine: pure company-state → prioritized alert list
//! - Schedule calculator: pure trigger + now → next fire timestamp
//! - Trigger scheduler: live job table with reload and manual firing
//! - Execution recorder: run-outcome history and derived statistics
//! - Trigger service: CRUD façade that keeps `next_run` consistent

pub mod alerts;
pub mod recorder;
pub mod schedule;
pub mod scheduler;
pub mod service;

pub use recorder::ExecutionRecorder;
pub use scheduler::{JobStatus, TriggerScheduler};
pub use service::TriggerService;
