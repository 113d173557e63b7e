//! Notification delivery for compliance-deadline alerts.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable notification channels
//! - SMTP email notifier implementation via `lettre`
//! - Minijinja HTML rendering for the alert digest

pub mod email;
pub mod template;
pub mod traits;

pub use email::EmailNotifier;
pub use traits::{Notifier, NotifyError, NotifyReport};
