//! Alert types produced by the alert engine.
//!
//! Alerts are ephemeral: computed per evaluation, never persisted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::company::{CompanyKind, ModuleKind};

/// Sentinel used when ordering companies whose alerts carry no deadline.
pub const NO_DEADLINE_SORT_KEY: i64 = 999;

/// Alert priority. `CRITICAL` sorts before `HIGH` sorts before `MEDIUM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Critical,
    High,
    Medium,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Critical, Priority::High, Priority::Medium];

    /// Ordering rank: CRITICAL=0, HIGH=1, MEDIUM=2.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "CRITICAL",
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CRITICAL" => Ok(Priority::Critical),
            "HIGH" => Ok(Priority::High),
            "MEDIUM" => Ok(Priority::Medium),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// Why a module was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertReason {
    #[serde(rename = "upcoming expiry")]
    UpcomingExpiry,
    #[serde(rename = "renewed but not invoiced")]
    RenewedNotInvoiced,
    #[serde(rename = "upcoming expiry and renewed without invoicing")]
    ExpiryRenewedUnbilled,
}

impl AlertReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertReason::UpcomingExpiry => "upcoming expiry",
            AlertReason::RenewedNotInvoiced => "renewed but not invoiced",
            AlertReason::ExpiryRenewedUnbilled => "upcoming expiry and renewed without invoicing",
        }
    }
}

impl std::fmt::Display for AlertReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single module flagged for attention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub module_kind: ModuleKind,
    /// Human-readable module label (see [`ModuleKind::label`]).
    pub module: String,
    pub end_date: Option<NaiveDate>,
    pub notification_date: Option<NaiveDate>,
    /// Days until the end date. Expiry alerts clamp this to ≥ 0 for display;
    /// the raw signed value already drove the priority thresholds.
    pub days_remaining: Option<i64>,
    pub renewed: bool,
    pub invoiced: bool,
    pub priority: Priority,
    pub reason: AlertReason,
}

/// All alerts for one company, as returned by the alert engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyAlerts {
    pub tax_id: String,
    pub name: String,
    pub kind: CompanyKind,
    pub alerts: Vec<Alert>,
}

impl CompanyAlerts {
    pub fn total_alerts(&self) -> usize {
        self.alerts.len()
    }

    /// Best (lowest) priority rank across this company's alerts.
    pub fn min_priority_rank(&self) -> u8 {
        self.alerts
            .iter()
            .map(|a| a.priority.rank())
            .min()
            .unwrap_or(u8::MAX)
    }

    /// Smallest days-remaining across alerts, `None` counting as 999.
    pub fn min_days_remaining(&self) -> i64 {
        self.alerts
            .iter()
            .map(|a| a.days_remaining.unwrap_or(NO_DEADLINE_SORT_KEY))
            .min()
            .unwrap_or(NO_DEADLINE_SORT_KEY)
    }
}
