//! Trigger definitions, execution records, and derived statistics.
//!
//! A [`Trigger`] is a persisted recurring-schedule definition. Its
//! [`Frequency`] is a tagged union so adding a schedule kind is a
//! compile-time-checked change, not a string comparison.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alert::Priority;

/// Day of week for weekly schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Days since Monday: Monday=0 .. Sunday=6.
    pub fn offset_from_monday(&self) -> i64 {
        match self {
            Weekday::Monday => 0,
            Weekday::Tuesday => 1,
            Weekday::Wednesday => 2,
            Weekday::Thursday => 3,
            Weekday::Friday => 4,
            Weekday::Saturday => 5,
            Weekday::Sunday => 6,
        }
    }

    pub fn from_chrono(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }
}

impl std::str::FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monday" => Ok(Weekday::Monday),
            "tuesday" => Ok(Weekday::Tuesday),
            "wednesday" => Ok(Weekday::Wednesday),
            "thursday" => Ok(Weekday::Thursday),
            "friday" => Ok(Weekday::Friday),
            "saturday" => Ok(Weekday::Saturday),
            "sunday" => Ok(Weekday::Sunday),
            other => Err(format!("unknown weekday: {other}")),
        }
    }
}

fn default_day_of_month() -> u32 {
    1
}

fn default_interval_hours() -> u32 {
    1
}

/// How often a trigger fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "frequency", rename_all = "lowercase")]
pub enum Frequency {
    /// Every day at the trigger's time of day.
    Daily,
    /// On the configured weekdays at the trigger's time of day. An empty
    /// set means "same weekday as created, once a week".
    Weekly {
        #[serde(default)]
        weekdays: Vec<Weekday>,
    },
    /// On a fixed day of the month at the trigger's time of day.
    Monthly {
        #[serde(default = "default_day_of_month")]
        day_of_month: u32,
    },
    /// Every N hours, ignoring the time of day entirely.
    Interval {
        #[serde(default = "default_interval_hours")]
        hours: u32,
    },
}

impl Frequency {
    /// Storage tag for the frequency column.
    pub fn kind_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly { .. } => "weekly",
            Frequency::Monthly { .. } => "monthly",
            Frequency::Interval { .. } => "interval",
        }
    }
}

/// A persisted recurring-notification schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub frequency: Frequency,
    /// "HH:MM". Unparsable values fall back to 08:00 at schedule time.
    pub time_of_day: String,
    pub recipients: Vec<String>,
    pub priority_filter: Vec<Priority>,
    pub active: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Payload for creating a trigger. Missing fields take the historical
/// defaults: 08:00, all priorities, active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrigger {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub frequency: Frequency,
    #[serde(default = "NewTrigger::default_time_of_day")]
    pub time_of_day: String,
    pub recipients: Vec<String>,
    #[serde(default = "NewTrigger::default_priorities")]
    pub priority_filter: Vec<Priority>,
    #[serde(default = "NewTrigger::default_active")]
    pub active: bool,
}

impl NewTrigger {
    fn default_time_of_day() -> String {
        "08:00".to_string()
    }

    fn default_priorities() -> Vec<Priority> {
        Priority::ALL.to_vec()
    }

    fn default_active() -> bool {
        true
    }
}

/// Partial update for a trigger; `None` fields are left untouched.
///
/// Deserializes from the same flat shape as [`NewTrigger`]: a `frequency`
/// tag with its variant payload alongside it. An unknown tag is rejected
/// at this boundary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "TriggerPatchRepr")]
pub struct TriggerPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub frequency: Option<Frequency>,
    pub time_of_day: Option<String>,
    pub recipients: Option<Vec<String>>,
    pub priority_filter: Option<Vec<Priority>>,
    pub active: Option<bool>,
}

/// Flat wire form of [`TriggerPatch`] before the frequency tag and its
/// payload fields are folded into one enum value.
#[derive(Debug, Default, Deserialize)]
struct TriggerPatchRepr {
    name: Option<String>,
    description: Option<String>,
    frequency: Option<String>,
    weekdays: Option<Vec<Weekday>>,
    day_of_month: Option<u32>,
    hours: Option<u32>,
    time_of_day: Option<String>,
    recipients: Option<Vec<String>>,
    priority_filter: Option<Vec<Priority>>,
    active: Option<bool>,
}

impl TryFrom<TriggerPatchRepr> for TriggerPatch {
    type Error = String;

    fn try_from(repr: TriggerPatchRepr) -> Result<Self, Self::Error> {
        let frequency = match repr.frequency.as_deref() {
            None => None,
            Some("daily") => Some(Frequency::Daily),
            Some("weekly") => Some(Frequency::Weekly {
                weekdays: repr.weekdays.unwrap_or_default(),
            }),
            Some("monthly") => Some(Frequency::Monthly {
                day_of_month: repr.day_of_month.unwrap_or_else(default_day_of_month),
            }),
            Some("interval") => Some(Frequency::Interval {
                hours: repr.hours.unwrap_or_else(default_interval_hours),
            }),
            Some(other) => return Err(format!("unknown frequency: {other}")),
        };
        Ok(Self {
            name: repr.name,
            description: repr.description,
            frequency,
            time_of_day: repr.time_of_day,
            recipients: repr.recipients,
            priority_filter: repr.priority_filter,
            active: repr.active,
        })
    }
}

/// Outcome of a single firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => f.write_str("success"),
            Outcome::Failure => f.write_str("failure"),
        }
    }
}

/// One appended entry in the execution history. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub trigger_id: i64,
    /// Trigger name at firing time; survives later renames and deletes.
    pub trigger_name: String,
    pub fired_at: DateTime<Utc>,
    pub outcome: Outcome,
    pub notifications_sent: u32,
    pub companies_processed: u32,
    pub error_message: Option<String>,
    pub details: Option<serde_json::Value>,
}

/// A record the recorder has not yet stamped with an id and timestamp.
#[derive(Debug, Clone)]
pub struct NewExecution {
    pub trigger_id: i64,
    pub trigger_name: String,
    pub outcome: Outcome,
    pub notifications_sent: u32,
    pub companies_processed: u32,
    pub error_message: Option<String>,
    pub details: Option<serde_json::Value>,
}

/// Aggregate statistics derived from a trigger's execution history.
/// Always computed on demand, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub total: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_notifications: u64,
    pub total_companies: u64,
    pub last_run: Option<DateTime<Utc>>,
    /// Percentage of successful runs, rounded to two decimals; 0.0 for an
    /// empty history.
    pub success_rate: f64,
}
