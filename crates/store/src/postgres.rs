//! PostgreSQL storage backend via sqlx.
//!
//! The schema is bootstrapped with `CREATE TABLE IF NOT EXISTS` at connect
//! time. List-valued columns (recipients, priorities, weekdays) are TEXT,
//! matching the historical schema: recipients and priorities
//! comma-separated, weekdays a JSON array of lowercase day names.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::warn;

use duewatch_core::config::PostgresConfig;
use duewatch_core::{
    Company, CompanyKind, CompanyStatus, ComplianceModule, Error, ExecutionRecord, Frequency,
    Outcome, Priority, Result, Trigger, Weekday,
};

use crate::traits::{CompanyDirectory, TriggerStore};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS triggers (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        frequency TEXT NOT NULL DEFAULT 'daily',
        time_of_day TEXT NOT NULL DEFAULT '08:00',
        weekdays TEXT,
        day_of_month INTEGER,
        interval_hours INTEGER,
        recipients TEXT NOT NULL DEFAULT '',
        priority_filter TEXT NOT NULL DEFAULT 'CRITICAL,HIGH,MEDIUM',
        active BOOLEAN NOT NULL DEFAULT TRUE,
        last_run TIMESTAMPTZ,
        next_run TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
    "CREATE TABLE IF NOT EXISTS trigger_executions (
        id UUID PRIMARY KEY,
        trigger_id BIGINT NOT NULL REFERENCES triggers(id) ON DELETE CASCADE,
        trigger_name TEXT NOT NULL,
        fired_at TIMESTAMPTZ NOT NULL,
        outcome TEXT NOT NULL DEFAULT 'success',
        notifications_sent INTEGER NOT NULL DEFAULT 0,
        companies_processed INTEGER NOT NULL DEFAULT 0,
        error_message TEXT,
        details TEXT
    )",
    "CREATE INDEX IF NOT EXISTS idx_trigger_executions_trigger_id
        ON trigger_executions(trigger_id)",
    "CREATE INDEX IF NOT EXISTS idx_trigger_executions_fired_at
        ON trigger_executions(fired_at DESC)",
    "CREATE TABLE IF NOT EXISTS companies (
        id BIGSERIAL PRIMARY KEY,
        tax_id TEXT UNIQUE NOT NULL,
        name TEXT NOT NULL,
        kind TEXT NOT NULL DEFAULT 'legal_entity',
        status TEXT NOT NULL DEFAULT 'active',
        cert_active BOOLEAN NOT NULL DEFAULT FALSE,
        cert_start_date DATE,
        cert_end_date DATE,
        cert_notification_date DATE,
        cert_renewed BOOLEAN NOT NULL DEFAULT FALSE,
        cert_invoiced BOOLEAN NOT NULL DEFAULT FALSE,
        cert_comments TEXT,
        resol_active BOOLEAN NOT NULL DEFAULT FALSE,
        resol_start_date DATE,
        resol_end_date DATE,
        resol_notification_date DATE,
        resol_renewed BOOLEAN NOT NULL DEFAULT FALSE,
        resol_invoiced BOOLEAN NOT NULL DEFAULT FALSE,
        resol_comments TEXT,
        doc_active BOOLEAN NOT NULL DEFAULT FALSE,
        doc_start_date DATE,
        doc_end_date DATE,
        doc_notification_date DATE,
        doc_renewed BOOLEAN NOT NULL DEFAULT FALSE,
        doc_invoiced BOOLEAN NOT NULL DEFAULT FALSE,
        doc_comments TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )",
];

fn db_err(e: sqlx::Error) -> Error {
    Error::Store(e.to_string())
}

/// PostgreSQL-backed trigger store and company directory.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and bootstrap the schema.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let url = config
            .database_url()
            .ok_or_else(|| Error::Configuration("PostgreSQL not configured".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(db_err)?;

        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await.map_err(db_err)?;
        }

        tracing::info!(database = %config.database, "PostgreSQL store ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ── Column codecs ───────────────────────────────────────────────────

fn encode_recipients(recipients: &[String]) -> String {
    recipients.join(",")
}

fn decode_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn encode_priorities(priorities: &[Priority]) -> String {
    priorities
        .iter()
        .map(Priority::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

fn decode_priorities(raw: &str) -> Vec<Priority> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse() {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(token = s, error = %e, "skipping unknown priority token");
                None
            }
        })
        .collect()
}

fn encode_weekdays(weekdays: &[Weekday]) -> String {
    serde_json::to_string(&weekdays.iter().map(Weekday::as_str).collect::<Vec<_>>())
        .unwrap_or_else(|_| "[]".to_string())
}

fn decode_weekdays(raw: &str) -> std::result::Result<Vec<Weekday>, String> {
    let names: Vec<String> =
        serde_json::from_str(raw).map_err(|e| format!("invalid weekday list: {e}"))?;
    names.iter().map(|n| n.parse()).collect()
}

/// Split a [`Frequency`] into its storage columns:
/// (kind, weekdays, day_of_month, interval_hours).
fn frequency_columns(frequency: &Frequency) -> (&'static str, Option<String>, Option<i32>, Option<i32>) {
    let kind = frequency.kind_str();
    match frequency {
        Frequency::Daily => (kind, None, None, None),
        Frequency::Weekly { weekdays } => (kind, Some(encode_weekdays(weekdays)), None, None),
        Frequency::Monthly { day_of_month } => (kind, None, Some(*day_of_month as i32), None),
        Frequency::Interval { hours } => (kind, None, None, Some(*hours as i32)),
    }
}

fn frequency_from_columns(
    kind: &str,
    weekdays: Option<String>,
    day_of_month: Option<i32>,
    interval_hours: Option<i32>,
) -> std::result::Result<Frequency, String> {
    match kind {
        "daily" => Ok(Frequency::Daily),
        "weekly" => {
            let weekdays = match weekdays.as_deref() {
                Some(raw) if !raw.is_empty() => decode_weekdays(raw)?,
                _ => Vec::new(),
            };
            Ok(Frequency::Weekly { weekdays })
        }
        "monthly" => Ok(Frequency::Monthly {
            day_of_month: day_of_month.unwrap_or(1).max(1) as u32,
        }),
        "interval" => Ok(Frequency::Interval {
            hours: interval_hours.unwrap_or(1).max(1) as u32,
        }),
        other => Err(format!("unknown frequency '{other}'")),
    }
}

fn trigger_from_row(row: &PgRow) -> Result<Trigger> {
    let id: i64 = row.try_get("id").map_err(db_err)?;
    let kind: String = row.try_get("frequency").map_err(db_err)?;
    let weekdays: Option<String> = row.try_get("weekdays").map_err(db_err)?;
    let day_of_month: Option<i32> = row.try_get("day_of_month").map_err(db_err)?;
    let interval_hours: Option<i32> = row.try_get("interval_hours").map_err(db_err)?;

    let frequency = frequency_from_columns(&kind, weekdays, day_of_month, interval_hours)
        .map_err(|e| Error::Store(format!("trigger {id}: {e}")))?;

    let recipients: String = row.try_get("recipients").map_err(db_err)?;
    let priorities: String = row.try_get("priority_filter").map_err(db_err)?;

    Ok(Trigger {
        id,
        name: row.try_get("name").map_err(db_err)?,
        description: row.try_get("description").map_err(db_err)?,
        frequency,
        time_of_day: row.try_get("time_of_day").map_err(db_err)?,
        recipients: decode_recipients(&recipients),
        priority_filter: decode_priorities(&priorities),
        active: row.try_get("active").map_err(db_err)?,
        last_run: row.try_get("last_run").map_err(db_err)?,
        next_run: row.try_get("next_run").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

/// Map rows to triggers, skipping (with a warning) rows that fail to decode
/// so one malformed trigger cannot poison a full load.
fn triggers_from_rows(rows: Vec<PgRow>) -> Vec<Trigger> {
    rows.iter()
        .filter_map(|row| match trigger_from_row(row) {
            Ok(t) => Some(t),
            Err(e) => {
                warn!(error = %e, "skipping malformed trigger row");
                None
            }
        })
        .collect()
}

fn execution_from_row(row: &PgRow) -> Result<ExecutionRecord> {
    let outcome: String = row.try_get("outcome").map_err(db_err)?;
    let outcome = match outcome.as_str() {
        "success" => Outcome::Success,
        "failure" => Outcome::Failure,
        other => return Err(Error::Store(format!("unknown outcome '{other}'"))),
    };

    let details: Option<String> = row.try_get("details").map_err(db_err)?;

    Ok(ExecutionRecord {
        id: row.try_get("id").map_err(db_err)?,
        trigger_id: row.try_get("trigger_id").map_err(db_err)?,
        trigger_name: row.try_get("trigger_name").map_err(db_err)?,
        fired_at: row.try_get("fired_at").map_err(db_err)?,
        outcome,
        notifications_sent: row.try_get::<i32, _>("notifications_sent").map_err(db_err)? as u32,
        companies_processed: row.try_get::<i32, _>("companies_processed").map_err(db_err)? as u32,
        error_message: row.try_get("error_message").map_err(db_err)?,
        details: details.and_then(|raw| serde_json::from_str(&raw).ok()),
    })
}

fn module_from_row(row: &PgRow, prefix: &str) -> Result<ComplianceModule> {
    let col = |name: &str| format!("{prefix}_{name}");
    Ok(ComplianceModule {
        active: row.try_get(col("active").as_str()).map_err(db_err)?,
        start_date: row
            .try_get::<Option<NaiveDate>, _>(col("start_date").as_str())
            .map_err(db_err)?,
        end_date: row
            .try_get::<Option<NaiveDate>, _>(col("end_date").as_str())
            .map_err(db_err)?,
        notification_date: row
            .try_get::<Option<NaiveDate>, _>(col("notification_date").as_str())
            .map_err(db_err)?,
        renewed: row.try_get(col("renewed").as_str()).map_err(db_err)?,
        invoiced: row.try_get(col("invoiced").as_str()).map_err(db_err)?,
        comments: row.try_get(col("comments").as_str()).map_err(db_err)?,
    })
}

fn company_from_row(row: &PgRow) -> Result<Company> {
    let kind: String = row.try_get("kind").map_err(db_err)?;
    let kind = match kind.as_str() {
        "natural_person" => CompanyKind::NaturalPerson,
        "legal_entity" => CompanyKind::LegalEntity,
        "consortium" => CompanyKind::Consortium,
        _ => CompanyKind::Other,
    };

    let status: String = row.try_get("status").map_err(db_err)?;
    let status = match status.as_str() {
        "active" => CompanyStatus::Active,
        "suspended" => CompanyStatus::Suspended,
        _ => CompanyStatus::Inactive,
    };

    Ok(Company {
        id: row.try_get("id").map_err(db_err)?,
        tax_id: row.try_get("tax_id").map_err(db_err)?,
        name: row.try_get("name").map_err(db_err)?,
        kind,
        status,
        certificate: module_from_row(row, "cert")?,
        resolution: module_from_row(row, "resol")?,
        supporting_document: module_from_row(row, "doc")?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        updated_at: row.try_get("updated_at").map_err(db_err)?,
    })
}

// ── TriggerStore ────────────────────────────────────────────────────

#[async_trait::async_trait]
impl TriggerStore for PgStore {
    async fn create(&self, trigger: Trigger) -> Result<Trigger> {
        let (kind, weekdays, day_of_month, interval_hours) =
            frequency_columns(&trigger.frequency);

        let row = sqlx::query(
            "INSERT INTO triggers (
                name, description, frequency, time_of_day, weekdays,
                day_of_month, interval_hours, recipients, priority_filter,
                active, last_run, next_run
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, created_at, updated_at",
        )
        .bind(&trigger.name)
        .bind(&trigger.description)
        .bind(kind)
        .bind(&trigger.time_of_day)
        .bind(weekdays)
        .bind(day_of_month)
        .bind(interval_hours)
        .bind(encode_recipients(&trigger.recipients))
        .bind(encode_priorities(&trigger.priority_filter))
        .bind(trigger.active)
        .bind(trigger.last_run)
        .bind(trigger.next_run)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let mut created = trigger;
        created.id = row.try_get("id").map_err(db_err)?;
        created.created_at = row.try_get("created_at").map_err(db_err)?;
        created.updated_at = row.try_get("updated_at").map_err(db_err)?;
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Trigger>> {
        let row = sqlx::query("SELECT * FROM triggers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;
        row.map(|r| trigger_from_row(&r)).transpose()
    }

    async fn get_all(&self) -> Result<Vec<Trigger>> {
        let rows = sqlx::query("SELECT * FROM triggers ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(triggers_from_rows(rows))
    }

    async fn get_active(&self) -> Result<Vec<Trigger>> {
        let rows = sqlx::query("SELECT * FROM triggers WHERE active ORDER BY time_of_day")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(triggers_from_rows(rows))
    }

    async fn update(&self, trigger: &Trigger) -> Result<()> {
        let (kind, weekdays, day_of_month, interval_hours) =
            frequency_columns(&trigger.frequency);

        let result = sqlx::query(
            "UPDATE triggers SET
                name = $1, description = $2, frequency = $3, time_of_day = $4,
                weekdays = $5, day_of_month = $6, interval_hours = $7,
                recipients = $8, priority_filter = $9, active = $10,
                last_run = $11, next_run = $12, updated_at = now()
            WHERE id = $13",
        )
        .bind(&trigger.name)
        .bind(&trigger.description)
        .bind(kind)
        .bind(&trigger.time_of_day)
        .bind(weekdays)
        .bind(day_of_month)
        .bind(interval_hours)
        .bind(encode_recipients(&trigger.recipients))
        .bind(encode_priorities(&trigger.priority_filter))
        .bind(trigger.active)
        .bind(trigger.last_run)
        .bind(trigger.next_run)
        .bind(trigger.id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(Error::TriggerNotFound(trigger.id));
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM triggers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_fired(
        &self,
        id: i64,
        last_run: DateTime<Utc>,
        next_run: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE triggers SET last_run = $1, next_run = $2, updated_at = now()
            WHERE id = $3",
        )
        .bind(last_run)
        .bind(next_run)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(Error::TriggerNotFound(id));
        }
        Ok(())
    }

    async fn record_execution(&self, record: &ExecutionRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO trigger_executions (
                id, trigger_id, trigger_name, fired_at, outcome,
                notifications_sent, companies_processed, error_message, details
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(record.id)
        .bind(record.trigger_id)
        .bind(&record.trigger_name)
        .bind(record.fired_at)
        .bind(record.outcome.to_string())
        .bind(record.notifications_sent as i32)
        .bind(record.companies_processed as i32)
        .bind(&record.error_message)
        .bind(record.details.as_ref().map(|d| d.to_string()))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn executions_for(
        &self,
        trigger_id: i64,
        limit: Option<usize>,
    ) -> Result<Vec<ExecutionRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM trigger_executions WHERE trigger_id = $1
            ORDER BY fired_at DESC LIMIT $2",
        )
        .bind(trigger_id)
        .bind(limit.map(|l| l as i64).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(execution_from_row).collect()
    }

    async fn all_executions(&self, limit: Option<usize>) -> Result<Vec<ExecutionRecord>> {
        let rows = sqlx::query(
            "SELECT * FROM trigger_executions ORDER BY fired_at DESC LIMIT $1",
        )
        .bind(limit.map(|l| l as i64).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(execution_from_row).collect()
    }

    async fn delete_executions_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM trigger_executions WHERE fired_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}

// ── CompanyDirectory ────────────────────────────────────────────────

#[async_trait::async_trait]
impl CompanyDirectory for PgStore {
    async fn list_active_companies(&self) -> Result<Vec<Company>> {
        let rows = sqlx::query(
            "SELECT * FROM companies
            WHERE status = 'active' AND (cert_active OR resol_active OR doc_active)
            ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.iter().map(company_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_columns_round_trip() {
        let cases = vec![
            Frequency::Daily,
            Frequency::Weekly {
                weekdays: vec![Weekday::Monday, Weekday::Friday],
            },
            Frequency::Monthly { day_of_month: 15 },
            Frequency::Interval { hours: 6 },
        ];
        for frequency in cases {
            let (kind, weekdays, dom, hours) = frequency_columns(&frequency);
            let decoded = frequency_from_columns(kind, weekdays, dom, hours).unwrap();
            assert_eq!(decoded, frequency);
        }
    }

    #[test]
    fn unknown_frequency_kind_is_an_error() {
        assert!(frequency_from_columns("fortnightly", None, None, None).is_err());
    }

    #[test]
    fn recipients_codec_trims_and_drops_empties() {
        assert_eq!(
            decode_recipients(" a@x.com , ,b@x.com,"),
            vec!["a@x.com".to_string(), "b@x.com".to_string()]
        );
        assert_eq!(
            encode_recipients(&["a@x.com".to_string(), "b@x.com".to_string()]),
            "a@x.com,b@x.com"
        );
    }

    #[test]
    fn priorities_codec_skips_unknown_tokens() {
        let decoded = decode_priorities("CRITICAL,bogus,MEDIUM");
        assert_eq!(decoded, vec![Priority::Critical, Priority::Medium]);
    }
}
