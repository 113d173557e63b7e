//! Environment-based configuration.
//!
//! Every knob is an env var with a sensible default; call [`load_dotenv`]
//! once at process start so a local `.env` file can supply them.

use std::env;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    env_opt(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub http: HttpConfig,
    pub postgres: PostgresConfig,
    pub smtp: SmtpConfig,
    pub scheduler: SchedulerConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Self {
        Self {
            http: HttpConfig::from_env(),
            postgres: PostgresConfig::from_env(),
            smtp: SmtpConfig::from_env(),
            scheduler: SchedulerConfig::from_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl HttpConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("HTTP_HOST", "0.0.0.0"),
            port: env_u16("HTTP_PORT", 8080),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Full connection URL; takes precedence over the component vars.
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl PostgresConfig {
    fn from_env() -> Self {
        Self {
            url: env_opt("PG_URL"),
            host: env_opt("PG_HOST"),
            port: env_u16("PG_PORT", 5432),
            database: env_or("PG_DATABASE", "duewatch"),
            user: env_or("PG_USER", "duewatch"),
            password: env_or("PG_PASSWORD", ""),
        }
    }

    /// Connection URL when Postgres is configured at all; `None` means the
    /// process should fall back to the in-memory store.
    pub fn database_url(&self) -> Option<String> {
        if let Some(url) = &self.url {
            return Some(url.clone());
        }
        self.host.as_ref().map(|host| {
            format!(
                "postgres://{}:{}@{}:{}/{}",
                self.user, self.password, host, self.port, self.database
            )
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_name: String,
    /// Sender address; defaults to the username when unset.
    pub from_addr: Option<String>,
}

impl SmtpConfig {
    fn from_env() -> Self {
        Self {
            host: env_or("SMTP_HOST", "smtp.gmail.com"),
            port: env_u16("SMTP_PORT", 587),
            username: env_opt("SMTP_USER"),
            password: env_opt("SMTP_PASSWORD"),
            from_name: env_or("SMTP_FROM_NAME", "Compliance Deadline Tracker"),
            from_addr: env_opt("SMTP_FROM"),
        }
    }

    /// Credentials present; without them every firing records a
    /// configuration failure instead of attempting delivery.
    pub fn is_configured(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    pub fn sender(&self) -> Option<String> {
        self.from_addr.clone().or_else(|| self.username.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between due-job scans.
    pub tick_secs: u64,
    /// Execution-history retention for the purge endpoint.
    pub retention_days: i64,
}

impl SchedulerConfig {
    fn from_env() -> Self {
        Self {
            tick_secs: env_u64("SCHEDULER_TICK_SECS", 30),
            retention_days: env_i64("EXECUTION_RETENTION_DAYS", 90),
        }
    }
}
