//! Server entry point: wires the store, notifier, scheduler, and HTTP API.

mod api;
mod cli;
mod router;
mod state;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use duewatch_core::{Clock, Config, SystemClock};
use duewatch_engine::{ExecutionRecorder, TriggerScheduler, TriggerService};
use duewatch_notify::{EmailNotifier, Notifier};
use duewatch_store::{CompanyDirectory, MemoryStore, PgStore, TriggerStore};

use crate::cli::Cli;
use crate::state::AppState;

/// Pick the storage backend: Postgres when configured, in-memory otherwise.
async fn init_store(
    config: &Config,
    force_memory: bool,
) -> anyhow::Result<(Arc<dyn TriggerStore>, Arc<dyn CompanyDirectory>)> {
    if !force_memory && config.postgres.database_url().is_some() {
        let pg = Arc::new(PgStore::connect(&config.postgres).await?);
        return Ok((pg.clone() as Arc<dyn TriggerStore>, pg as Arc<dyn CompanyDirectory>));
    }
    warn!("PostgreSQL not configured — using the in-memory store");
    let mem = Arc::new(MemoryStore::new());
    Ok((mem.clone() as Arc<dyn TriggerStore>, mem as Arc<dyn CompanyDirectory>))
}

fn init_notifier(config: &Config) -> Option<Arc<dyn Notifier>> {
    if !config.smtp.is_configured() {
        warn!("SMTP credentials not configured — firings will record configuration failures");
        return None;
    }
    match EmailNotifier::from_config(&config.smtp) {
        Ok(notifier) => Some(Arc::new(notifier)),
        Err(e) => {
            warn!(error = %e, "email notifier unavailable");
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    duewatch_core::config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    let (store, directory) = init_store(&config, cli.memory).await?;
    let notifier = init_notifier(&config);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let scheduler = Arc::new(TriggerScheduler::new(
        store.clone(),
        directory.clone(),
        notifier,
        clock.clone(),
    ));
    // An unreachable store here is fatal: there is no job table to run.
    scheduler.start().await?;

    let tick = Duration::from_secs(cli.tick_secs.unwrap_or(config.scheduler.tick_secs));
    tokio::spawn(scheduler.clone().run(tick));

    let state = Arc::new(AppState {
        scheduler,
        service: TriggerService::new(store.clone(), clock.clone()),
        recorder: ExecutionRecorder::new(store.clone(), clock.clone()),
        directory,
        clock,
        retention_days: config.scheduler.retention_days,
    });
    let app = router::build_router(state);

    let addr = cli.bind.unwrap_or_else(|| config.http.bind_addr());
    info!(%addr, "HTTP server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
