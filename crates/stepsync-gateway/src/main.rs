use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use stepsync_core::config::{SeedAccountConfig, StepsyncConfig, DEFAULT_CONFIG_PATH};
use stepsync_remote::RemoteSubmitter;
use stepsync_scheduler::JobRegistry;
use stepsync_service::{ExecutionRecorder, SchedulerService};
use stepsync_store::{AccountStore, NewAccount};
use tracing::{info, warn};

mod app;
mod http;

/// Daily step submission service.
#[derive(Parser)]
#[command(name = "stepsync-gateway")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML config file (overrides STEPSYNC_CONFIG)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stepsync_gateway=info,stepsync_service=info,stepsync_scheduler=info,\
                 stepsync_remote=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > STEPSYNC_CONFIG env > ./stepsync.toml
    let config_path = cli.config.or_else(|| std::env::var("STEPSYNC_CONFIG").ok());
    let config = load_config(config_path.as_deref())?;
    let tz = config.schedule.tz()?;

    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = open_db(&db_path)?;
    stepsync_store::db::init_db(&db)?;
    info!("database migrations complete");

    // API handlers and the execution path each get their own connection.
    let store = Arc::new(AccountStore::new(db, tz));
    seed_default_account(&store, config.seed.as_ref())?;
    let exec_store = Arc::new(AccountStore::new(open_db(&db_path)?, tz));

    let submitter = Arc::new(RemoteSubmitter::new(config.remote.clone()));
    let registry = Arc::new(JobRegistry::new(tz));
    let service = Arc::new(SchedulerService::new(
        exec_store.clone(),
        submitter,
        ExecutionRecorder::new(exec_store, tz),
        registry,
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    service.start(shutdown_rx);
    match service.sync_jobs() {
        Ok(report) => info!(jobs = report.added.len(), "initial job sync complete"),
        Err(e) => warn!(error = %e, "initial job sync failed"),
    }

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let state = Arc::new(app::AppState::new(config, tz, store, service));
    let router = app::build_router(state);

    info!(tz = %tz, "stepsync gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // stop the scheduler clock
    let _ = shutdown_tx.send(true);
    info!("stepsync gateway stopped");
    Ok(())
}

fn open_db(path: &str) -> rusqlite::Result<rusqlite::Connection> {
    let db = rusqlite::Connection::open(path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(db)
}

/// Insert the configured seed account when the table is empty.
fn seed_default_account(
    store: &AccountStore,
    seed: Option<&SeedAccountConfig>,
) -> stepsync_store::Result<()> {
    let Some(seed) = seed else {
        return Ok(());
    };
    if store.count_accounts()? > 0 {
        return Ok(());
    }
    let account = store.create_account(NewAccount {
        login: seed.account.trim().to_string(),
        password: seed.password.clone(),
        steps: seed.steps,
        schedule_hour: seed.schedule_hour,
        schedule_minute: seed.schedule_minute,
        enabled: true,
    })?;
    info!(account_id = %account.id, "seeded default account");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}

/// A missing file means defaults plus env overrides. A file that exists but
/// fails to parse or validate stops startup.
fn load_config(path: Option<&str>) -> stepsync_core::Result<StepsyncConfig> {
    let path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    if !std::path::Path::new(path).exists() {
        warn!(path, "config file not found, using defaults");
    }
    StepsyncConfig::load(Some(path))
}
