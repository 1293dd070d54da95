use anyhow::Context;
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use ridehub_bookings::{BookingService, ReservationStore, SqliteReservationStore};
use ridehub_core::config::RidehubConfig;
use ridehub_scheduler::{SchedulePolicy, SchedulerEngine};

mod app;
mod http;

#[derive(Debug, Parser)]
#[command(name = "ridehub-gateway", version, about = "Ride booking gateway and scheduler")]
struct Cli {
    /// Config file (default: $RIDEHUB_CONFIG, then ~/.ridehub/ridehub.toml).
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP gateway with the periodic scheduler (default).
    Serve,
    /// Run one scheduler tick against the database and print the report.
    Tick,
    /// Print scheduler stats as JSON.
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // logs go to stderr so `tick` and `stats` output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "ridehub_gateway=info,ridehub_scheduler=info,ridehub_bookings=info,tower_http=debug"
                    .into()
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // load config: --config > RIDEHUB_CONFIG env > ~/.ridehub/ridehub.toml
    let config_path = cli
        .config
        .clone()
        .or_else(|| std::env::var("RIDEHUB_CONFIG").ok());
    let config = RidehubConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        RidehubConfig::default()
    });

    let store: Arc<dyn ReservationStore> = Arc::new(open_store(&config)?);
    let engine = Arc::new(SchedulerEngine::new(
        Arc::clone(&store),
        SchedulePolicy::from(&config.scheduler),
    ));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, store, engine).await,
        Command::Tick => {
            let report = engine.process_scheduled_bookings().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Stats => {
            let stats = engine.scheduler_stats(None).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
    }
}

async fn serve(
    config: RidehubConfig,
    store: Arc<dyn ReservationStore>,
    engine: Arc<SchedulerEngine>,
) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port)
        .parse()
        .context("invalid gateway bind address")?;

    let scheduler = if config.scheduler.enabled {
        Some(ridehub_scheduler::start_minutes(
            Arc::clone(&engine),
            config.scheduler.interval_minutes,
        ))
    } else {
        info!("scheduler disabled in config");
        None
    };

    let state = Arc::new(app::AppState::new(
        config,
        BookingService::new(store),
        engine,
        scheduler,
    ));
    let router = app::build_router(Arc::clone(&state));

    info!(%addr, "RideHub gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // let an in-flight tick finish before the process exits
    if let Some(handle) = &state.scheduler {
        handle.stop().await;
    }
    info!("RideHub gateway stopped");
    Ok(())
}

/// Open the SQLite database, creating the parent directory and schema as needed.
fn open_store(config: &RidehubConfig) -> anyhow::Result<SqliteReservationStore> {
    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(SqliteReservationStore::new(db)?)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
