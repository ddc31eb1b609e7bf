//! Account Ledger - HTTP service
//!
//! Serves the ledger over HTTP and runs the monthly snapshot job in the
//! background.

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use account_ledger::api::{self, AppState};
use account_ledger::balance::BalanceValidator;
use account_ledger::domain::{Clock, SystemClock};
use account_ledger::handlers::{CreateMovementHandler, LedgerQueries};
use account_ledger::jobs::{JobScheduler, JobSchedulerConfig, SnapshotGenerator};
use account_ledger::lock::PgLockManager;
use account_ledger::store::PgTransactionManager;
use account_ledger::{db, Config};

/// Initialize tracing/logging. Production logs are JSON lines.
fn init_tracing(json: bool) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "account_ledger=debug,tower_http=debug".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.is_production());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(
        environment = %config.environment,
        timezone = %config.ledger_timezone,
        "Starting account ledger"
    );
    tracing::info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    db::verify_connection(&pool).await?;
    if !db::check_schema(&pool).await? {
        tracing::error!("Database schema is not complete. Please run migrations.");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    tracing::info!("Database connected successfully");

    let transactions = Arc::new(PgTransactionManager::new(pool.clone()));
    let locks = Arc::new(PgLockManager::new(pool.clone(), config.lock_settings()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let policy = config.policy();

    let snapshots = SnapshotGenerator::new(Arc::clone(&transactions), policy.clone(), Arc::clone(&clock));
    let state = AppState {
        movements: CreateMovementHandler::new(
            Arc::clone(&transactions),
            locks,
            BalanceValidator::new(policy.clone()),
            Arc::clone(&clock),
        ),
        queries: LedgerQueries::new(
            Arc::clone(&transactions),
            BalanceValidator::new(policy),
            Arc::clone(&clock),
        ),
        snapshots: snapshots.clone(),
    };

    let scheduler = JobScheduler::with_config(
        snapshots,
        JobSchedulerConfig {
            snapshot_check_interval: config.snapshot_check_interval,
        },
    )
    .start();

    let app = api::build_app(state);

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    tracing::info!("Server shutting down...");
    scheduler.abort();
    pool.close().await;
    tracing::info!("Database connections closed. Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
