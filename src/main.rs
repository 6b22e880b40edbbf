use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use sqlx::migrate::Migrator;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use transact_core::adapters::{
    HttpCredentials, HttpRail, InMemoryTransactionRepository, PostgresTransactionRepository,
    StaticCredentials, StubRail,
};
use transact_core::cli::{handle_config_validate, Cli, Commands};
use transact_core::config::Config;
use transact_core::ports::{Credentials, SettlementRail, TransactionRepository};
use transact_core::services::{SettlementWorker, TransactionService};
use transact_core::{create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Some(Commands::Config) => handle_config_validate(&config),
        Some(Commands::Serve) | None => serve(config).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let repo: Arc<dyn TransactionRepository> = match &config.database_url {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(url)
                .await?;

            let migrator = Migrator::new(Path::new("./migrations")).await?;
            migrator.run(&pool).await?;
            tracing::info!("database migrations completed");

            Arc::new(PostgresTransactionRepository::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory repository");
            Arc::new(InMemoryTransactionRepository::new())
        }
    };

    let credentials: Arc<dyn Credentials> = match &config.credential_service_url {
        Some(url) => Arc::new(HttpCredentials::new(url.clone())),
        None => {
            let demo_user = Uuid::new_v4();
            tracing::warn!(
                %demo_user,
                "CREDENTIAL_SERVICE_URL not set, using static credentials (demo@example.com / demo)"
            );
            Arc::new(StaticCredentials::new().with_user("demo@example.com", "demo", demo_user))
        }
    };

    let rail: Arc<dyn SettlementRail> = match &config.settlement_rail_url {
        Some(url) => Arc::new(HttpRail::new(url.clone())),
        None => {
            tracing::warn!("SETTLEMENT_RAIL_URL not set, using the always-succeeding rail stub");
            Arc::new(StubRail::succeeding())
        }
    };

    let worker = SettlementWorker::new(repo.clone(), rail, config.settlement());
    tokio::spawn(worker.run());

    let state = AppState {
        service: Arc::new(TransactionService::new(repo, credentials)),
    };
    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
