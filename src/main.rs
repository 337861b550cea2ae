use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use coffee_shop::auth::TokenVerifier;
use coffee_shop::config::AppConfig;
use coffee_shop::database::{DatabaseManager, DrinkStore, MemoryDrinkStore, PgDrinkStore};
use coffee_shop::AppState;

#[derive(Parser)]
#[command(name = "coffee-shop", version, about = "Drinks menu API with permission-checked routes")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Run the HTTP API (default)")]
    Serve {
        #[arg(long, help = "Port to listen on, overrides PORT")]
        port: Option<u16>,
        #[arg(long, help = "Keep drinks in memory instead of Postgres")]
        in_memory: bool,
    },

    #[command(about = "Drop and recreate the drink table, seeding a single drink")]
    ResetDb,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, AUTH0_DOMAIN, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("coffee_shop=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    info!("Starting coffee shop API in {:?} mode", config.environment);

    match cli.command.unwrap_or(Command::Serve { port: None, in_memory: false }) {
        Command::Serve { port, in_memory } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config, in_memory).await
        }
        Command::ResetDb => reset_db(config).await,
    }
}

async fn serve(config: AppConfig, in_memory: bool) -> anyhow::Result<()> {
    let store: Arc<dyn DrinkStore> = if in_memory {
        warn!("Using in-memory drink store, data is lost on exit");
        Arc::new(MemoryDrinkStore::new())
    } else {
        let pool = DatabaseManager::connect(&config.database)
            .await
            .context("failed to connect to database")?;
        DatabaseManager::migrate(&pool)
            .await
            .context("failed to create drink table")?;
        Arc::new(PgDrinkStore::new(pool))
    };

    let verifier = TokenVerifier::from_config(&config.auth).context("invalid auth configuration")?;
    let app = coffee_shop::app(AppState::new(store, Arc::new(verifier)), &config.security);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Coffee shop API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Coffee shop API stopped");
    Ok(())
}

async fn reset_db(config: AppConfig) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    DatabaseManager::reset(&pool)
        .await
        .context("failed to reset drink table")?;
    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
