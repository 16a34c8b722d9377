use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::app::{router, AppState};
use crate::auth::password::hash_password;
use crate::config::config;
use crate::database::{DatabaseManager, PgExecutor};

#[derive(Parser)]
#[command(name = "crud-api")]
#[command(about = "User and role CRUD service with JWT authentication")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve,

    #[command(about = "Print a bcrypt hash for seeding a user's password")]
    HashPassword { password: String },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve().await,
        Commands::HashPassword { password } => {
            println!("{}", hash_password(&password)?);
            Ok(())
        }
    }
}

async fn serve() -> anyhow::Result<()> {
    let config = Arc::new(config().clone());
    tracing::info!("Starting crud-api in {:?} mode", config.environment);

    let pool = DatabaseManager::connect(&config.database).await?;
    DatabaseManager::health_check(&pool).await?;
    if config.database.run_migrations {
        DatabaseManager::migrate(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let executor = Arc::new(PgExecutor::new(pool.clone(), &config.database));
    let state = AppState::new(config.clone(), executor)?;
    let app = router(state);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    DatabaseManager::close(pool).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
