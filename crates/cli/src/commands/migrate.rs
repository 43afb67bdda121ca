//! Database migration command.
//!
//! # Environment Variables
//!
//! - `MARIGOLD_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection
//!   string
//!
//! Migration files live in `crates/server/migrations/`.

use marigold_server::config::Config;
use marigold_server::db;
use thiserror::Error;

/// Errors from the migrate command.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("configuration error: {0}")]
    Config(#[from] marigold_server::config::ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply all pending migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration
/// fails.
pub async fn run() -> Result<(), MigrationError> {
    let config = Config::from_env()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
