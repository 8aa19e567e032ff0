//! Database pool setup.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use avamove_core::{MigrateError, MigrationConfig};

/// Connect to the record database.
///
/// Connectivity is verified eagerly so a broken database fails the run
/// before anything is dispatched.
pub async fn connect_pool(config: &MigrationConfig) -> Result<PgPool, MigrateError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_timeout_seconds))
        .connect(&config.database_url)
        .await?;

    tracing::info!(
        max_connections = config.db_max_connections,
        "Connected to the record database"
    );

    Ok(pool)
}
