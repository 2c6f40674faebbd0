//! Database connection pool construction
//!
//! The pool is the transactional collaborator the services borrow
//! connections from: `begin()` opens, commit/rollback close, and dropping
//! the transaction returns the connection to the pool.

use crate::config::DatabaseConfig;
use crate::{Error, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

/// Connect to Postgres with the configured pool limits
pub async fn connect_pool(database_url: &str, config: &DatabaseConfig) -> Result<PgPool> {
    if database_url.trim().is_empty() {
        return Err(Error::Config("database_url must not be empty".to_string()));
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(database_url)
        .await?;

    info!(
        max_connections = config.max_connections,
        "Database connection pool established"
    );

    Ok(pool)
}
