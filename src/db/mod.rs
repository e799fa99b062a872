//! PostgreSQL pool for the ledger tables

pub mod schema;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;

use crate::config::PoolConfig;

/// Reported in `pg_stat_activity` so ledger sessions are easy to find
pub const APPLICATION_NAME: &str = "payment_core";

pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect with default pool sizing
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        Self::connect_with(database_url, &PoolConfig::default()).await
    }

    pub async fn connect_with(database_url: &str, config: &PoolConfig) -> Result<Self, sqlx::Error> {
        let options = PgConnectOptions::from_str(database_url)?.application_name(APPLICATION_NAME);
        let pool = pool_options(config).connect_with(options).await?;

        tracing::info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "PostgreSQL ledger pool established"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Round trip to the server; used by `/health`
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn pool_options(config: &PoolConfig) -> PgPoolOptions {
    // min above max would make sqlx refuse to start
    let max = config.max_connections.max(1);
    PgPoolOptions::new()
        .max_connections(max)
        .min_connections(config.min_connections.min(max))
        .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
}
