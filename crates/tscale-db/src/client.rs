//! Database client and connection management

use crate::{DbError, DbResult};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Pool settings for [`DbClient::connect`]
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// Database client wrapping a sqlx connection pool.
///
/// Cloning is cheap; each operation acquires its own connection.
#[derive(Clone)]
pub struct DbClient {
    pool: PgPool,
}

impl DbClient {
    /// Create a new database client from connection string
    pub async fn new(database_url: &str) -> DbResult<Self> {
        Self::connect(database_url, &PoolSettings::default()).await
    }

    pub async fn connect(database_url: &str, settings: &PoolSettings) -> DbResult<Self> {
        if database_url.trim().is_empty() {
            return Err(DbError::ConfigError("empty database url".to_string()));
        }

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Get reference to underlying pool for direct queries
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Test the database connection
    pub async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
