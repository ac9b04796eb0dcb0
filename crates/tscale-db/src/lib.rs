//! Storage layer for measurement datasets
//!
//! PostgreSQL via sqlx, plus an in-memory store with the same contract.
//! Tables are created if missing; there are no migrations.

pub mod client;
pub mod memory;
pub mod queries;
pub mod schema;
pub mod store;

pub use client::*;
pub use memory::*;
pub use schema::*;
pub use store::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

pub type DbResult<T> = Result<T, DbError>;
