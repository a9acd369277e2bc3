//! Order persistence in `PostgreSQL`.
//!
//! ## Tables
//!
//! - `users` - One row per identity provider subject, created on first use
//! - `orders` - Append-only order ledger
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p pizza-orders-cli -- migrate
//! ```

pub mod orders;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use pizza_orders_core::{NewOrder, UserId};

use crate::models::{Order, OrderSummary};

pub use orders::OrderRepository;

/// Maximum number of entries in an order summary.
pub const SUMMARY_LIMIT: i64 = 5;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The statement did not finish within the storage timeout.
    #[error("database statement timed out")]
    Timeout,
}

/// Storage operations behind the order routes.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Map `subject` to its internal user id, creating the user if needed.
    ///
    /// A present `email` replaces the stored one; `None` keeps it.
    async fn ensure_user(&self, subject: &str, email: Option<&str>)
    -> Result<UserId, RepositoryError>;

    /// Store a validated order for `user_id`.
    async fn create_order(&self, user_id: UserId, order: &NewOrder)
    -> Result<Order, RepositoryError>;

    /// All orders of `user_id`, newest first.
    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    /// Up to [`SUMMARY_LIMIT`] most recent orders of `subject`, newest first.
    ///
    /// An unknown subject yields an empty list.
    async fn summary(&self, subject: &str) -> Result<Vec<OrderSummary>, RepositoryError>;

    /// Check that storage is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Run a statement with an upper bound on its duration.
async fn bounded<T, F>(timeout: Duration, statement: F) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    tokio::time::timeout(timeout, statement)
        .await
        .map_err(|_| RepositoryError::Timeout)?
        .map_err(RepositoryError::from)
}
