//! `PostgreSQL` implementation of [`OrderStore`].
//!
//! Every write is a single statement, so no transaction spans more than one
//! logical operation.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use tracing::instrument;

use pizza_orders_core::{LineItem, NewOrder, OrderId, UserId};

use super::{OrderStore, RepositoryError, SUMMARY_LIMIT, bounded};
use crate::models::{Order, OrderSummary};

/// Repository for user and order database operations.
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
    timeout: Duration,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    items: Json<Vec<LineItem>>,
    total: Decimal,
    address: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            items: row.items.0,
            total: row.total,
            address: row.address,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: OrderId,
    total: Decimal,
    created_at: DateTime<Utc>,
}

impl From<SummaryRow> for OrderSummary {
    fn from(row: SummaryRow) -> Self {
        Self {
            id: row.id,
            total: row.total,
            created_at: row.created_at,
        }
    }
}

impl OrderRepository {
    /// Create a new repository. `timeout` bounds every statement.
    #[must_use]
    pub const fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl OrderStore for OrderRepository {
    #[instrument(skip(self, email))]
    async fn ensure_user(
        &self,
        subject: &str,
        email: Option<&str>,
    ) -> Result<UserId, RepositoryError> {
        bounded(
            self.timeout,
            sqlx::query_scalar::<_, UserId>(
                r"
                INSERT INTO users (external_subject, email)
                VALUES ($1, $2)
                ON CONFLICT (external_subject) DO UPDATE
                    SET email = COALESCE(EXCLUDED.email, users.email),
                        updated_at = now()
                RETURNING id
                ",
            )
            .bind(subject)
            .bind(email)
            .fetch_one(&self.pool),
        )
        .await
    }

    #[instrument(skip(self, order), fields(items = order.items().len()))]
    async fn create_order(
        &self,
        user_id: UserId,
        order: &NewOrder,
    ) -> Result<Order, RepositoryError> {
        let row = bounded(
            self.timeout,
            sqlx::query_as::<_, OrderRow>(
                r"
                INSERT INTO orders (user_id, items, total, address)
                VALUES ($1, $2, $3, $4)
                RETURNING id, items, total, address, created_at
                ",
            )
            .bind(user_id)
            .bind(Json(order.items().to_vec()))
            .bind(order.total())
            .bind(order.address())
            .fetch_one(&self.pool),
        )
        .await?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn list_orders(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = bounded(
            self.timeout,
            sqlx::query_as::<_, OrderRow>(
                r"
                SELECT id, items, total, address, created_at
                FROM orders
                WHERE user_id = $1
                ORDER BY created_at DESC, id DESC
                ",
            )
            .bind(user_id)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    #[instrument(skip(self))]
    async fn summary(&self, subject: &str) -> Result<Vec<OrderSummary>, RepositoryError> {
        let rows = bounded(
            self.timeout,
            sqlx::query_as::<_, SummaryRow>(
                r"
                SELECT o.id, o.total, o.created_at
                FROM orders o
                JOIN users u ON u.id = o.user_id
                WHERE u.external_subject = $1
                ORDER BY o.created_at DESC, o.id DESC
                LIMIT $2
                ",
            )
            .bind(subject)
            .bind(SUMMARY_LIMIT)
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.into_iter().map(OrderSummary::from).collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        bounded(
            self.timeout,
            sqlx::query("SELECT 1").execute(&self.pool),
        )
        .await
        .map(|_| ())
    }
}
