//! Order domain types as returned to clients.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use pizza_orders_core::{LineItem, OrderId};

/// A stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order id.
    pub id: OrderId,
    /// Line items in submission order.
    pub items: Vec<LineItem>,
    /// Order total.
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    /// Delivery address, if given.
    pub address: Option<String>,
    /// When the order was stored.
    pub created_at: DateTime<Utc>,
}

/// An order reduced to what the downstream automation hook needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    /// Order id.
    pub id: OrderId,
    /// Order total.
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    /// When the order was stored.
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            total: order.total,
            created_at: order.created_at,
        }
    }
}
