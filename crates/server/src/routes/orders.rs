//! Order route handlers.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use pizza_orders_core::{LineItem, NewOrder};

use crate::auth::{CreateOrders, ReadOrders, ReadSummary};
use crate::error::{AppError, Result};
use crate::middleware::Authorized;
use crate::models::{Order, OrderSummary};
use crate::state::AppState;

/// Body of `POST /orders`.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    /// Line items.
    pub items: Vec<LineItem>,
    /// Client-computed total.
    pub total: f64,
    /// Optional delivery address.
    #[serde(default)]
    pub address: Option<String>,
}

/// Body of `GET /orders`.
#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    /// Orders, newest first.
    pub orders: Vec<Order>,
}

/// Query of `GET /orders/summary`.
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// Subject whose orders are summarized.
    pub sub: Option<String>,
}

/// Place an order for the caller.
///
/// `POST /orders`
#[instrument(skip_all, fields(subject = %auth.claims.sub))]
pub async fn create(
    State(state): State<AppState>,
    auth: Authorized<CreateOrders>,
    payload: std::result::Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Order>)> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let order = NewOrder::parse(request.items, request.total, request.address)?;

    let user_id = state
        .orders()
        .ensure_user(&auth.claims.sub, auth.claims.email.as_deref())
        .await?;
    let order = state.orders().create_order(user_id, &order).await?;

    tracing::info!(order_id = %order.id, total = %order.total, "Order created");

    Ok((StatusCode::CREATED, Json(order)))
}

/// List the caller's orders, newest first.
///
/// `GET /orders`
#[instrument(skip_all, fields(subject = %auth.claims.sub))]
pub async fn list(
    State(state): State<AppState>,
    auth: Authorized<ReadOrders>,
) -> Result<impl IntoResponse> {
    let user_id = state
        .orders()
        .ensure_user(&auth.claims.sub, auth.claims.email.as_deref())
        .await?;
    let orders = state.orders().list_orders(user_id).await?;

    Ok((
        [
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        Json(OrdersResponse { orders }),
    ))
}

/// Most recent orders of any subject, for the machine-to-machine hook.
///
/// `GET /orders/summary?sub=<subject>`
#[instrument(skip_all, fields(caller = %auth.claims.sub))]
pub async fn summary(
    State(state): State<AppState>,
    auth: Authorized<ReadSummary>,
    query: std::result::Result<Query<SummaryQuery>, QueryRejection>,
) -> Result<Json<Vec<OrderSummary>>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    // Blank is rejected, but the subject is looked up exactly as sent.
    let subject = query
        .sub
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing required query parameter: sub".to_string()))?;

    let summary = state.orders().summary(subject).await?;
    Ok(Json(summary))
}
