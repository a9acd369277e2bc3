//! Integration tests for the `PostgreSQL` order repository.
//!
//! These tests require:
//! - A running `PostgreSQL` database reachable at `DATABASE_URL`
//!
//! Migrations are applied on connect. Each test uses fresh subjects, so the
//! tests can share a database and run in parallel.
//!
//! Run with: cargo test -p pizza-orders-server -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use rust_decimal::Decimal;
use secrecy::SecretString;
use uuid::Uuid;

use pizza_orders_core::{LineItem, NewOrder};
use pizza_orders_server::db::{self, OrderRepository, OrderStore, SUMMARY_LIMIT};

async fn repository() -> OrderRepository {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = db::create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    OrderRepository::new(pool, Duration::from_secs(5))
}

fn subject() -> String {
    format!("auth0|{}", Uuid::new_v4().simple())
}

fn order(id: &str, qty: u32, total: f64) -> NewOrder {
    NewOrder::parse(
        vec![LineItem {
            id: id.to_string(),
            qty,
        }],
        total,
        Some("123 Pizza St".to_string()),
    )
    .unwrap()
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_ensure_user_is_idempotent() {
    let repo = repository().await;
    let sub = subject();

    let first = repo.ensure_user(&sub, Some("old@pizza.test")).await.unwrap();
    let second = repo.ensure_user(&sub, Some("new@pizza.test")).await.unwrap();
    let third = repo.ensure_user(&sub, None).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(second, third);

    let email: Option<String> =
        sqlx::query_scalar("SELECT email FROM users WHERE external_subject = $1")
            .bind(&sub)
            .fetch_one(repo.pool())
            .await
            .unwrap();
    assert_eq!(email.as_deref(), Some("new@pizza.test"));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_concurrent_first_requests_create_one_user() {
    let repo = repository().await;
    let sub = subject();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let repo = repo.clone();
            let sub = sub.clone();
            tokio::spawn(async move { repo.ensure_user(&sub, None).await.unwrap() })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE external_subject = $1")
        .bind(&sub)
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_created_order_round_trips_through_listing() {
    let repo = repository().await;
    let user = repo.ensure_user(&subject(), None).await.unwrap();

    let created = repo
        .create_order(user, &order("pepperoni", 1, 22.5))
        .await
        .unwrap();

    assert_eq!(created.total, Decimal::new(2250, 2));
    assert_eq!(created.address.as_deref(), Some("123 Pizza St"));

    let listed = repo.list_orders(user).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, created.id);
    assert_eq!(listed[0].items, created.items);
    assert_eq!(listed[0].created_at, created.created_at);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_list_is_newest_first_and_scoped_to_user() {
    let repo = repository().await;
    let pat = repo.ensure_user(&subject(), None).await.unwrap();
    let sam = repo.ensure_user(&subject(), None).await.unwrap();

    for n in 1..=3 {
        repo.create_order(pat, &order("margherita", n, f64::from(n)))
            .await
            .unwrap();
    }
    repo.create_order(sam, &order("veggie", 1, 9.0)).await.unwrap();

    let listed = repo.list_orders(pat).await.unwrap();
    let totals: Vec<Decimal> = listed.iter().map(|o| o.total).collect();
    assert_eq!(
        totals,
        vec![Decimal::from(3), Decimal::from(2), Decimal::from(1)]
    );
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_summary_is_limited_and_unknown_subject_is_empty() {
    let repo = repository().await;
    let sub = subject();
    let user = repo.ensure_user(&sub, None).await.unwrap();

    for n in 1..=7 {
        repo.create_order(user, &order("hawaiian", 1, f64::from(n)))
            .await
            .unwrap();
    }

    let summary = repo.summary(&sub).await.unwrap();
    assert_eq!(summary.len(), usize::try_from(SUMMARY_LIMIT).unwrap());
    assert_eq!(summary[0].total, Decimal::from(7));
    assert_eq!(summary[4].total, Decimal::from(3));

    let unknown = subject();
    assert!(repo.summary(&unknown).await.unwrap().is_empty());

    let created: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE external_subject = $1")
        .bind(&unknown)
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(created, 0);
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_ping() {
    let repo = repository().await;
    repo.ping().await.unwrap();
}
