//! Deterministic bootstrap seed for the revenue ledger.
//!
//! A fresh database carries the canonical week-42 sales rows so that budget
//! evaluation has a non-zero revenue base on first start. Seeding is skipped
//! whenever any order already exists.

use rust_decimal::Decimal;
use tracing::info;

use indago_core::NewWeeklyOrder;

use crate::repositories::{RepositoryError, SqlWeeklyOrderRepository};
use crate::DbPool;

struct SeedOrder {
    customer_name: &'static str,
    order_description: &'static str,
    week_number: i64,
    total_value: i64,
}

const SEED_ORDERS: &[SeedOrder] = &[
    SeedOrder {
        customer_name: "Walk-in Customers (Week 42)",
        order_description: "Palm Sugar Latte & Americano (50 cups)",
        week_number: 42,
        total_value: 1_250_000,
    },
    SeedOrder {
        customer_name: "Marketing Dept Meeting",
        order_description: "Coffee Break Package (15 Bottles)",
        week_number: 42,
        total_value: 375_000,
    },
];

/// Seeds the canonical weekly orders when the revenue ledger is empty.
/// Returns how many rows were inserted (zero when data already exists).
pub async fn seed_weekly_orders_if_empty(pool: &DbPool) -> Result<usize, RepositoryError> {
    let repo = SqlWeeklyOrderRepository::new(pool.clone());
    if !repo.is_empty().await? {
        return Ok(0);
    }

    for seed in SEED_ORDERS {
        let order = NewWeeklyOrder {
            customer_name: seed.customer_name.to_string(),
            order_description: seed.order_description.to_string(),
            week_number: seed.week_number,
            total_value: Decimal::from(seed.total_value),
        };
        repo.insert(&order).await?;
    }

    info!(event_name = "fixtures.seeded", rows = SEED_ORDERS.len(), "seeded weekly orders");
    Ok(SEED_ORDERS.len())
}
