use rust_decimal::Decimal;
use sqlx::Row;

use indago_core::{NewWeeklyOrder, WeeklyOrder};

use super::RepositoryError;
use crate::DbPool;

pub struct SqlWeeklyOrderRepository {
    pool: DbPool,
}

impl SqlWeeklyOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, input: &NewWeeklyOrder) -> Result<WeeklyOrder, RepositoryError> {
        input.validate().map_err(RepositoryError::InvalidRecord)?;

        let result = sqlx::query(
            "INSERT INTO weekly_order (customer_name, order_description, week_number, total_value)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&input.customer_name)
        .bind(&input.order_description)
        .bind(input.week_number)
        .bind(input.total_value.to_string())
        .execute(&self.pool)
        .await?;

        Ok(WeeklyOrder {
            id: result.last_insert_rowid(),
            customer_name: input.customer_name.clone(),
            order_description: input.order_description.clone(),
            week_number: input.week_number,
            total_value: input.total_value,
        })
    }

    pub async fn list(&self, week: Option<i64>) -> Result<Vec<WeeklyOrder>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = if let Some(week) = week {
            sqlx::query(
                "SELECT id, customer_name, order_description, week_number, total_value
                 FROM weekly_order WHERE week_number = ? ORDER BY id",
            )
            .bind(week)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT id, customer_name, order_description, week_number, total_value
                 FROM weekly_order ORDER BY id",
            )
            .fetch_all(&self.pool)
            .await?
        };

        rows.iter().map(row_to_order).collect::<Result<Vec<_>, _>>()
    }

    /// Sum of stored order values, optionally restricted to one week. Values
    /// are summed as decimals in process since they persist as TEXT.
    pub async fn revenue_total(&self, week: Option<i64>) -> Result<Decimal, RepositoryError> {
        let values: Vec<String> = if let Some(week) = week {
            sqlx::query_scalar("SELECT total_value FROM weekly_order WHERE week_number = ?")
                .bind(week)
                .fetch_all(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT total_value FROM weekly_order")
                .fetch_all(&self.pool)
                .await?
        };

        let mut total = Decimal::ZERO;
        for raw in &values {
            let value = raw
                .parse::<Decimal>()
                .map_err(|e| RepositoryError::Decode(format!("total_value `{raw}`: {e}")))?;
            total += value;
        }
        Ok(total)
    }

    /// Latest week number present in the ledger, if any orders exist.
    pub async fn max_week(&self) -> Result<Option<i64>, RepositoryError> {
        let week: Option<i64> =
            sqlx::query_scalar("SELECT MAX(week_number) FROM weekly_order")
                .fetch_one(&self.pool)
                .await?;
        Ok(week)
    }

    pub async fn is_empty(&self) -> Result<bool, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM weekly_order")
            .fetch_one(&self.pool)
            .await?;
        Ok(count == 0)
    }
}

fn row_to_order(row: &sqlx::sqlite::SqliteRow) -> Result<WeeklyOrder, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let customer_name: String =
        row.try_get("customer_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let order_description: String =
        row.try_get("order_description").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let week_number: i64 =
        row.try_get("week_number").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let value_str: String =
        row.try_get("total_value").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let total_value = value_str
        .parse::<Decimal>()
        .map_err(|e| RepositoryError::Decode(format!("total_value `{value_str}`: {e}")))?;

    Ok(WeeklyOrder { id, customer_name, order_description, week_number, total_value })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use indago_core::NewWeeklyOrder;

    use super::SqlWeeklyOrderRepository;
    use crate::{connect_with_settings, migrations, RepositoryError};

    async fn setup() -> SqlWeeklyOrderRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlWeeklyOrderRepository::new(pool)
    }

    fn order(customer: &str, week: i64, value: i64) -> NewWeeklyOrder {
        NewWeeklyOrder {
            customer_name: customer.to_string(),
            order_description: format!("{customer} order"),
            week_number: week,
            total_value: Decimal::from(value),
        }
    }

    #[tokio::test]
    async fn insert_and_list_round_trips() {
        let repo = setup().await;

        let created = repo.insert(&order("Walk-in Customers", 42, 1_250_000)).await.expect("insert");
        assert!(created.id > 0);

        let all = repo.list(None).await.expect("list");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], created);
    }

    #[tokio::test]
    async fn insert_rejects_invalid_orders_before_writing() {
        let repo = setup().await;

        let error = repo.insert(&order("Alpha", 0, 100)).await.expect_err("week zero");
        assert!(matches!(error, RepositoryError::InvalidRecord(_)));
        assert!(repo.is_empty().await.expect("empty check"));
    }

    #[tokio::test]
    async fn list_filters_by_week() {
        let repo = setup().await;
        repo.insert(&order("Alpha", 41, 100)).await.expect("insert");
        repo.insert(&order("Beta", 42, 200)).await.expect("insert");
        repo.insert(&order("Gamma", 42, 300)).await.expect("insert");

        let week_42 = repo.list(Some(42)).await.expect("list");
        assert_eq!(week_42.len(), 2);
        assert!(week_42.iter().all(|o| o.week_number == 42));
    }

    #[tokio::test]
    async fn revenue_total_sums_all_orders() {
        let repo = setup().await;
        repo.insert(&order("Walk-in Customers", 42, 1_250_000)).await.expect("insert");
        repo.insert(&order("Marketing Dept", 42, 375_000)).await.expect("insert");

        let total = repo.revenue_total(None).await.expect("sum");
        assert_eq!(total, Decimal::from(1_625_000));
    }

    #[tokio::test]
    async fn revenue_total_respects_week_filter() {
        let repo = setup().await;
        repo.insert(&order("Old", 41, 999)).await.expect("insert");
        repo.insert(&order("Current", 42, 500)).await.expect("insert");

        let total = repo.revenue_total(Some(42)).await.expect("sum");
        assert_eq!(total, Decimal::from(500));
    }

    #[tokio::test]
    async fn revenue_total_is_zero_for_empty_ledger() {
        let repo = setup().await;
        let total = repo.revenue_total(None).await.expect("sum");
        assert_eq!(total, Decimal::ZERO);
        assert!(repo.is_empty().await.expect("empty check"));
    }

    #[tokio::test]
    async fn max_week_tracks_latest_week() {
        let repo = setup().await;
        assert_eq!(repo.max_week().await.expect("max"), None);

        repo.insert(&order("Alpha", 41, 100)).await.expect("insert");
        repo.insert(&order("Beta", 43, 100)).await.expect("insert");
        assert_eq!(repo.max_week().await.expect("max"), Some(43));
    }
}
