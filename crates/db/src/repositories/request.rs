use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use indago_core::{NewPurchaseRequest, PurchaseRequest, RequestStatus};

use super::RepositoryError;
use crate::DbPool;

pub struct SqlPurchaseRequestRepository {
    pool: DbPool,
}

impl SqlPurchaseRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        input: &NewPurchaseRequest,
        status: RequestStatus,
        request_date: DateTime<Utc>,
        decision_date: Option<DateTime<Utc>>,
        notes: Option<&str>,
    ) -> Result<PurchaseRequest, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO purchase_request
                (item_name, quantity, estimated_cost, status, request_date, decision_date, notes)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.item_name)
        .bind(input.quantity)
        .bind(input.estimated_cost.to_string())
        .bind(status.as_str())
        .bind(request_date.to_rfc3339())
        .bind(decision_date.map(|dt| dt.to_rfc3339()))
        .bind(notes)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        Ok(PurchaseRequest {
            id,
            item_name: input.item_name.clone(),
            quantity: input.quantity,
            estimated_cost: input.estimated_cost,
            status,
            request_date,
            decision_date,
            notes: notes.map(str::to_string),
        })
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<PurchaseRequest>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, item_name, quantity, estimated_cost, status,
                    request_date, decision_date, notes
             FROM purchase_request WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_request(r)?)),
            None => Ok(None),
        }
    }

    /// All requests, newest first, optionally narrowed to one status.
    pub async fn list(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<PurchaseRequest>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = if let Some(status) = status {
            sqlx::query(
                "SELECT id, item_name, quantity, estimated_cost, status,
                        request_date, decision_date, notes
                 FROM purchase_request
                 WHERE status = ?
                 ORDER BY request_date DESC, id DESC",
            )
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT id, item_name, quantity, estimated_cost, status,
                        request_date, decision_date, notes
                 FROM purchase_request
                 ORDER BY request_date DESC, id DESC",
            )
            .fetch_all(&self.pool)
            .await?
        };

        rows.iter().map(row_to_request).collect::<Result<Vec<_>, _>>()
    }

    /// Compare-and-set transition away from pending. Returns `Ok(None)` when
    /// no pending row matched the id, so two concurrent deciders cannot both
    /// succeed; the caller distinguishes a lost race from an unknown id.
    pub async fn record_decision(
        &self,
        id: i64,
        status: RequestStatus,
        decision_date: DateTime<Utc>,
        notes: &str,
    ) -> Result<Option<PurchaseRequest>, RepositoryError> {
        let result = sqlx::query(
            "UPDATE purchase_request
             SET status = ?, decision_date = ?, notes = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(status.as_str())
        .bind(decision_date.to_rfc3339())
        .bind(notes)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }
}

fn row_to_request(row: &sqlx::sqlite::SqliteRow) -> Result<PurchaseRequest, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let item_name: String =
        row.try_get("item_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let quantity: i64 =
        row.try_get("quantity").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let cost_str: String =
        row.try_get("estimated_cost").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let request_date_str: String =
        row.try_get("request_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let decision_date_str: Option<String> =
        row.try_get("decision_date").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let notes: Option<String> =
        row.try_get("notes").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let estimated_cost = cost_str
        .parse::<Decimal>()
        .map_err(|e| RepositoryError::Decode(format!("estimated_cost `{cost_str}`: {e}")))?;
    let status = RequestStatus::parse(&status_str)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown status `{status_str}`")))?;
    let request_date = parse_timestamp("request_date", &request_date_str)?;
    let decision_date = match decision_date_str {
        Some(raw) => Some(parse_timestamp("decision_date", &raw)?),
        None => None,
    };

    Ok(PurchaseRequest {
        id,
        item_name,
        quantity,
        estimated_cost,
        status,
        request_date,
        decision_date,
        notes,
    })
}

fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column} `{raw}`: {e}")))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use indago_core::{NewPurchaseRequest, RequestStatus};

    use super::SqlPurchaseRequestRepository;
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn input(name: &str, cost: i64) -> NewPurchaseRequest {
        NewPurchaseRequest::new(name, Some(2), Decimal::from(cost)).expect("valid input")
    }

    #[tokio::test]
    async fn insert_and_find_round_trips_all_fields() {
        let pool = setup().await;
        let repo = SqlPurchaseRequestRepository::new(pool);

        let now = Utc::now();
        let created = repo
            .insert(&input("espresso machine", 900_000), RequestStatus::Pending, now, None, None)
            .await
            .expect("insert");

        let found = repo.find_by_id(created.id).await.expect("find").expect("should exist");
        assert_eq!(found, created);
        assert_eq!(found.estimated_cost, Decimal::from(900_000));
        assert_eq!(found.status, RequestStatus::Pending);
        assert!(found.decision_date.is_none());
    }

    #[tokio::test]
    async fn list_orders_by_request_date_descending() {
        let pool = setup().await;
        let repo = SqlPurchaseRequestRepository::new(pool);

        let base = Utc::now();
        repo.insert(&input("oldest", 100), RequestStatus::Pending, base - Duration::hours(2), None, None)
            .await
            .expect("insert oldest");
        repo.insert(&input("newest", 100), RequestStatus::Pending, base, None, None)
            .await
            .expect("insert newest");
        repo.insert(&input("middle", 100), RequestStatus::Pending, base - Duration::hours(1), None, None)
            .await
            .expect("insert middle");

        let all = repo.list(None).await.expect("list");
        let names: Vec<&str> = all.iter().map(|r| r.item_name.as_str()).collect();
        assert_eq!(names, vec!["newest", "middle", "oldest"]);
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let pool = setup().await;
        let repo = SqlPurchaseRequestRepository::new(pool);

        let now = Utc::now();
        repo.insert(&input("kept pending", 100), RequestStatus::Pending, now, None, None)
            .await
            .expect("insert pending");
        repo.insert(
            &input("already approved", 100),
            RequestStatus::Approved,
            now,
            Some(now),
            Some("auto-approved"),
        )
        .await
        .expect("insert approved");

        let approved = repo.list(Some(RequestStatus::Approved)).await.expect("list approved");
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].item_name, "already approved");

        let pending = repo.list(Some(RequestStatus::Pending)).await.expect("list pending");
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn record_decision_transitions_exactly_once() {
        let pool = setup().await;
        let repo = SqlPurchaseRequestRepository::new(pool);

        let now = Utc::now();
        let created = repo
            .insert(&input("grinder", 50_000), RequestStatus::Pending, now, None, None)
            .await
            .expect("insert");

        let decided = repo
            .record_decision(created.id, RequestStatus::Approved, now, "manually approved")
            .await
            .expect("decide")
            .expect("first transition should win");
        assert_eq!(decided.status, RequestStatus::Approved);
        assert_eq!(decided.decision_date, Some(now));
        assert_eq!(decided.notes.as_deref(), Some("manually approved"));

        // The compare-and-set leaves nothing for a second decider to update.
        let second = repo
            .record_decision(created.id, RequestStatus::Rejected, Utc::now(), "too late")
            .await
            .expect("second call");
        assert!(second.is_none());

        let persisted = repo.find_by_id(created.id).await.expect("find").expect("exists");
        assert_eq!(persisted.status, RequestStatus::Approved);
        assert_eq!(persisted.notes.as_deref(), Some("manually approved"));
    }

    #[tokio::test]
    async fn record_decision_on_unknown_id_matches_nothing() {
        let pool = setup().await;
        let repo = SqlPurchaseRequestRepository::new(pool);

        let outcome = repo
            .record_decision(4242, RequestStatus::Approved, Utc::now(), "n/a")
            .await
            .expect("call");
        assert!(outcome.is_none());
    }
}
