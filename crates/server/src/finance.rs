//! Finance routes: the weekly revenue ledger and the purchase-request
//! approval surface.
//!
//! - `GET  /orders-weekly`            — weekly order list and revenue potential
//! - `POST /purchase-request`         — submit a purchase request
//! - `GET  /finance/requests?status=` — list requests, optionally by status
//! - `POST /finance/approve/{id}`     — manual approval (budget re-checked)
//! - `POST /finance/reject/{id}`      — manual rejection
//! - `GET  /finance/history`          — full decision trail, newest first

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use indago_core::{
    FinanceError, NewPurchaseRequest, PurchaseRequest, RequestStatus, WeeklyOrder,
};
use indago_db::{DbPool, SqlWeeklyOrderRepository};

use crate::engine::ApprovalEngine;

#[derive(Clone)]
pub struct FinanceState {
    pub db_pool: DbPool,
    pub engine: Arc<ApprovalEngine>,
}

// ---------------------------------------------------------------------------
// Wire types (camelCase on the wire, domain types stay snake_case)
// ---------------------------------------------------------------------------

/// Accepts both the camelCase field names and the legacy snake_case body
/// (`{"item_name": ..., "quantity": ..., "cost": ...}`) still sent by older
/// procurement clients.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequestBody {
    #[serde(alias = "item_name")]
    pub item_name: String,
    pub quantity: Option<i64>,
    #[serde(alias = "cost", alias = "estimated_cost")]
    pub estimated_cost: Decimal,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequestBody {
    pub id: i64,
    pub item_name: String,
    pub quantity: i64,
    pub estimated_cost: Decimal,
    pub status: RequestStatus,
    pub request_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl From<PurchaseRequest> for PurchaseRequestBody {
    fn from(request: PurchaseRequest) -> Self {
        Self {
            id: request.id,
            item_name: request.item_name,
            quantity: request.quantity,
            estimated_cost: request.estimated_cost,
            status: request.status,
            request_date: request.request_date,
            decision_date: request.decision_date,
            notes: request.notes,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyOrderBody {
    pub id: i64,
    pub customer_name: String,
    pub order_description: String,
    pub week_number: i64,
    pub total_value: Decimal,
}

impl From<WeeklyOrder> for WeeklyOrderBody {
    fn from(order: WeeklyOrder) -> Self {
        Self {
            id: order.id,
            customer_name: order.customer_name,
            order_description: order.order_description,
            week_number: order.week_number,
            total_value: order.total_value,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyOrdersResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_number: Option<i64>,
    pub orders: Vec<WeeklyOrderBody>,
    pub total_revenue_potential: Decimal,
}

#[derive(Debug, Deserialize, Default)]
pub struct RequestListQuery {
    pub status: Option<String>,
}

/// Optional body for the manual decision endpoints.
#[derive(Debug, Deserialize, Default)]
pub struct DecisionBody {
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<Decimal>,
}

pub fn error_response(error: FinanceError) -> (StatusCode, Json<ErrorBody>) {
    let status = match &error {
        FinanceError::Validation(_) | FinanceError::BudgetExceeded { .. } => {
            StatusCode::BAD_REQUEST
        }
        FinanceError::NotFound(_) => StatusCode::NOT_FOUND,
        FinanceError::Conflict(_) => StatusCode::CONFLICT,
        FinanceError::Storage(_) | FinanceError::RemoteUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    if status == StatusCode::SERVICE_UNAVAILABLE {
        warn!(event_name = "finance.storage_error", error = %error, "request failed on storage");
    }

    let (threshold, cost) = match &error {
        FinanceError::BudgetExceeded { threshold, cost } => (Some(*threshold), Some(*cost)),
        _ => (None, None),
    };

    let body = ErrorBody { error: error.kind(), message: error.to_string(), threshold, cost };
    (status, Json(body))
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: FinanceState) -> Router {
    Router::new()
        .route("/orders-weekly", get(orders_weekly))
        .route("/purchase-request", post(submit_request))
        .route("/finance/requests", get(list_requests))
        .route("/finance/approve/{id}", post(approve_request))
        .route("/finance/reject/{id}", post(reject_request))
        .route("/finance/history", get(request_history))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn orders_weekly(
    State(state): State<FinanceState>,
) -> Result<Json<WeeklyOrdersResponse>, (StatusCode, Json<ErrorBody>)> {
    let repo = SqlWeeklyOrderRepository::new(state.db_pool.clone());

    // Every stored order ships with the all-rows total so the list and the
    // total always agree; week_number only labels the latest week.
    let week_number = repo.max_week().await.map_err(to_error)?;
    let orders = repo.list(None).await.map_err(to_error)?;
    let total_revenue_potential = repo.revenue_total(None).await.map_err(to_error)?;

    Ok(Json(WeeklyOrdersResponse {
        week_number,
        orders: orders.into_iter().map(WeeklyOrderBody::from).collect(),
        total_revenue_potential,
    }))
}

pub async fn submit_request(
    State(state): State<FinanceState>,
    Json(body): Json<SubmitRequestBody>,
) -> Result<(StatusCode, Json<PurchaseRequestBody>), (StatusCode, Json<ErrorBody>)> {
    let input = NewPurchaseRequest::new(body.item_name, body.quantity, body.estimated_cost)
        .map_err(error_response)?;

    let request = state.engine.submit(input).await.map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(request.into())))
}

pub async fn list_requests(
    State(state): State<FinanceState>,
    Query(query): Query<RequestListQuery>,
) -> Result<Json<Vec<PurchaseRequestBody>>, (StatusCode, Json<ErrorBody>)> {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(RequestStatus::parse(raw).ok_or_else(|| {
            error_response(FinanceError::validation(format!(
                "unknown status filter `{raw}` (expected pending|approved|rejected)"
            )))
        })?),
    };

    let requests = state.engine.list(status).await.map_err(error_response)?;
    Ok(Json(requests.into_iter().map(PurchaseRequestBody::from).collect()))
}

pub async fn approve_request(
    State(state): State<FinanceState>,
    Path(id): Path<i64>,
    body: Option<Json<DecisionBody>>,
) -> Result<Json<PurchaseRequestBody>, (StatusCode, Json<ErrorBody>)> {
    let notes = body.and_then(|Json(body)| body.notes);
    let request = state.engine.approve(id, notes).await.map_err(error_response)?;
    Ok(Json(request.into()))
}

pub async fn reject_request(
    State(state): State<FinanceState>,
    Path(id): Path<i64>,
    body: Option<Json<DecisionBody>>,
) -> Result<Json<PurchaseRequestBody>, (StatusCode, Json<ErrorBody>)> {
    let notes = body.and_then(|Json(body)| body.notes);
    let request = state.engine.reject(id, notes).await.map_err(error_response)?;
    Ok(Json(request.into()))
}

pub async fn request_history(
    State(state): State<FinanceState>,
) -> Result<Json<Vec<PurchaseRequestBody>>, (StatusCode, Json<ErrorBody>)> {
    let requests = state.engine.history().await.map_err(error_response)?;
    Ok(Json(requests.into_iter().map(PurchaseRequestBody::from).collect()))
}

fn to_error(error: indago_db::RepositoryError) -> (StatusCode, Json<ErrorBody>) {
    error_response(error.into())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::{Path, Query, State};
    use axum::http::StatusCode;
    use axum::Json;
    use rust_decimal::Decimal;

    use indago_core::config::ApprovalConfig;
    use indago_core::{NewWeeklyOrder, RequestStatus, SubmissionMode};
    use indago_db::{connect_with_settings, fixtures, migrations, SqlWeeklyOrderRepository};

    use super::{
        approve_request, list_requests, orders_weekly, reject_request, submit_request,
        DecisionBody, FinanceState, RequestListQuery, SubmitRequestBody,
    };
    use crate::engine::ApprovalEngine;

    async fn setup(mode: SubmissionMode) -> FinanceState {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        fixtures::seed_weekly_orders_if_empty(&pool).await.expect("seed");

        let policy = ApprovalConfig {
            submission_mode: mode,
            submission_ratio: Decimal::new(60, 2),
            manual_approval_ratio: Decimal::new(50, 2),
        };
        let engine = Arc::new(ApprovalEngine::new(pool.clone(), policy));
        FinanceState { db_pool: pool, engine }
    }

    fn body(cost: i64) -> SubmitRequestBody {
        SubmitRequestBody {
            item_name: "espresso machine".to_string(),
            quantity: Some(1),
            estimated_cost: Decimal::from(cost),
        }
    }

    #[tokio::test]
    async fn orders_weekly_reports_seeded_revenue() {
        let state = setup(SubmissionMode::AutoDecide).await;

        let Json(response) = orders_weekly(State(state)).await.expect("ok");
        assert_eq!(response.week_number, Some(42));
        assert_eq!(response.orders.len(), 2);
        assert_eq!(response.total_revenue_potential, Decimal::from(1_625_000));
    }

    #[tokio::test]
    async fn orders_weekly_lists_older_weeks_alongside_the_total() {
        let state = setup(SubmissionMode::AutoDecide).await;

        let orders = SqlWeeklyOrderRepository::new(state.db_pool.clone());
        orders
            .insert(&NewWeeklyOrder {
                customer_name: "Catering (Week 41)".to_string(),
                order_description: "Cold Brew Kegs (4)".to_string(),
                week_number: 41,
                total_value: Decimal::from(1_000_000),
            })
            .await
            .expect("insert");

        // The week-41 row stays in the list so it matches the all-rows total.
        let Json(response) = orders_weekly(State(state)).await.expect("ok");
        assert_eq!(response.week_number, Some(42));
        assert_eq!(response.orders.len(), 3);
        assert_eq!(response.total_revenue_potential, Decimal::from(2_625_000));
    }

    #[test]
    fn legacy_snake_case_submit_body_deserializes() {
        let legacy: SubmitRequestBody = serde_json::from_str(
            r#"{"item_name": "burr grinder", "quantity": 2, "cost": 250000}"#,
        )
        .expect("legacy body");
        assert_eq!(legacy.item_name, "burr grinder");
        assert_eq!(legacy.quantity, Some(2));
        assert_eq!(legacy.estimated_cost, Decimal::from(250_000));
    }

    #[tokio::test]
    async fn submission_returns_created_with_the_decision() {
        let state = setup(SubmissionMode::AutoDecide).await;

        let (status, Json(request)) =
            submit_request(State(state), Json(body(900_000))).await.expect("ok");
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(request.status, RequestStatus::Approved);
    }

    #[tokio::test]
    async fn blank_item_name_is_a_validation_error() {
        let state = setup(SubmissionMode::AutoDecide).await;

        let mut invalid = body(100);
        invalid.item_name = "   ".to_string();
        let (status, Json(error)) =
            submit_request(State(state), Json(invalid)).await.expect_err("should fail");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.error, "validation_error");
    }

    #[tokio::test]
    async fn status_filter_is_parsed_case_insensitively() {
        let state = setup(SubmissionMode::AutoDecide).await;
        submit_request(State(state.clone()), Json(body(100))).await.expect("submit");

        let Json(approved) = list_requests(
            State(state.clone()),
            Query(RequestListQuery { status: Some("APPROVED".to_string()) }),
        )
        .await
        .expect("ok");
        assert_eq!(approved.len(), 1);

        let (status, Json(error)) = list_requests(
            State(state),
            Query(RequestListQuery { status: Some("escalated".to_string()) }),
        )
        .await
        .expect_err("unknown filter");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.error, "validation_error");
    }

    #[tokio::test]
    async fn manual_approval_over_budget_carries_threshold_and_cost() {
        let state = setup(SubmissionMode::Deferred).await;

        let (_, Json(pending)) =
            submit_request(State(state.clone()), Json(body(900_000))).await.expect("submit");

        let (status, Json(error)) =
            approve_request(State(state), Path(pending.id), None).await.expect_err("over budget");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.error, "budget_exceeded");
        assert_eq!(error.threshold, Some(Decimal::new(81_250_000, 2)));
        assert_eq!(error.cost, Some(Decimal::from(900_000)));
    }

    #[tokio::test]
    async fn approving_twice_conflicts() {
        let state = setup(SubmissionMode::Deferred).await;

        let (_, Json(pending)) =
            submit_request(State(state.clone()), Json(body(100))).await.expect("submit");
        approve_request(State(state.clone()), Path(pending.id), None).await.expect("first approve");

        let (status, Json(error)) =
            approve_request(State(state), Path(pending.id), None).await.expect_err("second approve");
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(error.error, "conflict");
    }

    #[tokio::test]
    async fn provided_decision_notes_are_recorded() {
        let state = setup(SubmissionMode::Deferred).await;

        let (_, Json(pending)) =
            submit_request(State(state.clone()), Json(body(100))).await.expect("submit");

        let Json(rejected) = reject_request(
            State(state),
            Path(pending.id),
            Some(Json(DecisionBody { notes: Some("supplier discontinued".to_string()) })),
        )
        .await
        .expect("ok");
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(rejected.notes.as_deref(), Some("supplier discontinued"));
    }

    #[tokio::test]
    async fn approving_unknown_request_is_not_found() {
        let state = setup(SubmissionMode::Deferred).await;

        let (status, Json(error)) =
            approve_request(State(state), Path(404), None).await.expect_err("unknown id");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(error.error, "not_found");
    }
}
