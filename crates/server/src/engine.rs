//! Budget-gated approval engine.
//!
//! Every decision reads a revenue snapshot and applies the configured budget
//! ratio to it. Decisions are serialized behind a single async critical
//! section so two concurrent deciders never evaluate against snapshots taken
//! either side of each other's write; the storage layer additionally enforces
//! at most one transition away from pending per request id.

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;

use indago_core::config::ApprovalConfig;
use indago_core::{
    BudgetRule, FinanceError, NewPurchaseRequest, PurchaseRequest, RequestStatus, SubmissionMode,
};
use indago_db::{DbPool, SqlPurchaseRequestRepository, SqlWeeklyOrderRepository};

pub struct ApprovalEngine {
    requests: SqlPurchaseRequestRepository,
    orders: SqlWeeklyOrderRepository,
    policy: ApprovalConfig,
    decision_gate: Mutex<()>,
}

impl ApprovalEngine {
    pub fn new(pool: DbPool, policy: ApprovalConfig) -> Self {
        Self {
            requests: SqlPurchaseRequestRepository::new(pool.clone()),
            orders: SqlWeeklyOrderRepository::new(pool),
            policy,
            decision_gate: Mutex::new(()),
        }
    }

    /// Submits a purchase request. In auto-decide mode the budget rule runs
    /// synchronously and the request lands already decided; in deferred mode
    /// it lands pending for the manual endpoints.
    pub async fn submit(
        &self,
        input: NewPurchaseRequest,
    ) -> Result<PurchaseRequest, FinanceError> {
        match self.policy.submission_mode {
            SubmissionMode::Deferred => {
                let request = self
                    .requests
                    .insert(&input, RequestStatus::Pending, Utc::now(), None, None)
                    .await?;
                info!(
                    event_name = "approval.submitted",
                    request_id = request.id,
                    status = request.status.as_str(),
                    "purchase request submitted"
                );
                Ok(request)
            }
            SubmissionMode::AutoDecide => {
                let _gate = self.decision_gate.lock().await;

                let revenue = self.orders.revenue_total(None).await?;
                let evaluation =
                    BudgetRule::new(self.policy.submission_ratio).evaluate(input.estimated_cost, revenue);
                let status = if evaluation.approved {
                    RequestStatus::Approved
                } else {
                    RequestStatus::Rejected
                };
                let now = Utc::now();
                let notes = evaluation.rationale();

                let request = self
                    .requests
                    .insert(&input, status, now, Some(now), Some(&notes))
                    .await?;
                info!(
                    event_name = "approval.decided",
                    request_id = request.id,
                    status = request.status.as_str(),
                    cost = %evaluation.cost,
                    threshold = %evaluation.threshold,
                    "purchase request decided at submission"
                );
                Ok(request)
            }
        }
    }

    /// Manually approves a pending request, re-checking the budget rule at
    /// the manual ratio. A cost over the manual threshold blocks the approval
    /// without mutating the request.
    pub async fn approve(
        &self,
        id: i64,
        notes: Option<String>,
    ) -> Result<PurchaseRequest, FinanceError> {
        let _gate = self.decision_gate.lock().await;

        let request = self.require_pending(id).await?;
        let revenue = self.orders.revenue_total(None).await?;
        let evaluation = BudgetRule::new(self.policy.manual_approval_ratio)
            .evaluate(request.estimated_cost, revenue);

        if !evaluation.approved {
            return Err(FinanceError::BudgetExceeded {
                threshold: evaluation.threshold,
                cost: evaluation.cost,
            });
        }

        let notes = notes.unwrap_or_else(|| {
            format!(
                "manually approved: cost {} within budget threshold {} (ratio {} of revenue {})",
                evaluation.cost, evaluation.threshold, evaluation.ratio, evaluation.revenue
            )
        });
        self.finish_decision(id, RequestStatus::Approved, &notes).await
    }

    /// Manually rejects a pending request. Rejection is always within budget.
    pub async fn reject(
        &self,
        id: i64,
        notes: Option<String>,
    ) -> Result<PurchaseRequest, FinanceError> {
        let _gate = self.decision_gate.lock().await;

        self.require_pending(id).await?;
        let notes = notes.unwrap_or_else(|| "manually rejected".to_string());
        self.finish_decision(id, RequestStatus::Rejected, &notes).await
    }

    pub async fn list(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<PurchaseRequest>, FinanceError> {
        Ok(self.requests.list(status).await?)
    }

    /// Full decision trail, newest first.
    pub async fn history(&self) -> Result<Vec<PurchaseRequest>, FinanceError> {
        Ok(self.requests.list(None).await?)
    }

    async fn require_pending(&self, id: i64) -> Result<PurchaseRequest, FinanceError> {
        let request = self
            .requests
            .find_by_id(id)
            .await?
            .ok_or_else(|| FinanceError::NotFound(format!("purchase request {id}")))?;

        if request.status.is_terminal() {
            return Err(FinanceError::Conflict(format!(
                "purchase request {id} is already {}",
                request.status.as_str()
            )));
        }
        Ok(request)
    }

    async fn finish_decision(
        &self,
        id: i64,
        status: RequestStatus,
        notes: &str,
    ) -> Result<PurchaseRequest, FinanceError> {
        let decided = self
            .requests
            .record_decision(id, status, Utc::now(), notes)
            .await?
            // The pending check above passed, so an empty update means a
            // concurrent decider won the race.
            .ok_or_else(|| {
                FinanceError::Conflict(format!("purchase request {id} was decided concurrently"))
            })?;

        info!(
            event_name = "approval.decided",
            request_id = decided.id,
            status = decided.status.as_str(),
            "purchase request decided manually"
        );
        Ok(decided)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use indago_core::config::ApprovalConfig;
    use indago_core::{FinanceError, NewPurchaseRequest, RequestStatus, SubmissionMode};
    use indago_db::{connect_with_settings, fixtures, migrations, DbPool};

    use super::ApprovalEngine;

    async fn setup_pool(seed: bool) -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        if seed {
            fixtures::seed_weekly_orders_if_empty(&pool).await.expect("seed");
        }
        pool
    }

    fn auto_policy() -> ApprovalConfig {
        ApprovalConfig {
            submission_mode: SubmissionMode::AutoDecide,
            submission_ratio: Decimal::new(60, 2),
            manual_approval_ratio: Decimal::new(50, 2),
        }
    }

    fn deferred_policy() -> ApprovalConfig {
        ApprovalConfig { submission_mode: SubmissionMode::Deferred, ..auto_policy() }
    }

    fn input(cost: i64) -> NewPurchaseRequest {
        NewPurchaseRequest::new("espresso machine", Some(1), Decimal::from(cost)).expect("input")
    }

    #[tokio::test]
    async fn submission_approves_within_sixty_percent_of_revenue() {
        // Seeded revenue is 1,625,000, so the submission ceiling is 975,000.
        let engine = ApprovalEngine::new(setup_pool(true).await, auto_policy());

        let approved = engine.submit(input(900_000)).await.expect("submit");
        assert_eq!(approved.status, RequestStatus::Approved);
        assert!(approved.decision_date.is_some());
        let notes = approved.notes.expect("notes");
        assert!(notes.contains("900000"));
        assert!(notes.contains("1625000"));
    }

    #[tokio::test]
    async fn submission_rejects_over_the_ceiling_with_numeric_rationale() {
        let engine = ApprovalEngine::new(setup_pool(true).await, auto_policy());

        let rejected = engine.submit(input(1_000_000)).await.expect("submit");
        assert_eq!(rejected.status, RequestStatus::Rejected);
        let notes = rejected.notes.expect("notes");
        assert!(notes.contains("1000000"));
        assert!(notes.contains("1625000"));
    }

    #[tokio::test]
    async fn empty_revenue_ledger_rejects_any_positive_cost() {
        let engine = ApprovalEngine::new(setup_pool(false).await, auto_policy());

        let rejected = engine.submit(input(1)).await.expect("submit");
        assert_eq!(rejected.status, RequestStatus::Rejected);
    }

    #[tokio::test]
    async fn deferred_mode_leaves_the_request_pending() {
        let engine = ApprovalEngine::new(setup_pool(true).await, deferred_policy());

        let pending = engine.submit(input(900_000)).await.expect("submit");
        assert_eq!(pending.status, RequestStatus::Pending);
        assert!(pending.decision_date.is_none());
        assert!(pending.notes.is_none());
    }

    #[tokio::test]
    async fn manual_approve_applies_the_stricter_fifty_percent_ratio() {
        // Manual ceiling is 812,500 on the seeded revenue.
        let engine = ApprovalEngine::new(setup_pool(true).await, deferred_policy());

        let pending = engine.submit(input(800_000)).await.expect("submit");
        let approved = engine.approve(pending.id, None).await.expect("approve");
        assert_eq!(approved.status, RequestStatus::Approved);
        assert!(approved.notes.expect("notes").starts_with("manually approved"));
    }

    #[tokio::test]
    async fn manual_approve_over_threshold_blocks_without_mutation() {
        let engine = ApprovalEngine::new(setup_pool(true).await, deferred_policy());

        let pending = engine.submit(input(900_000)).await.expect("submit");
        let error = engine.approve(pending.id, None).await.expect_err("should block");
        assert!(matches!(error, FinanceError::BudgetExceeded { .. }));

        // The blocked request stays pending and can still be rejected.
        let requests = engine.list(Some(RequestStatus::Pending)).await.expect("list");
        assert_eq!(requests.len(), 1);
        let rejected = engine.reject(pending.id, None).await.expect("reject");
        assert_eq!(rejected.status, RequestStatus::Rejected);
    }

    #[tokio::test]
    async fn second_decision_on_a_decided_request_conflicts() {
        let engine = ApprovalEngine::new(setup_pool(true).await, deferred_policy());

        let pending = engine.submit(input(100)).await.expect("submit");
        engine.approve(pending.id, None).await.expect("approve");

        let error = engine.reject(pending.id, None).await.expect_err("already decided");
        assert!(matches!(error, FinanceError::Conflict(_)));
        let error = engine.approve(pending.id, None).await.expect_err("already decided");
        assert!(matches!(error, FinanceError::Conflict(_)));
    }

    #[tokio::test]
    async fn deciding_an_unknown_request_is_not_found() {
        let engine = ApprovalEngine::new(setup_pool(true).await, deferred_policy());

        let error = engine.approve(999, None).await.expect_err("unknown id");
        assert!(matches!(error, FinanceError::NotFound(_)));
        let error = engine.reject(999, None).await.expect_err("unknown id");
        assert!(matches!(error, FinanceError::NotFound(_)));
    }

    #[tokio::test]
    async fn history_returns_every_request_newest_first() {
        let engine = ApprovalEngine::new(setup_pool(true).await, auto_policy());

        engine.submit(input(100)).await.expect("submit");
        engine.submit(input(2_000_000)).await.expect("submit");

        let history = engine.history().await.expect("history");
        assert_eq!(history.len(), 2);
        assert!(history[0].id > history[1].id);
    }
}
