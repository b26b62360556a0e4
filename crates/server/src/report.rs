//! Financial summary report.
//!
//! `GET /generateFinanceReport` reads the ledger tables fresh on every call
//! and merges the remote sales section when one is configured. A failing
//! remote fetch degrades the report instead of failing it.

use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use tracing::warn;

use indago_core::config::SalesConfig;
use indago_core::{FinanceError, RawMaterialEntry, Report};
use indago_db::{DbPool, SqlLedgerRepository};

use crate::finance::{error_response, ErrorBody};

/// Client for the remote Sales subsystem's report endpoint. An absent URL
/// means the collaborator is disabled, not unavailable.
pub struct SalesReportClient {
    client: Client,
    report_url: Option<String>,
}

impl SalesReportClient {
    pub fn new(config: &SalesConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { client, report_url: config.report_url.clone() }
    }

    /// `Ok(None)` when no remote is configured; `Err` when the configured
    /// remote could not produce a report.
    pub async fn fetch(&self) -> Result<Option<Value>, FinanceError> {
        let Some(url) = &self.report_url else {
            return Ok(None);
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FinanceError::RemoteUnavailable(e.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|e| FinanceError::RemoteUnavailable(e.to_string()))?;
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| FinanceError::RemoteUnavailable(e.to_string()))?;

        Ok(Some(body))
    }
}

#[derive(Clone)]
pub struct ReportState {
    pub db_pool: DbPool,
    pub sales: std::sync::Arc<SalesReportClient>,
}

pub fn router(state: ReportState) -> Router {
    Router::new().route("/generateFinanceReport", get(generate_report)).with_state(state)
}

pub async fn generate_report(
    State(state): State<ReportState>,
) -> Result<Json<Report>, (StatusCode, Json<ErrorBody>)> {
    let repo = SqlLedgerRepository::new(state.db_pool.clone());

    let counts = repo.counts().await.map_err(|e| error_response(e.into()))?;
    let raw_material_logs = repo
        .list_raw_material_logs()
        .await
        .map_err(|e| error_response(e.into()))?
        .into_iter()
        .map(|stored| RawMaterialEntry {
            sku: stored.record.sku,
            qty_consumed: stored.record.qty_consumed,
            batch_id: stored.record.batch_id,
            timestamp: stored.record.recorded_at,
        })
        .collect();

    let (sales_report, degraded) = match state.sales.fetch().await {
        Ok(section) => (section, false),
        Err(error) => {
            warn!(
                event_name = "report.sales_unavailable",
                error = %error,
                "sales report fetch failed, returning degraded report"
            );
            (None, true)
        }
    };

    Ok(Json(Report {
        generated_at: Utc::now(),
        counts,
        raw_material_logs,
        sales_report,
        degraded,
    }))
}
