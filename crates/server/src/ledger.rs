//! Ledger intake routes for the collaborating subsystems.
//!
//! - `POST /receivePaymentGateway` — gateway settlement notification
//! - `POST /createPaymentInvoice`  — issue a supplier invoice
//! - `POST /recordProcurement`     — procurement event from inventory
//! - `POST /paySupplier`           — outbound supplier payment
//! - `GET  /getRawMaterialLog`     — raw-material consumption entries
//!
//! Each append validates the record, writes exactly one row, and replies 201
//! with the acknowledgement body the collaborators expect.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use indago_core::{
    Invoice, PaymentSettlement, ProcurementLog, RawMaterialEntry, SupplierPayment,
};
use indago_db::{DbPool, SqlLedgerRepository};

use crate::finance::{error_response, ErrorBody};

#[derive(Clone)]
pub struct LedgerState {
    pub db_pool: DbPool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementBody {
    pub transaction_id: String,
    #[serde(default)]
    pub orders: Vec<String>,
    pub amount: Decimal,
    pub method: String,
    pub settled_at: String,
    pub reference: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceBody {
    pub supplier_id: String,
    #[serde(default)]
    pub details: Vec<Value>,
    pub total_amount: Decimal,
    pub due_date: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcurementBody {
    pub procurement_id: String,
    pub supplier_id: String,
    #[serde(default)]
    pub items: Vec<Value>,
    pub total_cost: Decimal,
    /// Event time reported by the inventory subsystem; recorded-at falls back
    /// to the ingest time when absent.
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierPaymentBody {
    pub supplier_id: String,
    pub procurement_id: String,
    pub amount: Decimal,
    pub reference: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgement {
    pub status: &'static str,
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
}

pub fn router(state: LedgerState) -> Router {
    Router::new()
        .route("/receivePaymentGateway", post(receive_payment_gateway))
        .route("/createPaymentInvoice", post(create_payment_invoice))
        .route("/recordProcurement", post(record_procurement))
        .route("/paySupplier", post(pay_supplier))
        .route("/getRawMaterialLog", get(raw_material_log))
        .with_state(state)
}

pub async fn receive_payment_gateway(
    State(state): State<LedgerState>,
    Json(body): Json<SettlementBody>,
) -> Result<(StatusCode, Json<Acknowledgement>), (StatusCode, Json<ErrorBody>)> {
    let record = PaymentSettlement {
        transaction_id: body.transaction_id,
        orders: body.orders,
        amount: body.amount,
        method: body.method,
        settled_at: body.settled_at,
        reference: body.reference,
        recorded_at: Utc::now(),
    };
    record.validate().map_err(error_response)?;

    let repo = SqlLedgerRepository::new(state.db_pool.clone());
    let stored = repo.append_payment_settlement(&record).await.map_err(|e| error_response(e.into()))?;

    info!(
        event_name = "ledger.settlement_received",
        ledger_id = stored.id,
        transaction_id = %stored.record.transaction_id,
        "payment settlement recorded"
    );
    Ok((
        StatusCode::CREATED,
        Json(Acknowledgement { status: "RECEIVED", id: stored.id, invoice_id: None }),
    ))
}

pub async fn create_payment_invoice(
    State(state): State<LedgerState>,
    Json(body): Json<InvoiceBody>,
) -> Result<(StatusCode, Json<Acknowledgement>), (StatusCode, Json<ErrorBody>)> {
    let record = Invoice {
        invoice_id: format!("INV-{}", Utc::now().timestamp()),
        supplier_id: body.supplier_id,
        details: body.details,
        total_amount: body.total_amount,
        due_date: body.due_date,
        created_at: Utc::now(),
    };
    record.validate().map_err(error_response)?;

    let repo = SqlLedgerRepository::new(state.db_pool.clone());
    let stored = repo.append_invoice(&record).await.map_err(|e| error_response(e.into()))?;

    info!(
        event_name = "ledger.invoice_created",
        ledger_id = stored.id,
        invoice_id = %stored.record.invoice_id,
        "invoice recorded"
    );
    Ok((
        StatusCode::CREATED,
        Json(Acknowledgement {
            status: "RECORDED",
            id: stored.id,
            invoice_id: Some(stored.record.invoice_id),
        }),
    ))
}

pub async fn record_procurement(
    State(state): State<LedgerState>,
    Json(body): Json<ProcurementBody>,
) -> Result<(StatusCode, Json<Acknowledgement>), (StatusCode, Json<ErrorBody>)> {
    let record = ProcurementLog {
        procurement_id: body.procurement_id,
        supplier_id: body.supplier_id,
        items: body.items,
        total_cost: body.total_cost,
        recorded_at: body.timestamp.unwrap_or_else(Utc::now),
    };
    record.validate().map_err(error_response)?;

    let repo = SqlLedgerRepository::new(state.db_pool.clone());
    let stored = repo.append_procurement_log(&record).await.map_err(|e| error_response(e.into()))?;

    info!(
        event_name = "ledger.procurement_recorded",
        ledger_id = stored.id,
        procurement_id = %stored.record.procurement_id,
        "procurement recorded"
    );
    Ok((
        StatusCode::CREATED,
        Json(Acknowledgement { status: "RECORDED", id: stored.id, invoice_id: None }),
    ))
}

pub async fn pay_supplier(
    State(state): State<LedgerState>,
    Json(body): Json<SupplierPaymentBody>,
) -> Result<(StatusCode, Json<Acknowledgement>), (StatusCode, Json<ErrorBody>)> {
    let record = SupplierPayment {
        supplier_id: body.supplier_id,
        procurement_id: body.procurement_id,
        amount: body.amount,
        reference: body.reference,
        paid_at: Utc::now(),
    };
    record.validate().map_err(error_response)?;

    let repo = SqlLedgerRepository::new(state.db_pool.clone());
    let stored = repo.append_supplier_payment(&record).await.map_err(|e| error_response(e.into()))?;

    info!(
        event_name = "ledger.supplier_paid",
        ledger_id = stored.id,
        supplier_id = %stored.record.supplier_id,
        "supplier payment recorded"
    );
    Ok((
        StatusCode::CREATED,
        Json(Acknowledgement { status: "PAID", id: stored.id, invoice_id: None }),
    ))
}

pub async fn raw_material_log(
    State(state): State<LedgerState>,
) -> Result<Json<Vec<RawMaterialEntry>>, (StatusCode, Json<ErrorBody>)> {
    let repo = SqlLedgerRepository::new(state.db_pool.clone());
    let logs = repo.list_raw_material_logs().await.map_err(|e| error_response(e.into()))?;

    let entries = logs
        .into_iter()
        .map(|stored| RawMaterialEntry {
            sku: stored.record.sku,
            qty_consumed: stored.record.qty_consumed,
            batch_id: stored.record.batch_id,
            timestamp: stored.record.recorded_at,
        })
        .collect();
    Ok(Json(entries))
}
