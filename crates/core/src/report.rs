use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time financial summary over the ledger tables. Built fresh on
/// every call; a failing remote sales fetch yields a degraded report instead
/// of an error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub counts: ReportCounts,
    pub raw_material_logs: Vec<RawMaterialEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_report: Option<serde_json::Value>,
    pub degraded: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCounts {
    pub payment_settlements: i64,
    pub procurement_logs: i64,
    pub supplier_payments: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMaterialEntry {
    pub sku: String,
    pub qty_consumed: i64,
    pub batch_id: String,
    pub timestamp: DateTime<Utc>,
}
