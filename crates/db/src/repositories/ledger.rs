//! Append-only ledger store. Every writer issues a single INSERT; there are
//! no UPDATE or DELETE statements in this module, so appended rows are
//! immutable and ids grow monotonically per kind.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::Row;

use indago_core::{
    Invoice, PaymentSettlement, ProcurementLog, RawMaterialLog, ReportCounts, Stored,
    SupplierPayment,
};

use super::RepositoryError;
use crate::DbPool;

pub struct SqlLedgerRepository {
    pool: DbPool,
}

impl SqlLedgerRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn append_payment_settlement(
        &self,
        record: &PaymentSettlement,
    ) -> Result<Stored<PaymentSettlement>, RepositoryError> {
        let orders_json = to_json("orders", &record.orders)?;
        let result = sqlx::query(
            "INSERT INTO payment_gateway_log
                (transaction_id, orders_json, amount, method, settled_at, reference, recorded_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.transaction_id)
        .bind(orders_json)
        .bind(record.amount.to_string())
        .bind(&record.method)
        .bind(&record.settled_at)
        .bind(&record.reference)
        .bind(record.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Stored { id: result.last_insert_rowid(), record: record.clone() })
    }

    pub async fn list_payment_settlements(
        &self,
    ) -> Result<Vec<Stored<PaymentSettlement>>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, transaction_id, orders_json, amount, method, settled_at, reference,
                    recorded_at
             FROM payment_gateway_log ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id = get_i64(row, "id")?;
                Ok(Stored {
                    id,
                    record: PaymentSettlement {
                        transaction_id: get_string(row, "transaction_id")?,
                        orders: from_json(row, "orders_json")?,
                        amount: get_decimal(row, "amount")?,
                        method: get_string(row, "method")?,
                        settled_at: get_string(row, "settled_at")?,
                        reference: get_string(row, "reference")?,
                        recorded_at: get_timestamp(row, "recorded_at")?,
                    },
                })
            })
            .collect()
    }

    pub async fn append_invoice(
        &self,
        record: &Invoice,
    ) -> Result<Stored<Invoice>, RepositoryError> {
        let details_json = to_json("details", &record.details)?;
        let result = sqlx::query(
            "INSERT INTO invoice
                (invoice_id, supplier_id, details_json, total_amount, due_date, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.invoice_id)
        .bind(&record.supplier_id)
        .bind(details_json)
        .bind(record.total_amount.to_string())
        .bind(&record.due_date)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Stored { id: result.last_insert_rowid(), record: record.clone() })
    }

    pub async fn list_invoices(&self) -> Result<Vec<Stored<Invoice>>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, invoice_id, supplier_id, details_json, total_amount, due_date, created_at
             FROM invoice ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id = get_i64(row, "id")?;
                Ok(Stored {
                    id,
                    record: Invoice {
                        invoice_id: get_string(row, "invoice_id")?,
                        supplier_id: get_string(row, "supplier_id")?,
                        details: from_json(row, "details_json")?,
                        total_amount: get_decimal(row, "total_amount")?,
                        due_date: get_string(row, "due_date")?,
                        created_at: get_timestamp(row, "created_at")?,
                    },
                })
            })
            .collect()
    }

    pub async fn append_procurement_log(
        &self,
        record: &ProcurementLog,
    ) -> Result<Stored<ProcurementLog>, RepositoryError> {
        let items_json = to_json("items", &record.items)?;
        let result = sqlx::query(
            "INSERT INTO procurement_log
                (procurement_id, supplier_id, items_json, total_cost, recorded_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&record.procurement_id)
        .bind(&record.supplier_id)
        .bind(items_json)
        .bind(record.total_cost.to_string())
        .bind(record.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Stored { id: result.last_insert_rowid(), record: record.clone() })
    }

    pub async fn list_procurement_logs(
        &self,
    ) -> Result<Vec<Stored<ProcurementLog>>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, procurement_id, supplier_id, items_json, total_cost, recorded_at
             FROM procurement_log ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id = get_i64(row, "id")?;
                Ok(Stored {
                    id,
                    record: ProcurementLog {
                        procurement_id: get_string(row, "procurement_id")?,
                        supplier_id: get_string(row, "supplier_id")?,
                        items: from_json(row, "items_json")?,
                        total_cost: get_decimal(row, "total_cost")?,
                        recorded_at: get_timestamp(row, "recorded_at")?,
                    },
                })
            })
            .collect()
    }

    pub async fn append_supplier_payment(
        &self,
        record: &SupplierPayment,
    ) -> Result<Stored<SupplierPayment>, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO supplier_payment
                (supplier_id, procurement_id, amount, reference, paid_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&record.supplier_id)
        .bind(&record.procurement_id)
        .bind(record.amount.to_string())
        .bind(&record.reference)
        .bind(record.paid_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Stored { id: result.last_insert_rowid(), record: record.clone() })
    }

    pub async fn list_supplier_payments(
        &self,
    ) -> Result<Vec<Stored<SupplierPayment>>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, supplier_id, procurement_id, amount, reference, paid_at
             FROM supplier_payment ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id = get_i64(row, "id")?;
                Ok(Stored {
                    id,
                    record: SupplierPayment {
                        supplier_id: get_string(row, "supplier_id")?,
                        procurement_id: get_string(row, "procurement_id")?,
                        amount: get_decimal(row, "amount")?,
                        reference: get_string(row, "reference")?,
                        paid_at: get_timestamp(row, "paid_at")?,
                    },
                })
            })
            .collect()
    }

    pub async fn append_raw_material_log(
        &self,
        record: &RawMaterialLog,
    ) -> Result<Stored<RawMaterialLog>, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO raw_material_log (sku, qty_consumed, batch_id, recorded_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&record.sku)
        .bind(record.qty_consumed)
        .bind(&record.batch_id)
        .bind(record.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(Stored { id: result.last_insert_rowid(), record: record.clone() })
    }

    pub async fn list_raw_material_logs(
        &self,
    ) -> Result<Vec<Stored<RawMaterialLog>>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, sku, qty_consumed, batch_id, recorded_at
             FROM raw_material_log ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let id = get_i64(row, "id")?;
                Ok(Stored {
                    id,
                    record: RawMaterialLog {
                        sku: get_string(row, "sku")?,
                        qty_consumed: get_i64(row, "qty_consumed")?,
                        batch_id: get_string(row, "batch_id")?,
                        recorded_at: get_timestamp(row, "recorded_at")?,
                    },
                })
            })
            .collect()
    }

    pub async fn counts(&self) -> Result<ReportCounts, RepositoryError> {
        let payment_settlements: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM payment_gateway_log")
                .fetch_one(&self.pool)
                .await?;
        let procurement_logs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM procurement_log")
            .fetch_one(&self.pool)
            .await?;
        let supplier_payments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM supplier_payment")
            .fetch_one(&self.pool)
            .await?;

        Ok(ReportCounts { payment_settlements, procurement_logs, supplier_payments })
    }
}

fn to_json<T: serde::Serialize>(field: &str, value: &T) -> Result<String, RepositoryError> {
    serde_json::to_string(value)
        .map_err(|e| RepositoryError::Decode(format!("serialize {field}: {e}")))
}

fn from_json<T: serde::de::DeserializeOwned>(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<T, RepositoryError> {
    let raw: String = row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))?;
    serde_json::from_str(&raw)
        .map_err(|e| RepositoryError::Decode(format!("{column} `{raw}`: {e}")))
}

fn get_string(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<String, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn get_i64(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<i64, RepositoryError> {
    row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))
}

fn get_decimal(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<Decimal, RepositoryError> {
    let raw: String = row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))?;
    raw.parse::<Decimal>()
        .map_err(|e| RepositoryError::Decode(format!("{column} `{raw}`: {e}")))
}

fn get_timestamp(
    row: &sqlx::sqlite::SqliteRow,
    column: &str,
) -> Result<DateTime<Utc>, RepositoryError> {
    let raw: String = row.try_get(column).map_err(|e| RepositoryError::Decode(e.to_string()))?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("{column} `{raw}`: {e}")))
}
