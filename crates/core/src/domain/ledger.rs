//! Append-only ledger record kinds.
//!
//! Once appended a ledger row is never updated or deleted; the store assigns
//! each kind its own monotonically increasing id sequence. List-valued fields
//! are structured values serialized into JSON payload columns, not
//! concatenated text.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::FinanceError;

/// A ledger row as returned by the store: the appended record plus the id the
/// store assigned to it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stored<T> {
    pub id: i64,
    #[serde(flatten)]
    pub record: T,
}

/// Settlement pushed by the payment gateway.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentSettlement {
    pub transaction_id: String,
    pub orders: Vec<String>,
    pub amount: Decimal,
    pub method: String,
    /// Settlement instant as reported by the gateway, kept verbatim.
    pub settled_at: String,
    pub reference: String,
    pub recorded_at: DateTime<Utc>,
}

impl PaymentSettlement {
    pub fn validate(&self) -> Result<(), FinanceError> {
        if self.transaction_id.trim().is_empty() {
            return Err(FinanceError::validation("transactionId must not be empty"));
        }
        if self.amount < Decimal::ZERO {
            return Err(FinanceError::validation("amount must not be negative"));
        }
        Ok(())
    }
}

/// Invoice issued by finance towards a supplier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: String,
    pub supplier_id: String,
    pub details: Vec<serde_json::Value>,
    pub total_amount: Decimal,
    pub due_date: String,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    pub fn validate(&self) -> Result<(), FinanceError> {
        if self.invoice_id.trim().is_empty() {
            return Err(FinanceError::validation("invoice_id must not be empty"));
        }
        if self.supplier_id.trim().is_empty() {
            return Err(FinanceError::validation("supplierId must not be empty"));
        }
        if self.total_amount < Decimal::ZERO {
            return Err(FinanceError::validation("totalAmount must not be negative"));
        }
        Ok(())
    }
}

/// Procurement event reported by the inventory subsystem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcurementLog {
    pub procurement_id: String,
    pub supplier_id: String,
    pub items: Vec<serde_json::Value>,
    pub total_cost: Decimal,
    pub recorded_at: DateTime<Utc>,
}

impl ProcurementLog {
    pub fn validate(&self) -> Result<(), FinanceError> {
        if self.procurement_id.trim().is_empty() {
            return Err(FinanceError::validation("procurementId must not be empty"));
        }
        if self.supplier_id.trim().is_empty() {
            return Err(FinanceError::validation("supplierId must not be empty"));
        }
        if self.total_cost < Decimal::ZERO {
            return Err(FinanceError::validation("totalCost must not be negative"));
        }
        Ok(())
    }
}

/// Outbound payment to a supplier, referencing a procurement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SupplierPayment {
    pub supplier_id: String,
    pub procurement_id: String,
    pub amount: Decimal,
    pub reference: String,
    pub paid_at: DateTime<Utc>,
}

impl SupplierPayment {
    pub fn validate(&self) -> Result<(), FinanceError> {
        if self.supplier_id.trim().is_empty() {
            return Err(FinanceError::validation("supplierId must not be empty"));
        }
        if self.procurement_id.trim().is_empty() {
            return Err(FinanceError::validation("procurementId must not be empty"));
        }
        if self.amount < Decimal::ZERO {
            return Err(FinanceError::validation("amount must not be negative"));
        }
        Ok(())
    }
}

/// Raw-material consumption reported by the kitchen subsystem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawMaterialLog {
    pub sku: String,
    pub qty_consumed: i64,
    pub batch_id: String,
    pub recorded_at: DateTime<Utc>,
}

impl RawMaterialLog {
    pub fn validate(&self) -> Result<(), FinanceError> {
        if self.sku.trim().is_empty() {
            return Err(FinanceError::validation("sku must not be empty"));
        }
        if self.batch_id.trim().is_empty() {
            return Err(FinanceError::validation("batch_id must not be empty"));
        }
        if self.qty_consumed < 0 {
            return Err(FinanceError::validation("qty_consumed must not be negative"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{PaymentSettlement, SupplierPayment};

    #[test]
    fn settlement_requires_transaction_id() {
        let settlement = PaymentSettlement {
            transaction_id: "  ".to_string(),
            orders: vec!["ORD-1".to_string()],
            amount: Decimal::from(50_000),
            method: "va_transfer".to_string(),
            settled_at: "2026-08-20T10:00:00Z".to_string(),
            reference: "SETTLE-77".to_string(),
            recorded_at: Utc::now(),
        };

        let error = settlement.validate().expect_err("blank transaction id should fail");
        assert_eq!(error.kind(), "validation_error");
    }

    #[test]
    fn supplier_payment_rejects_negative_amount() {
        let payment = SupplierPayment {
            supplier_id: "SUP-1".to_string(),
            procurement_id: "PROC-1".to_string(),
            amount: Decimal::from(-5),
            reference: "TRX-9".to_string(),
            paid_at: Utc::now(),
        };

        assert!(payment.validate().is_err());
    }
}
