use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::FinanceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Case-insensitive parse used at the storage and query-string boundaries.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

/// A request to spend money on an item. Mutated only by the approval engine,
/// never deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub id: i64,
    pub item_name: String,
    pub quantity: i64,
    pub estimated_cost: Decimal,
    pub status: RequestStatus,
    pub request_date: DateTime<Utc>,
    pub decision_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl PurchaseRequest {
    /// The only legal transitions are pending -> approved and
    /// pending -> rejected; both end states are terminal.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        self.status == RequestStatus::Pending && next.is_terminal()
    }
}

/// Validated submission input. `quantity` defaults to 1 when omitted.
#[derive(Clone, Debug, PartialEq)]
pub struct NewPurchaseRequest {
    pub item_name: String,
    pub quantity: i64,
    pub estimated_cost: Decimal,
}

impl NewPurchaseRequest {
    pub fn new(
        item_name: impl Into<String>,
        quantity: Option<i64>,
        estimated_cost: Decimal,
    ) -> Result<Self, FinanceError> {
        let item_name = item_name.into();
        if item_name.trim().is_empty() {
            return Err(FinanceError::validation("item_name must not be empty"));
        }

        let quantity = quantity.unwrap_or(1);
        if quantity < 1 {
            return Err(FinanceError::validation("quantity must be at least 1"));
        }

        if estimated_cost < Decimal::ZERO {
            return Err(FinanceError::validation("estimated_cost must not be negative"));
        }

        Ok(Self { item_name, quantity, estimated_cost })
    }
}
