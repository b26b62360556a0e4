use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::FinanceError;

/// A unit of realized or forecast revenue for a week. Immutable once stored;
/// the revenue oracle sums `total_value` across these rows.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeeklyOrder {
    pub id: i64,
    pub customer_name: String,
    pub order_description: String,
    pub week_number: i64,
    pub total_value: Decimal,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewWeeklyOrder {
    pub customer_name: String,
    pub order_description: String,
    pub week_number: i64,
    pub total_value: Decimal,
}

impl NewWeeklyOrder {
    pub fn validate(&self) -> Result<(), FinanceError> {
        if self.customer_name.trim().is_empty() {
            return Err(FinanceError::validation("customer_name must not be empty"));
        }
        if self.week_number < 1 {
            return Err(FinanceError::validation("week_number must be at least 1"));
        }
        if self.total_value < Decimal::ZERO {
            return Err(FinanceError::validation("total_value must not be negative"));
        }
        Ok(())
    }
}
