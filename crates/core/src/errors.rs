use rust_decimal::Decimal;
use thiserror::Error;

/// Error taxonomy for the finance subsystem. The transport layer maps each
/// variant to an HTTP status; `kind()` is the stable machine-readable tag in
/// error payloads.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum FinanceError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("budget exceeded: cost {cost} is over the manual approval threshold {threshold}")]
    BudgetExceeded { threshold: Decimal, cost: Decimal },
    #[error("storage failure: {0}")]
    Storage(String),
    #[error("sales subsystem unavailable: {0}")]
    RemoteUnavailable(String),
}

impl FinanceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::BudgetExceeded { .. } => "budget_exceeded",
            Self::Storage(_) => "storage_error",
            Self::RemoteUnavailable(_) => "remote_unavailable",
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
