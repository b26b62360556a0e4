use thiserror::Error;

use indago_core::FinanceError;

pub mod ledger;
pub mod orders;
pub mod request;

pub use ledger::SqlLedgerRepository;
pub use orders::SqlWeeklyOrderRepository;
pub use request::SqlPurchaseRequestRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid record: {0}")]
    InvalidRecord(#[source] FinanceError),
}

impl From<RepositoryError> for FinanceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            // Records rejected before the write keep their validation shape.
            RepositoryError::InvalidRecord(inner) => inner,
            other => FinanceError::Storage(other.to_string()),
        }
    }
}
