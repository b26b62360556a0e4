pub mod approval;
pub mod config;
pub mod domain;
pub mod errors;
pub mod report;

pub use approval::{BudgetEvaluation, BudgetRule};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, SubmissionMode};
pub use domain::ledger::{
    Invoice, PaymentSettlement, ProcurementLog, RawMaterialLog, Stored, SupplierPayment,
};
pub use domain::order::{NewWeeklyOrder, WeeklyOrder};
pub use domain::request::{NewPurchaseRequest, PurchaseRequest, RequestStatus};
pub use errors::FinanceError;
pub use report::{RawMaterialEntry, Report, ReportCounts};
