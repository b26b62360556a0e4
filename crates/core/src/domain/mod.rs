pub mod ledger;
pub mod order;
pub mod request;
