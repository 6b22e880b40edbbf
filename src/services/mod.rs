pub mod lifecycle;
pub mod settlement;

pub use lifecycle::{CreateRequest, StatusView, TransactionService};
pub use settlement::{SettlementConfig, SettlementWorker};
