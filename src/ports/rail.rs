//! Contract for the settlement rail, the external system that actually
//! moves funds. Treated as a black box.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Transaction;

#[derive(Debug, Error)]
pub enum RailError {
    /// The rail call failed but a retry may go through.
    #[error("transient rail failure: {0}")]
    Transient(String),

    /// The rail rejected the transaction definitively.
    #[error("rail rejected transaction: {0}")]
    Fatal(String),
}

#[async_trait]
pub trait SettlementRail: Send + Sync {
    async fn submit(&self, transaction: &Transaction) -> Result<(), RailError>;
}
