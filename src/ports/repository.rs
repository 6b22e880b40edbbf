//! Repository contract for transaction records.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::Transaction;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("transaction {0} not found")]
    NotFound(Uuid),

    #[error("transaction {id} was modified concurrently (expected version {expected})")]
    VersionMismatch { id: Uuid, expected: i64 },

    #[error("repository backend error: {0}")]
    Backend(String),
}

/// Result of a conditional insert keyed by `(creator_id, idempotency_token)`.
#[derive(Debug)]
pub enum CreateOutcome {
    /// The record was inserted.
    Created(Transaction),
    /// The token pair was already taken; this is the stored record.
    Existing(Transaction),
}

/// Durable store of transactions. The single source of truth shared by the
/// API layer and the settlement worker.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Insert unless a record already exists for the transaction's
    /// `(creator_id, idempotency_token)` pair, in which case the stored
    /// record is returned untouched.
    async fn create(&self, transaction: Transaction) -> Result<CreateOutcome, RepositoryError>;

    async fn get(&self, id: Uuid) -> Result<Transaction, RepositoryError>;

    /// Compare-and-swap write. The stored version must equal
    /// `expected_version` or the write is rejected with `VersionMismatch`.
    async fn update(
        &self,
        transaction: &Transaction,
        expected_version: i64,
    ) -> Result<(), RepositoryError>;

    /// Records awaiting the settlement worker (`accepted` or `settling`),
    /// oldest first.
    async fn list_settleable(&self, limit: usize) -> Result<Vec<Transaction>, RepositoryError>;
}
