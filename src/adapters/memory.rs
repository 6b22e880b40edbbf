//! In-memory implementation of `TransactionRepository`.
//!
//! Default store when no `DATABASE_URL` is configured, and the backbone of
//! the test suite. Mirrors the conditional-write semantics of the Postgres
//! adapter: inserts are keyed by `(creator_id, idempotency_token)` and
//! updates are compare-and-swap on `version`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::Transaction;
use crate::ports::{CreateOutcome, RepositoryError, TransactionRepository};

#[derive(Default)]
pub struct InMemoryTransactionRepository {
    records: RwLock<HashMap<Uuid, Transaction>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn create(&self, transaction: Transaction) -> Result<CreateOutcome, RepositoryError> {
        let mut records = self.records.write().await;

        let existing = records.values().find(|stored| {
            stored.creator_id == transaction.creator_id
                && stored.idempotency_token == transaction.idempotency_token
        });
        if let Some(stored) = existing {
            return Ok(CreateOutcome::Existing(stored.clone()));
        }

        records.insert(transaction.id, transaction.clone());
        Ok(CreateOutcome::Created(transaction))
    }

    async fn get(&self, id: Uuid) -> Result<Transaction, RepositoryError> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn update(
        &self,
        transaction: &Transaction,
        expected_version: i64,
    ) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;

        let stored = records
            .get_mut(&transaction.id)
            .ok_or(RepositoryError::NotFound(transaction.id))?;

        if stored.version != expected_version {
            return Err(RepositoryError::VersionMismatch {
                id: transaction.id,
                expected: expected_version,
            });
        }

        *stored = transaction.clone();
        Ok(())
    }

    async fn list_settleable(&self, limit: usize) -> Result<Vec<Transaction>, RepositoryError> {
        let records = self.records.read().await;

        let mut settleable: Vec<Transaction> = records
            .values()
            .filter(|tx| tx.status.is_in_flight())
            .cloned()
            .collect();
        settleable.sort_by_key(|tx| tx.created_at);
        settleable.truncate(limit);

        Ok(settleable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MoneyInfo, Party};

    fn party() -> Party {
        Party {
            user_id: Uuid::new_v4(),
            wallet_id: Uuid::new_v4(),
        }
    }

    fn transaction(creator: Uuid, token: &str) -> Transaction {
        Transaction::new(
            creator,
            token.to_string(),
            MoneyInfo {
                method: "bank_account".to_string(),
                currency: "USD".to_string(),
                amount: 100,
            },
            None,
            party(),
        )
    }

    #[tokio::test]
    async fn create_is_keyed_by_creator_and_token() {
        let repo = InMemoryTransactionRepository::new();
        let creator = Uuid::new_v4();

        let first = match repo.create(transaction(creator, "tok")).await.unwrap() {
            CreateOutcome::Created(tx) => tx,
            CreateOutcome::Existing(_) => panic!("expected insert"),
        };

        match repo.create(transaction(creator, "tok")).await.unwrap() {
            CreateOutcome::Existing(tx) => assert_eq!(tx.id, first.id),
            CreateOutcome::Created(_) => panic!("expected duplicate detection"),
        }

        // Same token under another creator is a distinct namespace.
        match repo
            .create(transaction(Uuid::new_v4(), "tok"))
            .await
            .unwrap()
        {
            CreateOutcome::Created(tx) => assert_ne!(tx.id, first.id),
            CreateOutcome::Existing(_) => panic!("token must be scoped per creator"),
        }
    }

    #[tokio::test]
    async fn update_rejects_stale_versions() {
        let repo = InMemoryTransactionRepository::new();
        let tx = match repo
            .create(transaction(Uuid::new_v4(), "tok"))
            .await
            .unwrap()
        {
            CreateOutcome::Created(tx) => tx,
            CreateOutcome::Existing(_) => unreachable!(),
        };

        // Two mutators start from the same snapshot; exactly one wins.
        let mut first = tx.clone();
        first.accept(party()).unwrap();
        let mut second = tx.clone();
        second.cancel(None).unwrap();

        assert!(repo.update(&first, tx.version).await.is_ok());
        let err = repo.update(&second, tx.version).await.unwrap_err();
        assert!(matches!(err, RepositoryError::VersionMismatch { .. }));

        assert_eq!(repo.get(tx.id).await.unwrap().status, first.status);
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found() {
        let repo = InMemoryTransactionRepository::new();
        let tx = transaction(Uuid::new_v4(), "tok");

        assert!(matches!(
            repo.update(&tx, 1).await.unwrap_err(),
            RepositoryError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn list_settleable_returns_in_flight_oldest_first() {
        let repo = InMemoryTransactionRepository::new();
        let creator = Uuid::new_v4();

        let mut accepted = transaction(creator, "a");
        accepted.accept(party()).unwrap();
        let mut settling = transaction(creator, "b");
        settling.accept(party()).unwrap();
        settling.begin_settlement().unwrap();
        let created = transaction(creator, "c");

        for tx in [&accepted, &settling, &created] {
            repo.create(tx.clone()).await.unwrap();
        }

        let batch = repo.list_settleable(10).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|tx| tx.status.is_in_flight()));

        assert_eq!(repo.list_settleable(1).await.unwrap().len(), 1);
    }
}
