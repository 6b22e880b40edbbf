//! Background settlement worker.
//!
//! Drains `accepted` transactions toward a terminal state by submitting
//! them to the settlement rail. Runs detached from the request path; the
//! repository is the only coordination point. Every write is a
//! compare-and-swap, so any number of workers can poll the same store.
//! Losing a swap means another worker already advanced the record.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::domain::{Transaction, TransactionStatus};
use crate::ports::{RailError, RepositoryError, SettlementRail, TransactionRepository};

#[derive(Debug, Clone)]
pub struct SettlementConfig {
    pub poll_interval: Duration,
    pub batch_size: usize,
    /// Rail attempts per transaction before it is forced to `failed`.
    pub max_attempts: i32,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 10,
            max_attempts: 10,
        }
    }
}

pub struct SettlementWorker {
    repo: Arc<dyn TransactionRepository>,
    rail: Arc<dyn SettlementRail>,
    config: SettlementConfig,
}

impl SettlementWorker {
    pub fn new(
        repo: Arc<dyn TransactionRepository>,
        rail: Arc<dyn SettlementRail>,
        config: SettlementConfig,
    ) -> Self {
        Self { repo, rail, config }
    }

    /// Poll loop. Never returns; spawn it on the runtime.
    pub async fn run(self) {
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            max_attempts = self.config.max_attempts,
            "settlement worker started"
        );

        loop {
            if let Err(e) = self.process_batch().await {
                error!("settlement batch error: {e}");
            }

            sleep(self.config.poll_interval).await;
        }
    }

    /// One pass over the settleable backlog. Returns how many records
    /// were examined.
    pub async fn process_batch(&self) -> anyhow::Result<usize> {
        let batch = self.repo.list_settleable(self.config.batch_size).await?;
        let count = batch.len();

        if count > 0 {
            debug!("processing {count} settleable transaction(s)");
        }

        for transaction in batch {
            self.process_one(transaction).await?;
        }

        Ok(count)
    }

    /// Advance a single record one step. Re-observing a record another
    /// worker already moved, or one that is already terminal, is a no-op.
    pub async fn process_one(&self, mut transaction: Transaction) -> anyhow::Result<()> {
        if transaction.status == TransactionStatus::Accepted {
            let read_version = transaction.version;
            transaction.begin_settlement()?;

            match self.repo.update(&transaction, read_version).await {
                Ok(()) => {}
                Err(RepositoryError::VersionMismatch { .. }) => return Ok(()),
                Err(e) => return Err(e.into()),
            }
        }

        if transaction.status != TransactionStatus::Settling {
            return Ok(());
        }

        let read_version = transaction.version;
        match self.rail.submit(&transaction).await {
            Ok(()) => {
                transaction.succeed()?;
                debug!(transaction_id = %transaction.id, "settlement succeeded");
            }
            Err(RailError::Fatal(reason)) => {
                warn!(transaction_id = %transaction.id, %reason, "rail rejected transaction");
                transaction.fail(reason)?;
            }
            Err(RailError::Transient(reason)) => {
                if transaction.settlement_attempts + 1 >= self.config.max_attempts {
                    warn!(
                        transaction_id = %transaction.id,
                        attempts = transaction.settlement_attempts + 1,
                        "settlement attempts exhausted"
                    );
                    transaction.fail(format!("settlement attempts exhausted: {reason}"))?;
                } else {
                    debug!(transaction_id = %transaction.id, %reason, "transient rail failure, will retry");
                    transaction.record_settlement_attempt()?;
                }
            }
        }

        match self.repo.update(&transaction, read_version).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::VersionMismatch { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryTransactionRepository, StubRail};
    use crate::domain::{MoneyInfo, Party};
    use uuid::Uuid;

    fn party() -> Party {
        Party {
            user_id: Uuid::new_v4(),
            wallet_id: Uuid::new_v4(),
        }
    }

    async fn accepted_transaction(repo: &InMemoryTransactionRepository) -> Transaction {
        let mut tx = Transaction::new(
            Uuid::new_v4(),
            Uuid::new_v4().to_string(),
            MoneyInfo {
                method: "bank_account".to_string(),
                currency: "USD".to_string(),
                amount: 100,
            },
            None,
            party(),
        );
        tx.accept(party()).unwrap();
        repo.create(tx.clone()).await.unwrap();
        tx
    }

    fn worker(
        repo: Arc<InMemoryTransactionRepository>,
        rail: Arc<StubRail>,
        max_attempts: i32,
    ) -> SettlementWorker {
        SettlementWorker::new(
            repo,
            rail,
            SettlementConfig {
                poll_interval: Duration::from_millis(10),
                batch_size: 10,
                max_attempts,
            },
        )
    }

    #[tokio::test]
    async fn accepted_transaction_reaches_succeeded() {
        let repo = Arc::new(InMemoryTransactionRepository::new());
        let rail = Arc::new(StubRail::succeeding());
        let tx = accepted_transaction(&repo).await;

        let worker = worker(repo.clone(), rail, 10);
        // First pass claims and submits in one step.
        worker.process_batch().await.unwrap();

        let stored = repo.get(tx.id).await.unwrap();
        assert_eq!(stored.status, TransactionStatus::Succeeded);
    }

    #[tokio::test]
    async fn fatal_rail_rejection_forces_failed() {
        let repo = Arc::new(InMemoryTransactionRepository::new());
        let rail = Arc::new(StubRail::rejecting());
        let tx = accepted_transaction(&repo).await;

        worker(repo.clone(), rail, 10).process_batch().await.unwrap();

        let stored = repo.get(tx.id).await.unwrap();
        assert_eq!(stored.status, TransactionStatus::Failed);
        assert!(stored.failure_reason.is_some());
    }

    #[tokio::test]
    async fn transient_failures_retry_until_attempts_exhausted() {
        let repo = Arc::new(InMemoryTransactionRepository::new());
        let rail = Arc::new(StubRail::flaky());
        let tx = accepted_transaction(&repo).await;

        let worker = worker(repo.clone(), rail.clone(), 3);

        worker.process_batch().await.unwrap();
        let stored = repo.get(tx.id).await.unwrap();
        assert_eq!(stored.status, TransactionStatus::Settling);
        assert_eq!(stored.settlement_attempts, 1);

        worker.process_batch().await.unwrap();
        assert_eq!(repo.get(tx.id).await.unwrap().settlement_attempts, 2);

        // Third attempt hits the budget and the record fails for good.
        worker.process_batch().await.unwrap();
        let stored = repo.get(tx.id).await.unwrap();
        assert_eq!(stored.status, TransactionStatus::Failed);
        assert_eq!(rail.calls(), 3);
    }

    #[tokio::test]
    async fn transient_failures_can_recover_within_budget() {
        let repo = Arc::new(InMemoryTransactionRepository::new());
        let rail = Arc::new(StubRail::flaky_then_succeeding(2));
        let tx = accepted_transaction(&repo).await;

        let worker = worker(repo.clone(), rail, 10);
        for _ in 0..3 {
            worker.process_batch().await.unwrap();
        }

        let stored = repo.get(tx.id).await.unwrap();
        assert_eq!(stored.status, TransactionStatus::Succeeded);
        assert_eq!(stored.settlement_attempts, 2);
    }

    #[tokio::test]
    async fn terminal_records_are_not_reprocessed() {
        let repo = Arc::new(InMemoryTransactionRepository::new());
        let rail = Arc::new(StubRail::succeeding());
        let tx = accepted_transaction(&repo).await;

        let worker = worker(repo.clone(), rail.clone(), 10);
        worker.process_batch().await.unwrap();
        assert_eq!(rail.calls(), 1);

        // Settled records leave the backlog entirely.
        assert_eq!(worker.process_batch().await.unwrap(), 0);
        assert_eq!(rail.calls(), 1);

        // Even a stale in-flight copy of a terminal record is a no-op.
        let stale = repo.get(tx.id).await.unwrap();
        worker.process_one(stale).await.unwrap();
        assert_eq!(rail.calls(), 1);
    }

    #[tokio::test]
    async fn losing_the_claim_race_skips_the_record() {
        let repo = Arc::new(InMemoryTransactionRepository::new());
        let rail = Arc::new(StubRail::succeeding());
        let tx = accepted_transaction(&repo).await;

        // Another worker advanced the record after our snapshot was taken.
        let mut advanced = repo.get(tx.id).await.unwrap();
        let version = advanced.version;
        advanced.begin_settlement().unwrap();
        repo.update(&advanced, version).await.unwrap();

        let mut stale_snapshot = advanced.clone();
        stale_snapshot.version = version;
        stale_snapshot.status = TransactionStatus::Accepted;

        worker(repo.clone(), rail.clone(), 10)
            .process_one(stale_snapshot)
            .await
            .unwrap();

        // The stale claim lost; the record is untouched and no rail call
        // was made on its behalf.
        assert_eq!(
            repo.get(tx.id).await.unwrap().status,
            TransactionStatus::Settling
        );
        assert_eq!(rail.calls(), 0);
    }
}
