//! Postgres implementation of `TransactionRepository`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{MoneyInfo, Party, Transaction};
use crate::ports::{CreateOutcome, RepositoryError, TransactionRepository};

const COLUMNS: &str = "id, idempotency_token, creator_id, method, currency, amount, \
     sender_user_id, sender_wallet_id, receiver_user_id, receiver_wallet_id, \
     status, canceled_reason, failure_reason, settlement_attempts, version, \
     created_at, updated_at, fingerprint";

/// Postgres-backed transaction repository.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> RepositoryError {
    RepositoryError::Backend(err.to_string())
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn create(&self, transaction: Transaction) -> Result<CreateOutcome, RepositoryError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO transactions (
                id, idempotency_token, creator_id, method, currency, amount,
                sender_user_id, sender_wallet_id, receiver_user_id, receiver_wallet_id,
                status, canceled_reason, failure_reason, settlement_attempts, version,
                created_at, updated_at, fingerprint
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (creator_id, idempotency_token) DO NOTHING
            "#,
        )
        .bind(transaction.id)
        .bind(&transaction.idempotency_token)
        .bind(transaction.creator_id)
        .bind(&transaction.money_info.method)
        .bind(&transaction.money_info.currency)
        .bind(transaction.money_info.amount)
        .bind(transaction.sender.map(|s| s.user_id))
        .bind(transaction.sender.map(|s| s.wallet_id))
        .bind(transaction.receiver.user_id)
        .bind(transaction.receiver.wallet_id)
        .bind(transaction.status.as_str())
        .bind(&transaction.canceled_reason)
        .bind(&transaction.failure_reason)
        .bind(transaction.settlement_attempts)
        .bind(transaction.version)
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .bind(&transaction.fingerprint)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if inserted.rows_affected() == 0 {
            let row = sqlx::query_as::<_, TransactionRow>(&format!(
                "SELECT {COLUMNS} FROM transactions WHERE creator_id = $1 AND idempotency_token = $2",
            ))
            .bind(transaction.creator_id)
            .bind(&transaction.idempotency_token)
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;

            return Ok(CreateOutcome::Existing(row.into_domain()?));
        }

        Ok(CreateOutcome::Created(transaction))
    }

    async fn get(&self, id: Uuid) -> Result<Transaction, RepositoryError> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {COLUMNS} FROM transactions WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(RepositoryError::NotFound(id))?.into_domain()
    }

    async fn update(
        &self,
        transaction: &Transaction,
        expected_version: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE transactions SET
                method = $1, currency = $2, amount = $3,
                sender_user_id = $4, sender_wallet_id = $5,
                status = $6, canceled_reason = $7, failure_reason = $8,
                settlement_attempts = $9, version = $10, updated_at = $11
            WHERE id = $12 AND version = $13
            "#,
        )
        .bind(&transaction.money_info.method)
        .bind(&transaction.money_info.currency)
        .bind(transaction.money_info.amount)
        .bind(transaction.sender.map(|s| s.user_id))
        .bind(transaction.sender.map(|s| s.wallet_id))
        .bind(transaction.status.as_str())
        .bind(&transaction.canceled_reason)
        .bind(&transaction.failure_reason)
        .bind(transaction.settlement_attempts)
        .bind(transaction.version)
        .bind(transaction.updated_at)
        .bind(transaction.id)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 0 {
            let exists = sqlx::query_scalar::<_, i64>(
                "SELECT version FROM transactions WHERE id = $1",
            )
            .bind(transaction.id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

            return match exists {
                Some(_) => Err(RepositoryError::VersionMismatch {
                    id: transaction.id,
                    expected: expected_version,
                }),
                None => Err(RepositoryError::NotFound(transaction.id)),
            };
        }

        Ok(())
    }

    async fn list_settleable(&self, limit: usize) -> Result<Vec<Transaction>, RepositoryError> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {COLUMNS} FROM transactions \
             WHERE status IN ('accepted', 'settling') \
             ORDER BY created_at ASC LIMIT $1",
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(TransactionRow::into_domain).collect()
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    idempotency_token: String,
    creator_id: Uuid,
    method: String,
    currency: String,
    amount: i64,
    sender_user_id: Option<Uuid>,
    sender_wallet_id: Option<Uuid>,
    receiver_user_id: Uuid,
    receiver_wallet_id: Uuid,
    status: String,
    canceled_reason: Option<String>,
    failure_reason: Option<String>,
    settlement_attempts: i32,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    fingerprint: String,
}

impl TransactionRow {
    fn into_domain(self) -> Result<Transaction, RepositoryError> {
        let status = self
            .status
            .parse()
            .map_err(|e: crate::domain::transaction::ParseStatusError| {
                RepositoryError::Backend(e.to_string())
            })?;

        let sender = match (self.sender_user_id, self.sender_wallet_id) {
            (Some(user_id), Some(wallet_id)) => Some(Party { user_id, wallet_id }),
            _ => None,
        };

        Ok(Transaction {
            id: self.id,
            idempotency_token: self.idempotency_token,
            creator_id: self.creator_id,
            money_info: MoneyInfo {
                method: self.method,
                currency: self.currency,
                amount: self.amount,
            },
            sender,
            receiver: Party {
                user_id: self.receiver_user_id,
                wallet_id: self.receiver_wallet_id,
            },
            status,
            canceled_reason: self.canceled_reason,
            failure_reason: self.failure_reason,
            settlement_attempts: self.settlement_attempts,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
            fingerprint: self.fingerprint,
        })
    }
}
