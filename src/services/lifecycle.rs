//! Transaction lifecycle service: the synchronous API core.
//!
//! Every operation authenticates the caller through the credentials port,
//! checks the role the operation demands, validates input, applies the
//! domain transition and persists it with a compare-and-swap on the
//! version read at the start. Lost races surface as
//! `ConcurrentModification`; the caller re-reads and retries.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{MoneyInfo, MoneyPatch, Party, Transaction, TransactionStatus};
use crate::error::AppError;
use crate::ports::{CreateOutcome, Credentials, Identity, TransactionRepository};
use crate::validation;

/// Result of a status query. `Pending` is an explicit "no stable outcome
/// yet", distinct from not-found: the record is in the settlement
/// worker's hands and its visible status is about to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusView {
    Pending,
    Available(TransactionStatus),
}

#[derive(Debug)]
pub struct CreateRequest {
    pub idempotency_token: String,
    pub money_info: MoneyInfo,
    pub sender: Option<Party>,
    pub receiver: Party,
}

pub struct TransactionService {
    repo: Arc<dyn TransactionRepository>,
    credentials: Arc<dyn Credentials>,
}

impl TransactionService {
    pub fn new(repo: Arc<dyn TransactionRepository>, credentials: Arc<dyn Credentials>) -> Self {
        Self { repo, credentials }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String, AppError> {
        Ok(self.credentials.login(email, password).await?)
    }

    async fn authenticate(&self, token: Option<&str>) -> Result<Identity, AppError> {
        let token =
            token.ok_or_else(|| AppError::Unauthenticated("missing bearer token".to_string()))?;

        Ok(self.credentials.resolve(token).await?)
    }

    fn require_creator(identity: Identity, transaction: &Transaction) -> Result<(), AppError> {
        if identity.user_id != transaction.creator_id {
            return Err(AppError::Forbidden(
                "only the creator may perform this operation".to_string(),
            ));
        }

        Ok(())
    }

    fn require_party(identity: Identity, transaction: &Transaction) -> Result<(), AppError> {
        let is_party = identity.user_id == transaction.creator_id
            || identity.user_id == transaction.receiver.user_id
            || transaction
                .sender
                .is_some_and(|s| s.user_id == identity.user_id);

        if !is_party {
            return Err(AppError::Forbidden(
                "not a party to this transaction".to_string(),
            ));
        }

        Ok(())
    }

    /// Idempotent create. A replay with the same `(creator,
    /// idempotency_token)` and identical payload returns the stored record;
    /// the same token with divergent content is a conflict.
    pub async fn create(
        &self,
        token: Option<&str>,
        request: CreateRequest,
    ) -> Result<Transaction, AppError> {
        let identity = self.authenticate(token).await?;

        validation::validate_idempotency_token(&request.idempotency_token)?;
        validation::validate_money_info(&request.money_info)?;
        if let Some(sender) = &request.sender {
            validation::validate_party("sender", sender)?;
        }
        validation::validate_party("receiver", &request.receiver)?;

        let transaction = Transaction::new(
            identity.user_id,
            request.idempotency_token,
            request.money_info,
            request.sender,
            request.receiver,
        );
        let fingerprint = transaction.fingerprint.clone();

        match self.repo.create(transaction).await? {
            CreateOutcome::Created(tx) => {
                debug!(transaction_id = %tx.id, "transaction created");
                Ok(tx)
            }
            CreateOutcome::Existing(existing) => {
                if existing.fingerprint != fingerprint {
                    return Err(AppError::Conflict(format!(
                        "idempotency token {} already used with a different payload",
                        existing.idempotency_token
                    )));
                }

                debug!(transaction_id = %existing.id, "create replayed, returning existing record");
                Ok(existing)
            }
        }
    }

    /// Merge a partial money-info patch into a `created` transaction.
    pub async fn edit(
        &self,
        token: Option<&str>,
        id: Uuid,
        patch: MoneyPatch,
    ) -> Result<Transaction, AppError> {
        let identity = self.authenticate(token).await?;
        validation::validate_money_patch(&patch)?;

        let mut transaction = self.repo.get(id).await?;
        Self::require_creator(identity, &transaction)?;

        let read_version = transaction.version;
        transaction.edit(&patch)?;
        self.repo.update(&transaction, read_version).await?;

        debug!(transaction_id = %id, version = transaction.version, "transaction edited");
        Ok(transaction)
    }

    /// Accept on behalf of the sender. When the creator left the sender
    /// slot open, the accepting identity takes it.
    pub async fn accept(
        &self,
        token: Option<&str>,
        id: Uuid,
        sender: Party,
    ) -> Result<Transaction, AppError> {
        let identity = self.authenticate(token).await?;
        validation::validate_party("sender", &sender)?;

        if identity.user_id != sender.user_id {
            return Err(AppError::Forbidden(
                "cannot accept on behalf of another user".to_string(),
            ));
        }

        let mut transaction = self.repo.get(id).await?;
        if let Some(existing) = transaction.sender {
            if existing.user_id != identity.user_id {
                return Err(AppError::Forbidden(
                    "only the designated sender may accept".to_string(),
                ));
            }
        }

        let read_version = transaction.version;
        transaction.accept(sender)?;
        self.repo.update(&transaction, read_version).await?;

        debug!(transaction_id = %id, "transaction accepted, queued for settlement");
        Ok(transaction)
    }

    pub async fn cancel(
        &self,
        token: Option<&str>,
        id: Uuid,
        reason: Option<String>,
    ) -> Result<Transaction, AppError> {
        let identity = self.authenticate(token).await?;

        let mut transaction = self.repo.get(id).await?;
        Self::require_creator(identity, &transaction)?;

        let read_version = transaction.version;
        transaction.cancel(reason)?;
        self.repo.update(&transaction, read_version).await?;

        debug!(transaction_id = %id, "transaction canceled");
        Ok(transaction)
    }

    /// Status visible to the creator. While the settlement worker owns the
    /// record the outcome has not stabilized and the view is `Pending`.
    pub async fn status(&self, token: Option<&str>, id: Uuid) -> Result<StatusView, AppError> {
        let identity = self.authenticate(token).await?;

        let transaction = self.repo.get(id).await?;
        Self::require_creator(identity, &transaction)?;

        if transaction.status.is_in_flight() {
            Ok(StatusView::Pending)
        } else {
            Ok(StatusView::Available(transaction.status))
        }
    }

    /// Full record at the latest persisted version, visible to any party.
    pub async fn retrieve(&self, token: Option<&str>, id: Uuid) -> Result<Transaction, AppError> {
        let identity = self.authenticate(token).await?;

        let transaction = self.repo.get(id).await?;
        Self::require_party(identity, &transaction)?;

        Ok(transaction)
    }
}
