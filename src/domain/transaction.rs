//! Transaction domain entity and lifecycle state machine.
//! Framework-agnostic; persistence and transport live in the adapters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle states of a transaction.
///
/// `created` is the only state reachable by client mutation. Once a
/// transaction is accepted it belongs to the settlement worker, which is
/// the sole writer of `settling`, `succeeded` and `failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Created,
    Accepted,
    Settling,
    Canceled,
    Failed,
    Succeeded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Created => "created",
            TransactionStatus::Accepted => "accepted",
            TransactionStatus::Settling => "settling",
            TransactionStatus::Canceled => "canceled",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Succeeded => "succeeded",
        }
    }

    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Canceled | TransactionStatus::Failed | TransactionStatus::Succeeded
        )
    }

    /// Whether the settlement worker currently owns the record. Status
    /// queries report these as pending rather than exposing an
    /// intermediate value that may already be stale.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Accepted | TransactionStatus::Settling
        )
    }

    /// Edge set of the status graph.
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;

        matches!(
            (self, next),
            (Created, Accepted)
                | (Created, Canceled)
                | (Accepted, Settling)
                | (Accepted, Failed)
                | (Settling, Succeeded)
                | (Settling, Failed)
        )
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown transaction status: {0}")]
pub struct ParseStatusError(String);

impl FromStr for TransactionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(TransactionStatus::Created),
            "accepted" => Ok(TransactionStatus::Accepted),
            "settling" => Ok(TransactionStatus::Settling),
            "canceled" => Ok(TransactionStatus::Canceled),
            "failed" => Ok(TransactionStatus::Failed),
            "succeeded" => Ok(TransactionStatus::Succeeded),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Payment details. Amount is in minor units and strictly positive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoneyInfo {
    pub method: String,
    pub currency: String,
    pub amount: i64,
}

/// Partial update applied by `edit`. Absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoneyPatch {
    pub method: Option<String>,
    pub currency: Option<String>,
    pub amount: Option<i64>,
}

impl MoneyInfo {
    pub fn merged(&self, patch: &MoneyPatch) -> MoneyInfo {
        MoneyInfo {
            method: patch.method.clone().unwrap_or_else(|| self.method.clone()),
            currency: patch
                .currency
                .clone()
                .unwrap_or_else(|| self.currency.clone()),
            amount: patch.amount.unwrap_or(self.amount),
        }
    }
}

/// A party to the transaction, referencing an external ledger identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub user_id: Uuid,
    pub wallet_id: Uuid,
}

/// Attempted transition forbidden by the current status.
#[derive(Debug, Error)]
#[error("cannot {action} a {status} transaction")]
pub struct TransitionError {
    pub status: TransactionStatus,
    pub action: &'static str,
}

/// The central entity. Never deleted; cancellation and failure are
/// terminal states kept for audit and retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub id: Uuid,
    pub idempotency_token: String,
    pub creator_id: Uuid,
    pub money_info: MoneyInfo,
    pub sender: Option<Party>,
    pub receiver: Party,
    pub status: TransactionStatus,
    pub canceled_reason: Option<String>,
    pub failure_reason: Option<String>,
    pub settlement_attempts: i32,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Canonical form of the creation payload. Replayed create requests
    /// are compared against this, not the (possibly edited) live fields.
    #[serde(skip_serializing)]
    pub fingerprint: String,
}

impl Transaction {
    pub fn new(
        creator_id: Uuid,
        idempotency_token: String,
        money_info: MoneyInfo,
        sender: Option<Party>,
        receiver: Party,
    ) -> Self {
        let now = Utc::now();
        let fingerprint = Self::creation_fingerprint(&money_info, sender.as_ref(), &receiver);
        Self {
            id: Uuid::new_v4(),
            idempotency_token,
            creator_id,
            money_info,
            sender,
            receiver,
            status: TransactionStatus::Created,
            canceled_reason: None,
            failure_reason: None,
            settlement_attempts: 0,
            version: 1,
            created_at: now,
            updated_at: now,
            fingerprint,
        }
    }

    /// Canonical encoding of a creation payload, used to tell an
    /// idempotent replay apart from a token reuse with different content.
    pub fn creation_fingerprint(
        money_info: &MoneyInfo,
        sender: Option<&Party>,
        receiver: &Party,
    ) -> String {
        let sender = sender
            .map(|s| format!("{}:{}", s.user_id, s.wallet_id))
            .unwrap_or_default();

        format!(
            "{}|{}|{}|{}|{}:{}",
            money_info.method,
            money_info.currency,
            money_info.amount,
            sender,
            receiver.user_id,
            receiver.wallet_id,
        )
    }

    fn guard(
        &self,
        expected: TransactionStatus,
        action: &'static str,
    ) -> Result<(), TransitionError> {
        if self.status != expected {
            return Err(TransitionError {
                status: self.status,
                action,
            });
        }

        Ok(())
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }

    /// Merge a partial money-info patch. Only `created` transactions are
    /// editable; the status does not change.
    pub fn edit(&mut self, patch: &MoneyPatch) -> Result<(), TransitionError> {
        self.guard(TransactionStatus::Created, "edit")?;

        self.money_info = self.money_info.merged(patch);
        self.touch();
        Ok(())
    }

    /// Accept on behalf of a sender, completing the sender slot when the
    /// creator left it open.
    pub fn accept(&mut self, sender: Party) -> Result<(), TransitionError> {
        self.guard(TransactionStatus::Created, "accept")?;

        if self.sender.is_none() {
            self.sender = Some(sender);
        }

        self.status = TransactionStatus::Accepted;
        self.touch();
        Ok(())
    }

    pub fn cancel(&mut self, reason: Option<String>) -> Result<(), TransitionError> {
        self.guard(TransactionStatus::Created, "cancel")?;

        self.status = TransactionStatus::Canceled;
        self.canceled_reason = reason;
        self.touch();
        Ok(())
    }

    /// Worker claims the record before talking to the rail.
    pub fn begin_settlement(&mut self) -> Result<(), TransitionError> {
        self.guard(TransactionStatus::Accepted, "settle")?;

        self.status = TransactionStatus::Settling;
        self.touch();
        Ok(())
    }

    pub fn succeed(&mut self) -> Result<(), TransitionError> {
        self.guard(TransactionStatus::Settling, "complete")?;

        self.status = TransactionStatus::Succeeded;
        self.touch();
        Ok(())
    }

    /// Terminal failure, reachable from either worker-owned state.
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(TransactionStatus::Failed) {
            return Err(TransitionError {
                status: self.status,
                action: "fail",
            });
        }

        self.status = TransactionStatus::Failed;
        self.failure_reason = Some(reason.into());
        self.touch();
        Ok(())
    }

    /// Bookkeeping for a transient rail error. The record stays in
    /// `settling` and will be retried until the attempt budget runs out.
    pub fn record_settlement_attempt(&mut self) -> Result<(), TransitionError> {
        self.guard(TransactionStatus::Settling, "retry")?;

        self.settlement_attempts += 1;
        self.touch();
        Ok(())
    }
}
