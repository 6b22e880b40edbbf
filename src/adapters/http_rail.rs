//! HTTP client for the settlement rail (the payment gateway).
//!
//! Failure classification drives the worker's retry policy: 4xx means the
//! rail rejected the transaction for good, anything else is worth a retry.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::Transaction;
use crate::ports::{RailError, SettlementRail};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpRail {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRail {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct RailTransaction<'a> {
    transaction_id: Uuid,
    value: String,
    currency: &'a str,
    payment_method: &'a str,
}

#[derive(Serialize)]
struct RailSubmission<'a> {
    transaction: RailTransaction<'a>,
    sender_id: Option<Uuid>,
    receiver_id: Uuid,
}

#[async_trait]
impl SettlementRail for HttpRail {
    async fn submit(&self, transaction: &Transaction) -> Result<(), RailError> {
        let submission = RailSubmission {
            transaction: RailTransaction {
                transaction_id: transaction.id,
                value: transaction.money_info.amount.to_string(),
                currency: &transaction.money_info.currency,
                payment_method: &transaction.money_info.method,
            },
            sender_id: transaction.sender.map(|s| s.user_id),
            receiver_id: transaction.receiver.user_id,
        };

        let response = self
            .client
            .post(format!("{}/process/transaction", self.base_url))
            .timeout(REQUEST_TIMEOUT)
            .json(&submission)
            .send()
            .await
            .map_err(|e| RailError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status.is_client_error() {
            Err(RailError::Fatal(format!("rail returned {status}")))
        } else {
            Err(RailError::Transient(format!("rail returned {status}")))
        }
    }
}
