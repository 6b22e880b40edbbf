//! HTTP client for the external credential service.
//!
//! The collaborator exposes a single `process` endpoint that routes calls
//! by `(from, to, method)`; login and token verification are both carried
//! over it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ports::{AuthError, Credentials, Identity};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpCredentials {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCredentials {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn process<P: Serialize>(
        &self,
        method: &str,
        payload: P,
    ) -> Result<reqwest::Response, AuthError> {
        self.client
            .post(format!("{}/process", self.base_url))
            .timeout(REQUEST_TIMEOUT)
            .json(&ProcessRequest {
                from: "transaction",
                to: "user",
                method,
                payload,
            })
            .send()
            .await
            .map_err(|e| AuthError::Upstream(e.to_string()))
    }
}

#[derive(Serialize)]
struct ProcessRequest<'a, P> {
    from: &'a str,
    to: &'a str,
    method: &'a str,
    payload: P,
}

#[derive(Serialize)]
struct LoginPayload<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginBody {
    auth_token: String,
}

#[derive(Serialize)]
struct VerifyPayload<'a> {
    auth_token: &'a str,
}

#[derive(Deserialize)]
struct VerifyBody {
    user_id: Uuid,
}

#[async_trait]
impl Credentials for HttpCredentials {
    async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let response = self.process("login", LoginPayload { email, password }).await?;

        let status = response.status();
        if status.is_success() {
            let body: LoginBody = response
                .json()
                .await
                .map_err(|e| AuthError::Upstream(e.to_string()))?;
            Ok(body.auth_token)
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(AuthError::InvalidCredentials)
        } else {
            Err(AuthError::Upstream(format!(
                "credential service returned {status}"
            )))
        }
    }

    async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        let response = self
            .process("verify_token", VerifyPayload { auth_token: token })
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: VerifyBody = response
                .json()
                .await
                .map_err(|e| AuthError::Upstream(e.to_string()))?;
            Ok(Identity {
                user_id: body.user_id,
            })
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(AuthError::UnknownToken)
        } else {
            Err(AuthError::Upstream(format!(
                "credential service returned {status}"
            )))
        }
    }
}
