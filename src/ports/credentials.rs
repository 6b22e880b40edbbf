//! Contract for the external credential collaborator that issues and
//! resolves bearer tokens.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// Identity a bearer token resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("unknown or expired token")]
    UnknownToken,

    #[error("credential service error: {0}")]
    Upstream(String),
}

#[async_trait]
pub trait Credentials: Send + Sync {
    /// Exchange email/password for a bearer token.
    async fn login(&self, email: &str, password: &str) -> Result<String, AuthError>;

    /// Resolve a bearer token to the identity it was issued for.
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError>;
}
