//! In-process credential service.
//!
//! Stands in for the external login collaborator when no
//! `CREDENTIAL_SERVICE_URL` is configured, mirroring the stub gateway the
//! original deployment ships for offline runs.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::ports::{AuthError, Credentials, Identity};

#[derive(Default)]
pub struct StaticCredentials {
    users: HashMap<String, (String, Uuid)>,
    tokens: RwLock<HashMap<String, Uuid>>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, email: &str, password: &str, user_id: Uuid) -> Self {
        self.users
            .insert(email.to_string(), (password.to_string(), user_id));
        self
    }

    /// Mint a token directly, bypassing the password check. Test helper.
    pub async fn issue(&self, user_id: Uuid) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens.write().await.insert(token.clone(), user_id);
        token
    }
}

#[async_trait]
impl Credentials for StaticCredentials {
    async fn login(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let (expected, user_id) = self
            .users
            .get(email)
            .ok_or(AuthError::InvalidCredentials)?;

        if expected != password {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(self.issue(*user_id).await)
    }

    async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        self.tokens
            .read()
            .await
            .get(token)
            .map(|user_id| Identity { user_id: *user_id })
            .ok_or(AuthError::UnknownToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn login_issues_resolvable_token() {
        let user_id = Uuid::new_v4();
        let credentials = StaticCredentials::new().with_user("a@b.c", "pw", user_id);

        let token = credentials.login("a@b.c", "pw").await.unwrap();
        let identity = credentials.resolve(&token).await.unwrap();
        assert_eq!(identity.user_id, user_id);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_token_are_rejected() {
        let credentials = StaticCredentials::new().with_user("a@b.c", "pw", Uuid::new_v4());

        assert!(matches!(
            credentials.login("a@b.c", "nope").await.unwrap_err(),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            credentials.resolve("made-up").await.unwrap_err(),
            AuthError::UnknownToken
        ));
    }
}
