//! Authentication provider seam.
//!
//! Token issuance is an external collaborator; the sync layer only
//! distinguishes "token obtainable" from not.

use async_trait::async_trait;

/// Source of bearer credentials for remote calls.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Identifier of the signed-in user, if any. Used by the facade to
    /// scope entity paths.
    fn current_user(&self) -> Option<String>;

    /// Obtain a bearer token. `None` means no valid token is available and
    /// the request must fail with `Unauthenticated`.
    async fn token(&self) -> Option<String>;
}

/// Fixed-credential provider for tests and single-user deployments.
pub struct StaticTokenProvider {
    user: String,
    token: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            token: Some(token.into()),
        }
    }

    /// Provider with a user but no obtainable token.
    pub fn unauthenticated(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            token: None,
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    fn current_user(&self) -> Option<String> {
        Some(self.user.clone())
    }

    async fn token(&self) -> Option<String> {
        self.token.clone()
    }
}
