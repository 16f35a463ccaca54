use async_trait::async_trait;

use crate::error::Result;

/// Bearer credential issued by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub uid: String,
    pub token: String,
}

impl Credential {
    pub fn new(uid: impl Into<String>, token: impl Into<String>) -> Self {
        Self { uid: uid.into(), token: token.into() }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Source of per-request credentials
///
/// Called before every request so that refreshed tokens are picked up.
/// `None` means no identity: requests go out without an Authorization header.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credential(&self) -> Result<Option<Credential>>;
}

/// Provider for anonymous use
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

#[async_trait]
impl CredentialProvider for NoCredentials {
    async fn credential(&self) -> Result<Option<Credential>> {
        Ok(None)
    }
}

/// Fixed token, e.g. from the environment
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    credential: Credential,
}

impl StaticCredentials {
    pub fn new(uid: impl Into<String>, token: impl Into<String>) -> Self {
        Self { credential: Credential::new(uid, token) }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn credential(&self) -> Result<Option<Credential>> {
        Ok(Some(self.credential.clone()))
    }
}
