use async_trait::async_trait;
use chatsync_client::{Credential, CredentialProvider};
use chatsync_store::SessionState;
use std::sync::Arc;

/// Bearer token paired with whoever is signed in; nothing while signed out
pub struct SessionCredentials {
    session: Arc<SessionState>,
    token: Option<String>,
}

impl SessionCredentials {
    pub fn new(session: Arc<SessionState>, token: Option<String>) -> Self {
        Self { session, token }
    }
}

#[async_trait]
impl CredentialProvider for SessionCredentials {
    async fn credential(&self) -> chatsync_client::Result<Option<Credential>> {
        let Some(identity) = self.session.current() else {
            return Ok(None);
        };
        // Without a configured token the uid doubles as the bearer
        let token = self.token.clone().unwrap_or_else(|| identity.uid.clone());
        Ok(Some(Credential::new(identity.uid, token)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatsync_types::{AuthNotification, Identity};

    #[tokio::test]
    async fn test_follows_session() {
        let session = Arc::new(SessionState::new());
        let provider = SessionCredentials::new(session.clone(), Some("tok".to_string()));
        assert!(provider.credential().await.unwrap().is_none());

        session.apply(AuthNotification::SignedIn(Identity::new("u1")));
        let credential = provider.credential().await.unwrap().unwrap();
        assert_eq!(credential, Credential::new("u1", "tok"));

        session.apply(AuthNotification::SignedOut);
        assert!(provider.credential().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_uid_used_when_no_token() {
        let session = Arc::new(SessionState::new());
        session.apply(AuthNotification::SignedIn(Identity::new("u1")));
        let provider = SessionCredentials::new(session, None);
        assert_eq!(provider.credential().await.unwrap().unwrap().bearer(), "Bearer u1");
    }
}
