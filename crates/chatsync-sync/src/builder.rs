use chatsync_client::ChatBackend;
use chatsync_store::SessionState;
use chatsync_types::SyncConfig;
use std::sync::Arc;

use crate::driver::SyncDriver;
use crate::error::{Result, SyncError};

/// Builder for a [`SyncDriver`]; only the backend is required
pub struct SyncDriverBuilder {
    backend: Option<Arc<dyn ChatBackend>>,
    session: Option<Arc<SessionState>>,
    config: SyncConfig,
    follow_session: bool,
}

impl SyncDriverBuilder {
    pub fn new() -> Self {
        Self {
            backend: None,
            session: None,
            config: SyncConfig::default(),
            follow_session: false,
        }
    }

    pub fn backend(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Share an existing session; a fresh signed-out one is created otherwise
    pub fn session(mut self, session: Arc<SessionState>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// React to session changes made directly on the [`SessionState`]
    pub fn follow_session(mut self) -> Self {
        self.follow_session = true;
        self
    }

    /// Build the driver. Following the session spawns a task, so this needs a Tokio
    /// runtime when [`SyncDriverBuilder::follow_session`] was set.
    pub fn build(self) -> Result<SyncDriver> {
        let backend = self
            .backend
            .ok_or_else(|| SyncError::Config("Backend is required".to_string()))?;
        let session = self.session.unwrap_or_default();

        let driver = SyncDriver::new(backend, session, self.config);
        if self.follow_session {
            driver.follow_session();
        }
        Ok(driver)
    }
}

impl Default for SyncDriverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncDriver {
    pub fn builder() -> SyncDriverBuilder {
        SyncDriverBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatsync_client::InMemoryBackend;
    use std::time::Duration;

    #[test]
    fn test_backend_is_required() {
        let err = SyncDriver::builder().build().err().unwrap();
        assert_eq!(err.to_string(), "Invalid configuration: Backend is required");
    }

    #[test]
    fn test_build_with_defaults() {
        let config = SyncConfig::default().with_message_poll_interval(Duration::from_millis(500));
        let driver = SyncDriver::builder()
            .backend(Arc::new(InMemoryBackend::new("u1")))
            .config(config.clone())
            .build()
            .unwrap();

        assert_eq!(driver.config(), &config);
        assert!(driver.identity().is_none());
        assert!(!driver.thread_feed_active());
    }
}
