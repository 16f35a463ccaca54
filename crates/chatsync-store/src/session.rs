use chatsync_types::{AuthNotification, Identity};
use tokio::sync::watch;

/// Projection of the identity provider's state stream
///
/// The only writer is [`SessionState::apply`], fed by provider notifications.
/// Consumers observe changes through [`SessionState::subscribe`]; clearing per-identity
/// caches on sign-out is their job, not this type's.
pub struct SessionState {
    tx: watch::Sender<Option<Identity>>,
    _rx: watch::Receiver<Option<Identity>>,
}

impl SessionState {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(None);
        Self { tx, _rx: rx }
    }

    /// Apply one provider notification; returns false when it changed nothing
    pub fn apply(&self, notification: AuthNotification) -> bool {
        let next = notification.into_identity();
        let uid = next.as_ref().map(|identity| identity.uid.clone());
        let changed = self.tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            tracing::info!(uid = ?uid, "Session changed");
        }
        changed
    }

    pub fn current(&self) -> Option<Identity> {
        self.tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.tx.subscribe()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
