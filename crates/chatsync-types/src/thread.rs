use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owner recorded on threads created without a signed-in identity
pub const DEMO_OWNER_ID: &str = "demo-user";

const LOCAL_ID_PREFIX: &str = "demo-chat-";

/// A chat thread as the rest of the client sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub title: String,
    pub last_updated: DateTime<Utc>,
    pub owner_id: String,
}

impl Thread {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        last_updated: DateTime<Utc>,
        owner_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            last_updated,
            owner_id: owner_id.into(),
        }
    }

    /// Thread that only lives in memory, id `demo-chat-<unix millis>`
    pub fn local(title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: format!("{}{}", LOCAL_ID_PREFIX, now.timestamp_millis()),
            title: title.into(),
            last_updated: now,
            owner_id: DEMO_OWNER_ID.to_string(),
        }
    }

    pub fn is_local(&self) -> bool {
        Self::is_local_id(&self.id)
    }

    /// True for ids minted by [`Thread::local`]; such threads never reach the backend
    pub fn is_local_id(id: &str) -> bool {
        id.starts_with(LOCAL_ID_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_local_thread_id_uses_millis() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let thread = Thread::local("Demo Chat", now);

        assert_eq!(thread.id, "demo-chat-1700000000123");
        assert_eq!(thread.owner_id, DEMO_OWNER_ID);
        assert_eq!(thread.last_updated, now);
        assert!(thread.is_local());
    }

    #[test]
    fn test_remote_thread_is_not_local() {
        let thread = Thread::new("c-42", "Trip", Utc::now(), "u1");
        assert!(!thread.is_local());
    }
}
