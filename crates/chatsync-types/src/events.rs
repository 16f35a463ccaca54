use serde::{Deserialize, Serialize};

/// Change notifications emitted by the sync driver for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// Signed-in identity changed (uid is None after sign-out)
    SessionChanged {
        #[serde(skip_serializing_if = "Option::is_none")]
        uid: Option<String>,
    },

    /// Thread directory contents changed
    ThreadsChanged {
        count: usize,
    },

    /// Selected thread changed
    SelectionChanged {
        #[serde(skip_serializing_if = "Option::is_none")]
        thread_id: Option<String>,
    },

    /// Cached message log for a thread changed
    MessagesChanged {
        thread_id: String,
        count: usize,
    },

    /// Send in progress for a thread (input should be disabled while true)
    SendingChanged {
        thread_id: String,
        in_flight: bool,
    },

    /// Transient user-facing notification
    Notice(Notice),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Toast-style message surfaced to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, message: message.into() }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = SyncEvent::MessagesChanged { thread_id: "t1".into(), count: 2 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "messages_changed");
        assert_eq!(json["thread_id"], "t1");
    }

    #[test]
    fn test_signed_out_session_omits_uid() {
        let json = serde_json::to_value(SyncEvent::SessionChanged { uid: None }).unwrap();
        assert!(json.get("uid").is_none());
    }

    #[test]
    fn test_notice_constructors() {
        assert!(Notice::error("Failed to load chats").is_error());
        assert!(!Notice::success("New chat created").is_error());
        assert_eq!(Notice::info("x").level, NoticeLevel::Info);
    }
}
