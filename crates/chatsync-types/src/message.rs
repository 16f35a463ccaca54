use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Author of a message turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a cached message came from and how far its write got
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    /// Delivered by a remote snapshot
    #[default]
    Synced,
    /// Optimistic local write, remote call outstanding
    Pending,
    /// Remote accepted the write; not yet seen in a snapshot
    Sent,
    /// Remote write failed; kept visible for retry
    Failed,
}

impl Delivery {
    /// True for entries written by this client rather than received from a snapshot
    pub fn is_local(&self) -> bool {
        !matches!(self, Delivery::Synced)
    }
}

/// One immutable turn in a thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub thread_id: String,
    pub author: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
    /// Provisional id this message carried before the server assigned one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_message_id: Option<String>,
    #[serde(default)]
    pub delivery: Delivery,
}

impl Message {
    /// Message received from the backend
    pub fn synced(
        id: impl Into<String>,
        thread_id: impl Into<String>,
        author: Role,
        text: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            thread_id: thread_id.into(),
            author,
            text: text.into(),
            created_at,
            client_message_id: None,
            delivery: Delivery::Synced,
        }
    }

    /// Optimistic user message with a fresh client-generated id
    pub fn provisional(thread_id: impl Into<String>, text: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: format!("local-{}", uuid::Uuid::new_v4()),
            thread_id: thread_id.into(),
            author: Role::User,
            text: text.into(),
            created_at: now,
            client_message_id: None,
            delivery: Delivery::Pending,
        }
    }

    pub fn with_client_message_id(mut self, id: impl Into<String>) -> Self {
        self.client_message_id = Some(id.into());
        self
    }

    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }

    pub fn signature(&self) -> ContentSignature<'_> {
        ContentSignature {
            thread_id: &self.thread_id,
            author: self.author,
            text: &self.text,
            created_at: self.created_at,
        }
    }
}

/// Fields used to recognise the remote copy of an optimistic message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentSignature<'a> {
    pub thread_id: &'a str,
    pub author: Role,
    pub text: &'a str,
    pub created_at: DateTime<Utc>,
}

impl ContentSignature<'_> {
    /// Same thread, author and text, timestamps no further apart than `tolerance`
    pub fn matches(&self, other: &ContentSignature<'_>, tolerance: Duration) -> bool {
        self.thread_id == other.thread_id
            && self.author == other.author
            && self.text == other.text
            && (self.created_at - other.created_at).abs() <= tolerance
    }
}
