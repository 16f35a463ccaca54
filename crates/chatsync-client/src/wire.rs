//! Accepted JSON shapes of the REST backend and their normalization into canonical records.
//!
//! Backends in the wild spell the same field several ways (`last_updated`, `lastUpdated`,
//! `updated_at`; `chatId`, `chat_id`; `text`, `content`). Every spelling is read here once
//! and folded into [`Thread`] / [`Message`]; nothing past this module sees the raw shape.

use chatsync_types::{Delivery, Message, Role, Thread};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireChat {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub last_updated: Option<Value>,
    #[serde(default, rename = "lastUpdated")]
    pub last_updated_camel: Option<Value>,
    #[serde(default)]
    pub updated_at: Option<Value>,
    #[serde(default, rename = "ownerId")]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl WireChat {
    /// Canonical thread; `fallback_owner` fills in a missing owner
    pub fn into_thread(self, fallback_owner: &str) -> Result<Thread> {
        let id = self
            .id
            .or(self.thread_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ClientError::InvalidResponse("chat without id".to_string()))?;

        let last_updated = [&self.last_updated, &self.last_updated_camel, &self.updated_at]
            .into_iter()
            .flatten()
            .find_map(parse_timestamp)
            .unwrap_or_else(Utc::now);

        Ok(Thread {
            id,
            title: self.title.unwrap_or_else(|| "New Chat".to_string()),
            last_updated,
            owner_id: self
                .owner_id
                .or(self.user_id)
                .unwrap_or_else(|| fallback_owner.to_string()),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default, rename = "chatId")]
    pub chat_id_camel: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, rename = "createdAt")]
    pub created_at_camel: Option<Value>,
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default, rename = "clientMessageId")]
    pub client_message_id: Option<String>,
}

impl WireMessage {
    /// Canonical message; `fallback_thread` is the thread the request was scoped to
    pub fn into_message(self, fallback_thread: &str) -> Result<Message> {
        let id = self
            .id
            .or(self.message_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ClientError::InvalidResponse("message without id".to_string()))?;

        let raw_author = self
            .author
            .or(self.role)
            .ok_or_else(|| ClientError::InvalidResponse(format!("message {id} without author")))?;
        let author = parse_role(&raw_author).ok_or_else(|| {
            ClientError::InvalidResponse(format!("message {id} has unknown author '{raw_author}'"))
        })?;

        let created_at = [&self.created_at_camel, &self.created_at]
            .into_iter()
            .flatten()
            .find_map(parse_timestamp)
            .unwrap_or_else(Utc::now);

        Ok(Message {
            id,
            thread_id: self
                .chat_id_camel
                .or(self.chat_id)
                .or(self.thread_id)
                .unwrap_or_else(|| fallback_thread.to_string()),
            author,
            text: self.text.or(self.content).unwrap_or_default(),
            created_at,
            client_message_id: self.client_message_id,
            delivery: Delivery::Synced,
        })
    }
}

/// `GET /chats` body: `{"chats": [...]}` or a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ChatList {
    Envelope { chats: Vec<WireChat> },
    Bare(Vec<WireChat>),
}

impl ChatList {
    pub fn into_inner(self) -> Vec<WireChat> {
        match self {
            ChatList::Envelope { chats } => chats,
            ChatList::Bare(chats) => chats,
        }
    }
}

/// `GET /chats/{id}/messages` body: `{"messages": [...]}` or a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum MessageList {
    Envelope { messages: Vec<WireMessage> },
    Bare(Vec<WireMessage>),
}

impl MessageList {
    pub fn into_inner(self) -> Vec<WireMessage> {
        match self {
            MessageList::Envelope { messages } => messages,
            MessageList::Bare(messages) => messages,
        }
    }
}

/// `POST /chats/{id}/messages` body; `{"status": "ok"}` decodes to no reply
#[derive(Debug, Default, Deserialize)]
pub struct SendReply {
    #[serde(default)]
    pub assistant: Option<WireMessage>,
}

/// `POST /chats` body: the chat itself or `{"chat": {...}}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CreatedChat {
    Envelope { chat: WireChat },
    Bare(WireChat),
}

impl CreatedChat {
    pub fn into_inner(self) -> WireChat {
        match self {
            CreatedChat::Envelope { chat } => chat,
            CreatedChat::Bare(chat) => chat,
        }
    }
}

fn parse_role(raw: &str) -> Option<Role> {
    match raw.to_ascii_lowercase().as_str() {
        "user" | "human" => Some(Role::User),
        "assistant" | "ai" => Some(Role::Assistant),
        "system" => Some(Role::System),
        _ => None,
    }
}

/// RFC 3339 string, or epoch milliseconds as a number
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    }
}
