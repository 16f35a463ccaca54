use async_trait::async_trait;
use chatsync_types::{Message, Thread};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Authoritative store of threads and messages
///
/// Every method returns canonical records; wire shapes never leak past an implementation.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Complete thread list for the current identity, most recent first
    async fn list_threads(&self) -> Result<Vec<Thread>>;

    async fn create_thread(&self, title: &str) -> Result<Thread>;

    async fn delete_thread(&self, thread_id: &str) -> Result<()>;

    /// Ordered messages of one thread
    async fn list_messages(&self, thread_id: &str, query: MessageQuery) -> Result<Vec<Message>>;

    /// Persist a user message; the backend may answer with an assistant turn
    async fn send_message(
        &self,
        thread_id: &str,
        request: SendMessageRequest,
    ) -> Result<SendMessageResponse>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageQuery {
    pub limit: u32,
    pub order: SortOrder,
}

impl Default for MessageQuery {
    fn default() -> Self {
        Self { limit: 100, order: SortOrder::Asc }
    }
}

impl MessageQuery {
    pub fn new(limit: u32) -> Self {
        Self { limit, order: SortOrder::Asc }
    }

    pub fn order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub text: String,
    pub client_message_id: String,
}

impl SendMessageRequest {
    pub fn new(text: impl Into<String>, client_message_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            client_message_id: client_message_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SendMessageResponse {
    /// Generated reply, when the backend answers synchronously
    pub assistant: Option<Message>,
}
