// REST backend implementation (HTTP direct via reqwest)

use async_trait::async_trait;
use chatsync_types::{Message, Thread};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::credentials::{CredentialProvider, NoCredentials};
use crate::error::{ClientError, Result};
use crate::traits::{ChatBackend, MessageQuery, SendMessageRequest, SendMessageResponse};
use crate::wire::{ChatList, CreatedChat, MessageList, SendReply};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client for the chat REST API
///
/// Credentials are resolved per request, so a token refresh on the provider side
/// applies to the very next call.
pub struct RestBackend {
    http_client: Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl RestBackend {
    pub fn builder() -> RestBackendBuilder {
        RestBackendBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidConfig("Base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Attach the bearer credential if there is one; returns the owner uid too
    async fn authorize(&self, request: RequestBuilder) -> Result<(RequestBuilder, String)> {
        match self.credentials.credential().await? {
            Some(credential) => {
                let request = request.header(AUTHORIZATION, credential.bearer());
                Ok((request, credential.uid))
            }
            None => Ok((request, String::new())),
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Backend request failed");
            return Err(ClientError::from_status(status, body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ChatBackend for RestBackend {
    async fn list_threads(&self) -> Result<Vec<Thread>> {
        let url = self.endpoint(&["chats"])?;
        let (request, uid) = self.authorize(self.http_client.get(url)).await?;

        let list: ChatList = Self::decode(request.send().await?).await?;
        let threads: Vec<Thread> = list
            .into_inner()
            .into_iter()
            .filter_map(|chat| match chat.into_thread(&uid) {
                Ok(thread) => Some(thread),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed chat");
                    None
                }
            })
            .collect();

        tracing::debug!(count = threads.len(), "Fetched chats");
        Ok(threads)
    }

    async fn create_thread(&self, title: &str) -> Result<Thread> {
        let url = self.endpoint(&["chats"])?;
        let body = serde_json::json!({ "title": title });
        let (request, uid) = self.authorize(self.http_client.post(url).json(&body)).await?;

        let created: CreatedChat = Self::decode(request.send().await?).await?;
        let thread = created.into_inner().into_thread(&uid)?;

        tracing::info!(thread_id = %thread.id, "Created chat");
        Ok(thread)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let url = self.endpoint(&["chats", thread_id])?;
        let (request, _) = self.authorize(self.http_client.delete(url)).await?;

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::from_status(status, body));
        }

        tracing::info!(thread_id, "Deleted chat");
        Ok(())
    }

    async fn list_messages(&self, thread_id: &str, query: MessageQuery) -> Result<Vec<Message>> {
        let mut url = self.endpoint(&["chats", thread_id, "messages"])?;
        url.query_pairs_mut()
            .append_pair("limit", &query.limit.to_string())
            .append_pair("order", query.order.as_str());
        let (request, _) = self.authorize(self.http_client.get(url)).await?;

        let list: MessageList = Self::decode(request.send().await?).await?;
        let messages: Vec<Message> = list
            .into_inner()
            .into_iter()
            .filter_map(|msg| match msg.into_message(thread_id) {
                Ok(msg) => Some(msg),
                Err(e) => {
                    tracing::warn!(thread_id, error = %e, "Skipping malformed message");
                    None
                }
            })
            .collect();

        tracing::debug!(thread_id, count = messages.len(), "Fetched messages");
        Ok(messages)
    }

    async fn send_message(
        &self,
        thread_id: &str,
        request: SendMessageRequest,
    ) -> Result<SendMessageResponse> {
        let url = self.endpoint(&["chats", thread_id, "messages"])?;
        let (http_request, _) = self.authorize(self.http_client.post(url).json(&request)).await?;

        let reply: SendReply = Self::decode(http_request.send().await?).await?;
        let assistant = reply
            .assistant
            .map(|msg| msg.into_message(thread_id))
            .transpose()?;

        tracing::debug!(
            thread_id,
            client_message_id = %request.client_message_id,
            has_reply = assistant.is_some(),
            "Message sent"
        );
        Ok(SendMessageResponse { assistant })
    }
}

#[derive(Default)]
pub struct RestBackendBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    credentials: Option<Arc<dyn CredentialProvider>>,
}

impl RestBackendBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn build(self) -> Result<RestBackend> {
        let base_url = self
            .base_url
            .ok_or_else(|| ClientError::InvalidConfig("Base URL is required".to_string()))?;
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| ClientError::InvalidConfig(format!("Invalid base URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidConfig(format!(
                "Base URL '{}' cannot carry a path",
                base_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = Client::builder()
            .default_headers(headers)
            .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
            .build()?;

        Ok(RestBackend {
            http_client,
            base_url,
            credentials: self.credentials.unwrap_or_else(|| Arc::new(NoCredentials)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_base_url() {
        let err = RestBackend::builder().build().err().unwrap();
        assert!(err.to_string().contains("Base URL is required"));
    }

    #[test]
    fn test_builder_rejects_garbage_url() {
        let result = RestBackend::builder().base_url("not a url").build();
        assert!(matches!(result, Err(ClientError::InvalidConfig(_))));
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let backend = RestBackend::builder()
            .base_url("http://localhost:8000/api/")
            .build()
            .unwrap();
        let url = backend.endpoint(&["chats", "c 1", "messages"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/chats/c%201/messages");
    }

    #[test]
    fn test_endpoint_without_path() {
        let backend = RestBackend::builder()
            .base_url("http://localhost:8000")
            .build()
            .unwrap();
        let url = backend.endpoint(&["chats"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/chats");
    }
}
