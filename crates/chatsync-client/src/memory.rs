use async_trait::async_trait;
use chatsync_types::{Message, Role, Thread};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{ClientError, Result};
use crate::traits::{ChatBackend, MessageQuery, SendMessageRequest, SendMessageResponse, SortOrder};

type Responder = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Default)]
struct Inner {
    threads: Vec<Thread>,
    messages: HashMap<String, Vec<Message>>,
    next_id: u64,
}

impl Inner {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

/// Backend that keeps everything in process memory
///
/// Behaves like the REST server: assigns ids and timestamps, orders threads by
/// last update, and answers each user message through a pluggable responder.
pub struct InMemoryBackend {
    owner_id: String,
    inner: Mutex<Inner>,
    responder: Responder,
    available: AtomicBool,
    requests: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            inner: Mutex::new(Inner::default()),
            responder: Arc::new(|text: &str| Some(format!("You said: {}", text))),
            available: AtomicBool::new(true),
            requests: AtomicUsize::new(0),
        }
    }

    /// Replace the assistant; returning `None` sends no reply
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.responder = Arc::new(responder);
        self
    }

    /// Simulate an outage: every call fails with `Unavailable` while false
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of calls made against this backend
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Seed a message as if another client had written it
    pub fn insert_message(&self, message: Message) {
        let mut inner = self.lock();
        inner
            .messages
            .entry(message.thread_id.clone())
            .or_default()
            .push(message);
    }

    /// Seed a thread as if another client had created it
    pub fn insert_thread(&self, thread: Thread) {
        let mut inner = self.lock();
        inner.threads.push(thread);
        inner.threads.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn begin_request(&self) -> Result<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::Unavailable("in-memory backend is offline".to_string()))
        }
    }
}

#[async_trait]
impl ChatBackend for InMemoryBackend {
    async fn list_threads(&self) -> Result<Vec<Thread>> {
        self.begin_request()?;
        Ok(self.lock().threads.clone())
    }

    async fn create_thread(&self, title: &str) -> Result<Thread> {
        self.begin_request()?;
        let mut inner = self.lock();
        let thread = Thread::new(inner.next_id("chat"), title, Utc::now(), self.owner_id.clone());
        inner.threads.insert(0, thread.clone());
        Ok(thread)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.begin_request()?;
        let mut inner = self.lock();
        let before = inner.threads.len();
        inner.threads.retain(|t| t.id != thread_id);
        if inner.threads.len() == before {
            return Err(ClientError::NotFound(thread_id.to_string()));
        }
        inner.messages.remove(thread_id);
        Ok(())
    }

    async fn list_messages(&self, thread_id: &str, query: MessageQuery) -> Result<Vec<Message>> {
        self.begin_request()?;
        let inner = self.lock();
        let mut messages = inner.messages.get(thread_id).cloned().unwrap_or_default();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let limit = query.limit as usize;
        let messages = match query.order {
            SortOrder::Asc => messages.into_iter().take(limit).collect(),
            SortOrder::Desc => messages.into_iter().rev().take(limit).collect(),
        };
        Ok(messages)
    }

    async fn send_message(
        &self,
        thread_id: &str,
        request: SendMessageRequest,
    ) -> Result<SendMessageResponse> {
        self.begin_request()?;
        let mut inner = self.lock();
        if !inner.threads.iter().any(|t| t.id == thread_id) {
            return Err(ClientError::NotFound(thread_id.to_string()));
        }

        let now = Utc::now();
        let user = Message::synced(inner.next_id("msg"), thread_id, Role::User, &request.text, now)
            .with_client_message_id(&request.client_message_id);

        let assistant = (self.responder)(&request.text).map(|reply| {
            let id = inner.next_id("msg");
            Message::synced(id, thread_id, Role::Assistant, reply, now)
        });

        let log = inner.messages.entry(thread_id.to_string()).or_default();
        log.push(user);
        if let Some(reply) = &assistant {
            log.push(reply.clone());
        }

        if let Some(thread) = inner.threads.iter_mut().find(|t| t.id == thread_id) {
            thread.last_updated = now;
        }
        inner.threads.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));

        Ok(SendMessageResponse { assistant })
    }
}
