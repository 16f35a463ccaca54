use chatsync_client::SendMessageRequest;
use chatsync_types::{validate_message_text, Delivery, Message, Notice, SyncEvent};
use chrono::Utc;
use std::collections::hash_map::Entry;
use std::sync::atomic::Ordering;

use crate::driver::{lock, DriverInner, SyncDriver};
use crate::error::{Result, SyncError};

/// Marks a thread as having a send in flight until dropped. A guard only clears
/// the entry it created.
struct InFlight<'a> {
    inner: &'a DriverInner,
    thread_id: String,
    token: u64,
}

impl<'a> InFlight<'a> {
    fn acquire(inner: &'a DriverInner, thread_id: &str) -> Result<Self> {
        let token = inner.next_send_token.fetch_add(1, Ordering::SeqCst);
        match lock(&inner.sending).entry(thread_id.to_string()) {
            Entry::Occupied(_) => return Err(SyncError::SendInFlight(thread_id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(token);
            }
        }
        inner.emit(SyncEvent::SendingChanged {
            thread_id: thread_id.to_string(),
            in_flight: true,
        });
        Ok(Self {
            inner,
            thread_id: thread_id.to_string(),
            token,
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let released = {
            let mut sending = lock(&self.inner.sending);
            if sending.get(&self.thread_id) == Some(&self.token) {
                sending.remove(&self.thread_id);
                true
            } else {
                false
            }
        };
        if released {
            self.inner.emit(SyncEvent::SendingChanged {
                thread_id: std::mem::take(&mut self.thread_id),
                in_flight: false,
            });
        }
    }
}

impl SyncDriver {
    /// Send text to the selected thread
    ///
    /// The user's message is appended to the cache before the backend is contacted and
    /// stays there if the send fails (marked [`Delivery::Failed`], see
    /// [`SyncDriver::retry_message`]). A reply returned by the backend is appended too.
    /// Whitespace-only input is ignored and yields `Ok(None)`. Local threads never
    /// reach the backend and get no reply.
    pub async fn send_message(&self, text: &str) -> Result<Option<Message>> {
        let Ok(text) = validate_message_text(text) else {
            return Ok(None);
        };
        let inner = &self.inner;

        let selected = inner.store.read().await.selected().map(str::to_string);
        let Some(thread_id) = selected else {
            inner.notice(Notice::error("Please select a chat first"));
            return Err(SyncError::NoThreadSelected);
        };
        let _in_flight = InFlight::acquire(inner, &thread_id)?;

        let message = Message::provisional(&thread_id, text, Utc::now());
        if !inner.is_remote_thread(&thread_id) {
            let message = message.with_delivery(Delivery::Sent);
            inner.append_message(message.clone()).await;
            tracing::debug!(thread_id = %thread_id, "Stored message in local thread");
            return Ok(Some(message));
        }

        let client_id = message.id.clone();
        let message = message.with_client_message_id(client_id);
        inner.append_message(message.clone()).await;
        inner.deliver(message).await.map(Some)
    }

    /// Send a failed message of the selected thread again
    pub async fn retry_message(&self, message_id: &str) -> Result<Message> {
        let inner = &self.inner;
        let message = {
            let store = inner.store.read().await;
            let thread_id = store.selected().ok_or(SyncError::NoThreadSelected)?;
            store
                .logs()
                .find(thread_id, message_id)
                .filter(|message| message.delivery == Delivery::Failed)
                .cloned()
                .ok_or_else(|| SyncError::UnknownMessage(message_id.to_string()))?
        };
        let _in_flight = InFlight::acquire(inner, &message.thread_id)?;

        inner.set_delivery(&message, Delivery::Pending).await;
        tracing::info!(thread_id = %message.thread_id, message_id, "Retrying send");
        inner.deliver(message).await
    }
}

impl DriverInner {
    async fn set_delivery(&self, message: &Message, delivery: Delivery) {
        let count = {
            let mut store = self.store.write().await;
            if !store.logs_mut().set_delivery(&message.thread_id, &message.id, delivery) {
                return;
            }
            store.logs().get(&message.thread_id).len()
        };
        self.emit(SyncEvent::MessagesChanged {
            thread_id: message.thread_id.clone(),
            count,
        });
    }

    /// Authoritative write of an already appended message
    async fn deliver(&self, message: Message) -> Result<Message> {
        let request = SendMessageRequest::new(&message.text, &message.id);
        let response = match self.backend.send_message(&message.thread_id, request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(thread_id = %message.thread_id, error = %err, "Failed to send message");
                self.set_delivery(&message, Delivery::Failed).await;
                self.notice(Notice::error("Failed to send message"));
                return Err(err.into());
            }
        };

        self.set_delivery(&message, Delivery::Sent).await;
        if let Some(reply) = response.assistant {
            let known = self.store.read().await.logs().contains_thread(&reply.thread_id);
            if known {
                // Held as local until a snapshot contains it
                self.append_message(reply.with_delivery(Delivery::Sent)).await;
            }
        }
        Ok(message.with_delivery(Delivery::Sent))
    }
}
