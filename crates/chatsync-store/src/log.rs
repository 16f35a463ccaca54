use chatsync_types::{Delivery, Message};
use chrono::Duration;
use std::collections::HashMap;

use crate::reconcile::{merge, MergeReport, OrderPolicy};

/// Tag carried by an in-flight message fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTicket {
    thread_id: String,
    generation: u64,
}

impl SyncTicket {
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied { changed: bool, report: MergeReport },
    Stale,
}

#[derive(Debug, Default)]
struct MessageLog {
    messages: Vec<Message>,
    latest_sync: u64,
}

/// Per-thread ordered message sequences
///
/// Only threads that have been synced or written to have an entry; logs of threads
/// that are not selected may be absent or stale.
#[derive(Debug)]
pub struct MessageLogCache {
    logs: HashMap<String, MessageLog>,
    next_generation: u64,
    policy: OrderPolicy,
    tolerance: Duration,
}

impl Default for MessageLogCache {
    fn default() -> Self {
        Self::new(OrderPolicy::default(), Duration::seconds(10))
    }
}

impl MessageLogCache {
    pub fn new(policy: OrderPolicy, tolerance: Duration) -> Self {
        Self {
            logs: HashMap::new(),
            next_generation: 0,
            policy,
            tolerance,
        }
    }

    pub fn get(&self, thread_id: &str) -> &[Message] {
        self.logs
            .get(thread_id)
            .map(|log| log.messages.as_slice())
            .unwrap_or(&[])
    }

    pub fn contains_thread(&self, thread_id: &str) -> bool {
        self.logs.contains_key(thread_id)
    }

    pub fn find(&self, thread_id: &str, message_id: &str) -> Option<&Message> {
        self.get(thread_id).iter().find(|m| m.id == message_id)
    }

    /// Optimistic tail append; returns false if an entry with this id is already cached
    pub fn append(&mut self, message: Message) -> bool {
        let log = self.logs.entry(message.thread_id.clone()).or_default();
        if log.messages.iter().any(|m| m.id == message.id) {
            return false;
        }
        log.messages.push(message);
        true
    }

    pub fn set_delivery(&mut self, thread_id: &str, message_id: &str, delivery: Delivery) -> bool {
        let Some(log) = self.logs.get_mut(thread_id) else {
            return false;
        };
        match log.messages.iter_mut().find(|m| m.id == message_id) {
            Some(msg) => {
                msg.delivery = delivery;
                true
            }
            None => false,
        }
    }

    /// Issue a fetch for one thread; supersedes any fetch issued before for it
    pub fn begin_sync(&mut self, thread_id: &str) -> SyncTicket {
        self.next_generation += 1;
        let log = self.logs.entry(thread_id.to_string()).or_default();
        log.latest_sync = self.next_generation;
        SyncTicket {
            thread_id: thread_id.to_string(),
            generation: self.next_generation,
        }
    }

    /// True if `ticket` is still the newest fetch for its thread
    pub fn is_current(&self, ticket: &SyncTicket) -> bool {
        self.logs
            .get(&ticket.thread_id)
            .is_some_and(|log| log.latest_sync == ticket.generation)
    }

    /// Merge a remote snapshot into the thread's log, touching no other thread
    pub fn complete_sync(&mut self, ticket: &SyncTicket, remote: Vec<Message>) -> SyncOutcome {
        if !self.is_current(ticket) {
            tracing::debug!(thread_id = %ticket.thread_id, "Discarding superseded message sync");
            return SyncOutcome::Stale;
        }
        let (policy, tolerance) = (self.policy, self.tolerance);
        let Some(log) = self.logs.get_mut(&ticket.thread_id) else {
            return SyncOutcome::Stale;
        };

        let merged = merge(&log.messages, remote, policy, tolerance);
        let changed = merged.messages != log.messages;
        log.messages = merged.messages;

        tracing::debug!(
            thread_id = %ticket.thread_id,
            count = log.messages.len(),
            superseded = merged.report.superseded,
            kept_local = merged.report.kept_local,
            "Message log synced"
        );
        SyncOutcome::Applied { changed, report: merged.report }
    }

    pub fn remove_thread(&mut self, thread_id: &str) -> bool {
        self.logs.remove(thread_id).is_some()
    }

    pub fn clear(&mut self) {
        self.logs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatsync_types::Role;
    use chrono::Utc;

    fn user(thread: &str, text: &str) -> Message {
        Message::provisional(thread, text, Utc::now())
    }

    #[test]
    fn test_append_preserves_call_order() {
        let mut cache = MessageLogCache::default();
        let texts = ["one", "two", "three", "four"];
        for text in texts {
            assert!(cache.append(user("t1", text)));
        }
        let got: Vec<_> = cache.get("t1").iter().map(|m| m.text.as_str()).collect();
        assert_eq!(got, texts);
    }

    #[test]
    fn test_append_ignores_known_id() {
        let mut cache = MessageLogCache::default();
        let msg = user("t1", "hi");
        assert!(cache.append(msg.clone()));
        assert!(!cache.append(msg));
        assert_eq!(cache.get("t1").len(), 1);
    }

    #[test]
    fn test_sync_only_touches_its_thread() {
        let mut cache = MessageLogCache::default();
        cache.append(user("other", "keep me"));

        let ticket = cache.begin_sync("t1");
        let remote = vec![Message::synced("m1", "t1", Role::User, "hi", Utc::now())];
        assert!(matches!(cache.complete_sync(&ticket, remote), SyncOutcome::Applied { changed: true, .. }));

        assert_eq!(cache.get("t1").len(), 1);
        assert_eq!(cache.get("other").len(), 1);
    }

    #[test]
    fn test_superseded_ticket_is_stale() {
        let mut cache = MessageLogCache::default();
        let first = cache.begin_sync("t1");
        let second = cache.begin_sync("t1");

        let now = Utc::now();
        assert!(matches!(
            cache.complete_sync(&second, vec![Message::synced("new", "t1", Role::User, "b", now)]),
            SyncOutcome::Applied { .. }
        ));
        assert_eq!(
            cache.complete_sync(&first, vec![Message::synced("old", "t1", Role::User, "a", now)]),
            SyncOutcome::Stale
        );
        assert_eq!(cache.get("t1")[0].id, "new");
    }

    #[test]
    fn test_tickets_are_per_thread() {
        let mut cache = MessageLogCache::default();
        let a = cache.begin_sync("a");
        let _b = cache.begin_sync("b");
        assert!(cache.is_current(&a));
    }

    #[test]
    fn test_cleared_cache_rejects_in_flight_sync() {
        let mut cache = MessageLogCache::default();
        let ticket = cache.begin_sync("t1");
        cache.clear();
        assert_eq!(cache.complete_sync(&ticket, vec![]), SyncOutcome::Stale);
        assert!(!cache.contains_thread("t1"));
    }

    #[test]
    fn test_set_delivery() {
        let mut cache = MessageLogCache::default();
        let msg = user("t1", "hi");
        let id = msg.id.clone();
        cache.append(msg);

        assert!(cache.set_delivery("t1", &id, Delivery::Failed));
        assert_eq!(cache.find("t1", &id).map(|m| m.delivery), Some(Delivery::Failed));
        assert!(!cache.set_delivery("t1", "missing", Delivery::Sent));
        assert!(!cache.set_delivery("nope", &id, Delivery::Sent));
    }

    #[test]
    fn test_unsynced_thread_is_empty() {
        let cache = MessageLogCache::default();
        assert!(cache.get("never").is_empty());
    }
}
