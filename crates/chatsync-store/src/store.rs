use chatsync_types::{Message, SyncConfig, Thread};
use chrono::Duration;

use crate::directory::ThreadDirectory;
use crate::log::{MessageLogCache, SyncOutcome, SyncTicket};
use crate::reconcile::OrderPolicy;

/// Directory, per-thread logs and the current selection behind one lock
///
/// The selection always refers to a thread in the directory or is `None`.
#[derive(Debug, Default)]
pub struct ChatStore {
    directory: ThreadDirectory,
    logs: MessageLogCache,
    selected: Option<String>,
}

impl ChatStore {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            directory: ThreadDirectory::new(),
            logs: MessageLogCache::new(OrderPolicy::SortByTimestamp, config.tolerance()),
            selected: None,
        }
    }

    pub fn directory(&self) -> &ThreadDirectory {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut ThreadDirectory {
        &mut self.directory
    }

    pub fn logs(&self) -> &MessageLogCache {
        &self.logs
    }

    pub fn logs_mut(&mut self) -> &mut MessageLogCache {
        &mut self.logs
    }

    pub fn threads(&self) -> &[Thread] {
        self.directory.threads()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_thread(&self) -> Option<&Thread> {
        self.selected.as_deref().and_then(|id| self.directory.get(id))
    }

    pub fn selected_messages(&self) -> &[Message] {
        match self.selected.as_deref() {
            Some(id) => self.logs.get(id),
            None => &[],
        }
    }

    /// Change the selection; an id not present in the directory clears it.
    /// Returns true when the selection actually changed.
    pub fn select(&mut self, thread_id: Option<&str>) -> bool {
        let next = thread_id
            .filter(|id| self.directory.contains(id))
            .map(str::to_string);
        if next == self.selected {
            return false;
        }
        self.selected = next;
        true
    }

    /// Put a newly created thread first and select it. A local id that is already
    /// taken moves forward a millisecond at a time until it is free.
    pub fn adopt(&mut self, mut thread: Thread) -> Thread {
        while thread.is_local() && (self.directory.contains(&thread.id) || self.logs.contains_thread(&thread.id)) {
            let later = thread.last_updated + Duration::milliseconds(1);
            thread = Thread::local(std::mem::take(&mut thread.title), later);
        }
        self.directory.insert_front(thread.clone());
        self.selected = Some(thread.id.clone());
        thread
    }

    pub fn is_selected(&self, thread_id: &str) -> bool {
        self.selected.as_deref() == Some(thread_id)
    }

    /// Drop a selection that no longer points into the directory (after a refresh)
    pub fn prune_selection(&mut self) -> bool {
        match self.selected.as_deref() {
            Some(id) if !self.directory.contains(id) => {
                self.selected = None;
                true
            }
            _ => false,
        }
    }

    pub fn begin_message_sync(&mut self, thread_id: &str) -> SyncTicket {
        self.logs.begin_sync(thread_id)
    }

    /// Apply a fetched snapshot only if its thread is still the selected one
    pub fn complete_message_sync(&mut self, ticket: &SyncTicket, remote: Vec<Message>) -> SyncOutcome {
        if !self.is_selected(ticket.thread_id()) {
            tracing::debug!(thread_id = %ticket.thread_id(), "Thread no longer selected, dropping messages");
            return SyncOutcome::Stale;
        }
        self.logs.complete_sync(ticket, remote)
    }

    /// Remove a thread and its log; clears the selection if it pointed there
    pub fn remove_thread(&mut self, thread_id: &str) -> Option<Thread> {
        let removed = self.directory.remove(thread_id);
        self.logs.remove_thread(thread_id);
        if self.is_selected(thread_id) {
            self.selected = None;
        }
        removed
    }

    /// Forget everything; used on sign-out
    pub fn reset(&mut self) {
        self.directory.clear();
        self.logs.clear();
        self.selected = None;
    }
}
