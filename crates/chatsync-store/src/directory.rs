use chatsync_types::Thread;

/// Proof that a refresh was issued; only the newest one may land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied { changed: bool },
    /// A newer refresh or a local mutation happened after this ticket was issued
    Stale,
}

/// Ordered set of threads visible to the current identity (most recent first)
///
/// Refreshes replace the whole list. Every refresh and every local mutation advances
/// the epoch, so a slow response can never overwrite what a newer request or a local
/// create/delete already established.
#[derive(Debug, Default)]
pub struct ThreadDirectory {
    threads: Vec<Thread>,
    epoch: u64,
}

impl ThreadDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    pub fn get(&self, thread_id: &str) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == thread_id)
    }

    pub fn contains(&self, thread_id: &str) -> bool {
        self.get(thread_id).is_some()
    }

    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.epoch += 1;
        RefreshTicket(self.epoch)
    }

    pub fn complete_refresh(&mut self, ticket: RefreshTicket, threads: Vec<Thread>) -> RefreshOutcome {
        if ticket.0 != self.epoch {
            tracing::debug!(ticket = ticket.0, epoch = self.epoch, "Discarding stale thread refresh");
            return RefreshOutcome::Stale;
        }
        let changed = self.threads != threads;
        self.threads = threads;
        RefreshOutcome::Applied { changed }
    }

    /// Replace from a pushed snapshot; the feed's order is kept as delivered
    pub fn replace_ordered(&mut self, threads: Vec<Thread>) -> bool {
        self.epoch += 1;
        let changed = self.threads != threads;
        self.threads = threads;
        changed
    }

    /// Put a thread at the head; an existing entry with the same id is moved
    pub fn insert_front(&mut self, thread: Thread) {
        self.epoch += 1;
        self.threads.retain(|t| t.id != thread.id);
        self.threads.insert(0, thread);
    }

    pub fn remove(&mut self, thread_id: &str) -> Option<Thread> {
        let index = self.threads.iter().position(|t| t.id == thread_id)?;
        self.epoch += 1;
        Some(self.threads.remove(index))
    }

    pub fn clear(&mut self) {
        self.epoch += 1;
        self.threads.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn thread(id: &str) -> Thread {
        Thread::new(id, format!("Thread {id}"), Utc::now(), "u1")
    }

    #[test]
    fn test_refresh_replaces_wholesale() {
        let mut dir = ThreadDirectory::new();
        let ticket = dir.begin_refresh();
        assert_eq!(
            dir.complete_refresh(ticket, vec![thread("a"), thread("b")]),
            RefreshOutcome::Applied { changed: true }
        );

        let ticket = dir.begin_refresh();
        dir.complete_refresh(ticket, vec![thread("c")]);
        assert_eq!(dir.len(), 1);
        assert!(dir.contains("c"));
        assert!(!dir.contains("a"));
    }

    #[test]
    fn test_repeated_identical_refresh_reports_no_change() {
        let mut dir = ThreadDirectory::new();
        let snapshot = vec![thread("a"), thread("b")];

        let ticket = dir.begin_refresh();
        dir.complete_refresh(ticket, snapshot.clone());
        let first = dir.threads().to_vec();

        let ticket = dir.begin_refresh();
        assert_eq!(
            dir.complete_refresh(ticket, snapshot),
            RefreshOutcome::Applied { changed: false }
        );
        assert_eq!(dir.threads(), first.as_slice());
    }

    #[test]
    fn test_out_of_order_refresh_is_discarded() {
        let mut dir = ThreadDirectory::new();
        let slow = dir.begin_refresh();
        let fast = dir.begin_refresh();

        dir.complete_refresh(fast, vec![thread("new")]);
        assert_eq!(dir.complete_refresh(slow, vec![thread("old")]), RefreshOutcome::Stale);
        assert_eq!(dir.threads()[0].id, "new");
    }

    #[test]
    fn test_local_mutation_invalidates_in_flight_refresh() {
        let mut dir = ThreadDirectory::new();
        let in_flight = dir.begin_refresh();
        dir.insert_front(thread("created"));

        assert_eq!(dir.complete_refresh(in_flight, vec![]), RefreshOutcome::Stale);
        assert!(dir.contains("created"));
    }

    #[test]
    fn test_insert_front_moves_existing() {
        let mut dir = ThreadDirectory::new();
        dir.insert_front(thread("a"));
        dir.insert_front(thread("b"));
        dir.insert_front(thread("a"));

        let ids: Vec<_> = dir.threads().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut dir = ThreadDirectory::new();
        dir.insert_front(thread("a"));
        dir.insert_front(thread("b"));

        assert_eq!(dir.remove("a").map(|t| t.id), Some("a".to_string()));
        assert!(dir.remove("a").is_none());

        let in_flight = dir.begin_refresh();
        dir.clear();
        assert!(dir.is_empty());
        assert_eq!(dir.complete_refresh(in_flight, vec![thread("x")]), RefreshOutcome::Stale);
    }

    #[test]
    fn test_replace_ordered_keeps_feed_order() {
        let mut dir = ThreadDirectory::new();
        assert!(dir.replace_ordered(vec![thread("z"), thread("a")]));
        let ids: Vec<_> = dir.threads().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a"]);
    }
}
