use chatsync_client::{ChatBackend, ClientError, MessageQuery};
use chatsync_store::{ChatStore, RefreshOutcome, RefreshTicket, SessionState, SyncOutcome, SyncTicket};
use chatsync_types::{AuthFailure, AuthNotification, Identity, Message, Notice, SyncConfig, SyncEvent, Thread};
use chrono::Utc;
use futures::{future, Stream, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::{BroadcastStream, WatchStream};

use crate::error::{Result, SyncError};
use crate::poll::polling;
use crate::subscription::Subscription;

const REMOTE_THREAD_TITLE: &str = "New Chat";
const LOCAL_THREAD_TITLE: &str = "Demo Chat";

/// Who asked for a sync; background feeds only report the first failure of an outage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Feedback {
    Foreground,
    Background,
}

#[derive(Default)]
struct Feeds {
    session: Option<Subscription>,
    threads: Option<Subscription>,
    messages: Option<(String, Subscription)>,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct DriverInner {
    pub(crate) backend: Arc<dyn ChatBackend>,
    pub(crate) session: Arc<SessionState>,
    pub(crate) store: RwLock<ChatStore>,
    pub(crate) config: SyncConfig,
    /// Thread id -> token of the send currently in flight there
    pub(crate) sending: Mutex<HashMap<String, u64>>,
    pub(crate) next_send_token: AtomicU64,
    events: broadcast::Sender<SyncEvent>,
    feeds: Mutex<Feeds>,
    active_uid: Mutex<Option<String>>,
    threads_healthy: AtomicBool,
    messages_healthy: AtomicBool,
}

/// Keeps the [`ChatStore`] in step with the backend for the signed-in identity
///
/// Cloning is cheap and every clone drives the same state. Periodic feeds hold only
/// weak references, so they stop once the last clone is dropped.
#[derive(Clone)]
pub struct SyncDriver {
    pub(crate) inner: Arc<DriverInner>,
}

impl SyncDriver {
    pub fn new(backend: Arc<dyn ChatBackend>, session: Arc<SessionState>, config: SyncConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        Self {
            inner: Arc::new(DriverInner {
                backend,
                session,
                store: RwLock::new(ChatStore::new(&config)),
                config,
                sending: Mutex::new(HashMap::new()),
                next_send_token: AtomicU64::new(0),
                events,
                feeds: Mutex::new(Feeds::default()),
                active_uid: Mutex::new(None),
                threads_healthy: AtomicBool::new(true),
                messages_healthy: AtomicBool::new(true),
            }),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.inner.session
    }

    /// Feed one identity-provider notification through the session and react to it.
    /// Returns true when the session actually changed.
    pub async fn handle_session(&self, notification: AuthNotification) -> bool {
        let changed = self.inner.session.apply(notification);
        self.inner.on_identity(self.inner.session.current()).await;
        changed
    }

    /// React to every session change, including ones applied by other holders of
    /// the [`SessionState`]
    pub fn follow_session(&self) {
        let weak = Arc::downgrade(&self.inner);
        let changes = WatchStream::new(self.inner.session.subscribe());
        let subscription = Subscription::start("session", changes, move |identity: Option<Identity>| {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    inner.on_identity(identity).await;
                }
            }
        });
        lock(&self.inner.feeds).session = Some(subscription);
    }

    /// Surface a failed sign-in attempt; the session and caches stay as they are
    pub fn report_auth_failure(&self, failure: &AuthFailure) {
        tracing::warn!(failure = ?failure, "Sign-in failed");
        self.inner.notice(Notice::error(failure.user_message()));
    }

    pub async fn refresh_threads(&self) -> Result<()> {
        self.inner.refresh_threads(Feedback::Foreground).await
    }

    /// Create a thread, put it first and select it
    ///
    /// Without a signed-in identity the thread is local only and no remote call is made.
    pub async fn create_thread(&self, title: Option<&str>) -> Result<Thread> {
        let inner = &self.inner;
        let Some(identity) = inner.session.current() else {
            let thread = Thread::local(title.unwrap_or(LOCAL_THREAD_TITLE), Utc::now());
            let thread = inner.adopt_thread(thread).await;
            tracing::info!(thread_id = %thread.id, "Created local thread");
            inner.notice(Notice::success("Demo chat created"));
            return Ok(thread);
        };

        let thread = match inner.backend.create_thread(title.unwrap_or(REMOTE_THREAD_TITLE)).await {
            Ok(thread) => thread,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to create thread");
                inner.notice(Notice::error("Failed to create new chat"));
                return Err(err.into());
            }
        };

        let still_signed_in = inner.session.current().is_some_and(|current| current.uid == identity.uid);
        if !still_signed_in {
            tracing::debug!(thread_id = %thread.id, "Session changed during create, not adopting thread");
            return Ok(thread);
        }
        tracing::info!(thread_id = %thread.id, "Created thread");
        let thread = inner.adopt_thread(thread).await;
        inner.notice(Notice::success("New chat created"));
        Ok(thread)
    }

    pub async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let inner = &self.inner;
        if !inner.store.read().await.directory().contains(thread_id) {
            return Err(SyncError::UnknownThread(thread_id.to_string()));
        }

        if inner.is_remote_thread(thread_id) {
            match inner.backend.delete_thread(thread_id).await {
                Ok(()) | Err(ClientError::NotFound(_)) => {}
                Err(err) => {
                    tracing::warn!(thread_id, error = %err, "Failed to delete thread");
                    inner.notice(Notice::error("Failed to delete chat"));
                    return Err(err.into());
                }
            }
        }

        let (count, was_selected) = {
            let mut store = inner.store.write().await;
            let was_selected = store.is_selected(thread_id);
            store.remove_thread(thread_id);
            (store.threads().len(), was_selected)
        };
        inner.emit(SyncEvent::ThreadsChanged { count });
        if was_selected {
            inner.stop_message_feed();
            inner.emit(SyncEvent::SelectionChanged { thread_id: None });
        }
        inner.notice(Notice::success("Chat deleted"));
        Ok(())
    }

    /// Change the selected thread. The previous thread's feed is cancelled and the
    /// new one is loaded once before its feed starts. Returns true on change.
    pub async fn select_thread(&self, thread_id: Option<&str>) -> Result<bool> {
        let (changed, selected) = {
            let mut store = self.inner.store.write().await;
            if let Some(id) = thread_id {
                if !store.directory().contains(id) {
                    return Err(SyncError::UnknownThread(id.to_string()));
                }
            }
            let changed = store.select(thread_id);
            (changed, store.selected().map(str::to_string))
        };

        if changed {
            self.inner.on_selection_changed(selected).await;
        }
        Ok(changed)
    }

    /// Fetch one thread's messages and merge them in, if it is still selected when
    /// the response lands
    pub async fn sync_messages(&self, thread_id: &str) -> Result<()> {
        self.inner.sync_messages(thread_id, Feedback::Foreground).await
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }

    /// Events as a stream; entries dropped by a lagging consumer are skipped
    pub fn event_stream(&self) -> impl Stream<Item = SyncEvent> + Send + 'static {
        BroadcastStream::new(self.subscribe_events()).filter_map(|item| {
            if let Err(err) = &item {
                tracing::warn!(error = %err, "Event consumer lagged");
            }
            future::ready(item.ok())
        })
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.session.current()
    }

    pub async fn threads(&self) -> Vec<Thread> {
        self.inner.store.read().await.threads().to_vec()
    }

    pub async fn selected_thread(&self) -> Option<Thread> {
        self.inner.store.read().await.selected_thread().cloned()
    }

    /// Messages of the selected thread
    pub async fn messages(&self) -> Vec<Message> {
        self.inner.store.read().await.selected_messages().to_vec()
    }

    pub async fn messages_for(&self, thread_id: &str) -> Vec<Message> {
        self.inner.store.read().await.logs().get(thread_id).to_vec()
    }

    pub fn is_sending(&self, thread_id: &str) -> bool {
        lock(&self.inner.sending).contains_key(thread_id)
    }

    pub fn thread_feed_active(&self) -> bool {
        lock(&self.inner.feeds)
            .threads
            .as_ref()
            .is_some_and(Subscription::is_active)
    }

    /// Thread whose messages are currently being polled
    pub fn watched_thread(&self) -> Option<String> {
        lock(&self.inner.feeds)
            .messages
            .as_ref()
            .filter(|(_, feed)| feed.is_active())
            .map(|(thread_id, _)| thread_id.clone())
    }

    /// Stop every feed, including the session follower
    pub fn shutdown(&self) {
        let feeds = std::mem::take(&mut *lock(&self.inner.feeds));
        drop(feeds);
        tracing::debug!("Sync driver stopped");
    }
}

impl DriverInner {
    pub(crate) fn emit(&self, event: SyncEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    pub(crate) fn notice(&self, notice: Notice) {
        self.emit(SyncEvent::Notice(notice));
    }

    fn is_active(&self, uid: &str) -> bool {
        lock(&self.active_uid).as_deref() == Some(uid)
    }

    /// Threads of a signed-in session that were not minted locally
    pub(crate) fn is_remote_thread(&self, thread_id: &str) -> bool {
        self.session.is_authenticated() && !Thread::is_local_id(thread_id)
    }

    async fn on_identity(self: &Arc<Self>, identity: Option<Identity>) {
        let uid = identity.map(|identity| identity.uid);
        let previous = {
            let mut active = lock(&self.active_uid);
            if *active == uid {
                return;
            }
            std::mem::replace(&mut *active, uid.clone())
        };

        self.stop_thread_feed();
        self.stop_message_feed();
        lock(&self.sending).clear();
        self.store.write().await.reset();
        tracing::info!(uid = ?uid, previous = ?previous, "Session changed, caches cleared");

        self.emit(SyncEvent::SessionChanged { uid: uid.clone() });
        self.emit(SyncEvent::ThreadsChanged { count: 0 });
        self.emit(SyncEvent::SelectionChanged { thread_id: None });

        match uid {
            Some(uid) => {
                self.threads_healthy.store(true, Ordering::SeqCst);
                self.messages_healthy.store(true, Ordering::SeqCst);
                let _ = self.refresh_threads(Feedback::Foreground).await;
                if self.is_active(&uid) {
                    self.start_thread_feed();
                }
            }
            None if previous.is_some() => self.notice(Notice::success("Signed out successfully")),
            None => {}
        }
    }

    async fn refresh_threads(&self, feedback: Feedback) -> Result<()> {
        if !self.session.is_authenticated() {
            return Ok(());
        }
        let (ticket, result) = self.fetch_threads().await;
        self.apply_threads(ticket, result, feedback).await
    }

    async fn fetch_threads(&self) -> (RefreshTicket, chatsync_client::Result<Vec<Thread>>) {
        let ticket = self.store.write().await.directory_mut().begin_refresh();
        let result = self.backend.list_threads().await;
        (ticket, result)
    }

    async fn apply_threads(
        &self,
        ticket: RefreshTicket,
        result: chatsync_client::Result<Vec<Thread>>,
        feedback: Feedback,
    ) -> Result<()> {
        let threads = match result {
            Ok(threads) => threads,
            Err(err) => {
                self.report_failure(&self.threads_healthy, feedback, "Failed to load chats", &err);
                return Err(err.into());
            }
        };
        self.threads_healthy.store(true, Ordering::SeqCst);

        let (count, changed, pruned) = {
            let mut store = self.store.write().await;
            match store.directory_mut().complete_refresh(ticket, threads) {
                RefreshOutcome::Stale => return Ok(()),
                RefreshOutcome::Applied { changed } => {
                    let pruned = store.prune_selection();
                    (store.threads().len(), changed, pruned)
                }
            }
        };

        if changed {
            tracing::debug!(count, "Thread directory refreshed");
            self.emit(SyncEvent::ThreadsChanged { count });
        }
        if pruned {
            self.stop_message_feed();
            self.emit(SyncEvent::SelectionChanged { thread_id: None });
        }
        Ok(())
    }

    pub(crate) async fn sync_messages(&self, thread_id: &str, feedback: Feedback) -> Result<()> {
        if !self.is_remote_thread(thread_id) {
            return Ok(());
        }
        let (ticket, result) = self.fetch_messages(thread_id).await;
        self.apply_messages(ticket, result, feedback).await
    }

    async fn fetch_messages(&self, thread_id: &str) -> (SyncTicket, chatsync_client::Result<Vec<Message>>) {
        let ticket = self.store.write().await.begin_message_sync(thread_id);
        let query = MessageQuery::new(self.config.message_page_limit);
        let result = self.backend.list_messages(thread_id, query).await;
        (ticket, result)
    }

    async fn apply_messages(
        &self,
        ticket: SyncTicket,
        result: chatsync_client::Result<Vec<Message>>,
        feedback: Feedback,
    ) -> Result<()> {
        let remote = match result {
            Ok(remote) => remote,
            Err(err) => {
                if self.store.read().await.is_selected(ticket.thread_id()) {
                    self.report_failure(&self.messages_healthy, feedback, "Failed to load messages", &err);
                }
                return Err(err.into());
            }
        };
        self.messages_healthy.store(true, Ordering::SeqCst);

        let thread_id = ticket.thread_id().to_string();
        let count = {
            let mut store = self.store.write().await;
            match store.complete_message_sync(&ticket, remote) {
                SyncOutcome::Applied { changed: true, .. } => store.logs().get(&thread_id).len(),
                SyncOutcome::Applied { changed: false, .. } | SyncOutcome::Stale => return Ok(()),
            }
        };
        self.emit(SyncEvent::MessagesChanged { thread_id, count });
        Ok(())
    }

    fn report_failure(&self, healthy: &AtomicBool, feedback: Feedback, message: &str, err: &ClientError) {
        tracing::warn!(error = %err, transient = err.is_transient(), "{}", message);
        let was_healthy = healthy.swap(false, Ordering::SeqCst);
        if feedback == Feedback::Foreground || was_healthy {
            self.notice(Notice::error(message));
        }
    }

    pub(crate) async fn append_message(&self, message: Message) {
        let thread_id = message.thread_id.clone();
        let count = {
            let mut store = self.store.write().await;
            store.logs_mut().append(message);
            store.logs().get(&thread_id).len()
        };
        self.emit(SyncEvent::MessagesChanged { thread_id, count });
    }

    async fn adopt_thread(self: &Arc<Self>, thread: Thread) -> Thread {
        let (thread, count) = {
            let mut store = self.store.write().await;
            let thread = store.adopt(thread);
            (thread, store.threads().len())
        };
        self.emit(SyncEvent::ThreadsChanged { count });
        self.on_selection_changed(Some(thread.id.clone())).await;
        thread
    }

    async fn on_selection_changed(self: &Arc<Self>, selected: Option<String>) {
        self.stop_message_feed();
        self.emit(SyncEvent::SelectionChanged {
            thread_id: selected.clone(),
        });

        let Some(thread_id) = selected.filter(|id| self.is_remote_thread(id)) else {
            return;
        };
        let _ = self.sync_messages(&thread_id, Feedback::Foreground).await;
        if self.store.read().await.is_selected(&thread_id) {
            self.start_message_feed(thread_id);
        }
    }

    fn start_thread_feed(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let fetcher = weak.clone();
        let snapshots = polling(self.config.thread_poll_interval, move || {
            let weak = fetcher.clone();
            async move {
                let inner = weak.upgrade()?;
                Some(inner.fetch_threads().await)
            }
        });

        let subscription = Subscription::start("threads", snapshots, move |(ticket, result)| {
            let weak = weak.clone();
            async move {
                if let Some(inner) = weak.upgrade() {
                    let _ = inner.apply_threads(ticket, result, Feedback::Background).await;
                }
            }
        });
        lock(&self.feeds).threads = Some(subscription);
    }

    fn start_message_feed(self: &Arc<Self>, thread_id: String) {
        let weak = Arc::downgrade(self);
        let fetcher = weak.clone();
        let polled = thread_id.clone();
        let snapshots = polling(self.config.message_poll_interval, move || {
            let weak = fetcher.clone();
            let thread_id = polled.clone();
            async move {
                let inner = weak.upgrade()?;
                Some(inner.fetch_messages(&thread_id).await)
            }
        });

        let subscription = Subscription::start(
            format!("messages:{}", thread_id),
            snapshots,
            move |(ticket, result)| {
                let weak = weak.clone();
                async move {
                    if let Some(inner) = weak.upgrade() {
                        let _ = inner.apply_messages(ticket, result, Feedback::Background).await;
                    }
                }
            },
        );
        lock(&self.feeds).messages = Some((thread_id, subscription));
    }

    fn stop_thread_feed(&self) {
        let feed = lock(&self.feeds).threads.take();
        drop(feed);
    }

    fn stop_message_feed(&self) {
        let feed = lock(&self.feeds).messages.take();
        drop(feed);
    }
}
