use futures::{Stream, StreamExt};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A background task feeding every item of a stream into a callback
///
/// The source can be a timer ([`crate::polling`]) or a push channel; consumers only
/// see snapshots arriving. Once cancelled (or dropped) the callback never runs again.
pub struct Subscription {
    name: String,
    cancelled: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn start<S, F, Fut>(name: impl Into<String>, stream: S, mut on_item: F) -> Self
    where
        S: Stream + Send + 'static,
        S::Item: Send + 'static,
        F: FnMut(S::Item) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let cancelled = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&cancelled);
        let label = name.clone();
        let task = tokio::spawn(async move {
            let mut stream = Box::pin(stream);
            while let Some(item) = stream.next().await {
                if flag.load(Ordering::Acquire) {
                    break;
                }
                on_item(item).await;
            }
            tracing::debug!(subscription = %label, "Subscription source finished");
        });

        tracing::debug!(subscription = %name, "Subscription started");
        Self {
            name,
            cancelled,
            task: Some(task),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cancel(&mut self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!(subscription = %self.name, "Subscription cancelled");
        }
    }

    /// False once cancelled or once the source stream has ended
    pub fn is_active(&self) -> bool {
        !self.cancelled.load(Ordering::Acquire)
            && self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("active", &self.is_active())
            .finish()
    }
}
