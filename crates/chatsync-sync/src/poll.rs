use futures::{Stream, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_stream::wrappers::IntervalStream;

/// Turn a fetch function into a snapshot stream that ticks every `period`
///
/// The first fetch happens one period after the call; callers do their own initial
/// load. The stream ends as soon as `fetch` returns `None`.
pub fn polling<T, F, Fut>(period: Duration, mut fetch: F) -> impl Stream<Item = T> + Send + 'static
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Option<T>> + Send + 'static,
{
    let period = period.max(Duration::from_millis(1));
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks = IntervalStream::new(interval);

    async_stream::stream! {
        while ticks.next().await.is_some() {
            match fetch().await {
                Some(snapshot) => yield snapshot,
                None => break,
            }
        }
    }
}
