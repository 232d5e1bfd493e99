//! Deferred scroll-to-latest.
//!
//! A refresh asks the list to scroll back to the newest entry, but only after
//! in-flight layout work has settled. The request is a task on the session's
//! runtime that is cancelled when the session is torn down, and that does
//! nothing if the list it targets has been dropped in the meantime.

use std::{
    fmt,
    sync::{
        Arc,
        Weak,
    },
    time::Duration,
};

use parking_lot::Mutex;
use tokio::{
    runtime::Handle,
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::metrics;

/// The scrollable list owned by the rendering layer.
pub trait ScrollTarget: Send + Sync {
    fn scroll_to_index(&self, index: usize, animated: bool);
}

type TargetSlot = Arc<Mutex<Option<Weak<dyn ScrollTarget>>>>;

pub struct ScrollScheduler {
    runtime: Option<Handle>,
    delay: Duration,
    animated: bool,
    target: TargetSlot,
    shutdown_token: CancellationToken,
}

impl fmt::Debug for ScrollScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollScheduler")
            .field("delay", &self.delay)
            .field("animated", &self.animated)
            .field("has_runtime", &self.runtime.is_some())
            .field("cancelled", &self.shutdown_token.is_cancelled())
            .finish()
    }
}

impl ScrollScheduler {
    /// Scheduler that spawns on the runtime the caller is running in, if any.
    /// Without a runtime scroll requests are dropped.
    pub fn new(delay: Duration, animated: bool) -> Self {
        Self::with_runtime(Handle::try_current().ok(), delay, animated)
    }

    pub fn with_runtime(runtime: Option<Handle>, delay: Duration, animated: bool) -> Self {
        Self {
            runtime,
            delay,
            animated,
            target: Arc::new(Mutex::new(None)),
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Register the list to scroll. Only a weak reference is kept.
    pub fn set_target(&self, target: &Arc<dyn ScrollTarget>) {
        *self.target.lock() = Some(Arc::downgrade(target));
    }

    pub fn clear_target(&self) {
        *self.target.lock() = None;
    }

    /// Cancel every pending scroll. Later requests are ignored.
    pub fn cancel(&self) {
        self.shutdown_token.cancel();
    }

    /// Scroll to the newest entry once the delay elapses.
    pub fn schedule(&self) -> Option<JoinHandle<()>> {
        if self.shutdown_token.is_cancelled() {
            return None;
        }
        let Some(runtime) = &self.runtime else {
            debug!(target: "tx_history", "no runtime available, dropping scroll request");
            return None;
        };

        let token = self.shutdown_token.clone();
        let target = Arc::clone(&self.target);
        let delay = self.delay;
        let animated = self.animated;

        Some(runtime.spawn(async move {
            tokio::select! {
                () = token.cancelled() => {
                    metrics::record_scroll("cancelled");
                }
                () = tokio::time::sleep(delay) => {
                    let target = target.lock().as_ref().and_then(Weak::upgrade);
                    match target {
                        Some(target) => {
                            target.scroll_to_index(0, animated);
                            metrics::record_scroll("fired");
                        }
                        None => {
                            debug!(target: "tx_history", "scroll target gone, skipping scroll");
                            metrics::record_scroll("detached");
                        }
                    }
                }
            }
        }))
    }
}

impl Drop for ScrollScheduler {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{
        AtomicUsize,
        Ordering,
    };

    #[derive(Default)]
    struct CountingList {
        scrolls: AtomicUsize,
    }

    impl ScrollTarget for CountingList {
        fn scroll_to_index(&self, index: usize, animated: bool) {
            assert_eq!(index, 0);
            assert!(animated);
            self.scrolls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn list() -> (Arc<CountingList>, Arc<dyn ScrollTarget>) {
        let list = Arc::new(CountingList::default());
        let target: Arc<dyn ScrollTarget> = list.clone();
        (list, target)
    }

    #[tokio::test(start_paused = true)]
    async fn scrolls_after_the_delay() {
        let scheduler = ScrollScheduler::new(Duration::from_secs(1), true);
        let (list, target) = list();
        scheduler.set_target(&target);

        let handle = scheduler.schedule().expect("runtime is available");
        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(list.scrolls.load(Ordering::SeqCst), 0);

        handle.await.unwrap();
        assert_eq!(list.scrolls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_the_scroll() {
        let scheduler = ScrollScheduler::new(Duration::from_secs(1), true);
        let (list, target) = list();
        scheduler.set_target(&target);

        let handle = scheduler.schedule().expect("runtime is available");
        scheduler.cancel();
        handle.await.unwrap();

        assert_eq!(list.scrolls.load(Ordering::SeqCst), 0);
        assert!(scheduler.schedule().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_target_is_a_no_op() {
        let scheduler = ScrollScheduler::new(Duration::from_secs(1), true);
        let (list, target) = list();
        scheduler.set_target(&target);

        let handle = scheduler.schedule().expect("runtime is available");
        drop(target);
        drop(list);
        handle.await.unwrap();
    }

    #[test]
    fn without_runtime_requests_are_dropped() {
        let scheduler = ScrollScheduler::new(Duration::from_secs(1), true);
        assert!(scheduler.schedule().is_none());
    }
}
