//! One history screen session.
//!
//! The session owns everything the view needs between passes: the published
//! lists, the loading state and the deferred scroll. The owner of the UI
//! lifecycle drives it through explicit triggers. Each trigger pulls the
//! current snapshot from the feed and runs a pass: relevance filter first,
//! change detector second.
//!
//! Passes never overlap. A trigger arriving while a pass is in flight (for
//! instance from a sink reacting to the update it was just given) is dropped.
//! A dropped feed change loses nothing because every pass reads the freshest
//! snapshot. A dropped selector switch is different: the running pass was
//! computed for the old selector, so the switch asks it to run once more
//! after it finishes.

use std::sync::{
    Arc,
    atomic::{
        AtomicBool,
        Ordering,
    },
};

use parking_lot::{
    Mutex,
    RwLock,
};
use serde::Serialize;
use tracing::{
    debug,
    info,
    warn,
};

use crate::{
    config::HistoryConfig,
    detector::{
        self,
        HistoryView,
        PassMode,
    },
    error::{
        ConfigurationError,
        Result,
    },
    filter::{
        self,
        Selector,
    },
    metrics,
    network::NetworkRegistry,
    record::{
        RawTransaction,
        TransactionRecord,
    },
    scroll::{
        ScrollScheduler,
        ScrollTarget,
    },
};

/// Everything the feed knows at one point in time.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub transactions: Arc<[RawTransaction]>,
    pub selector: Selector,
}

/// Source of raw transactions and the current selection. Read on every pass.
pub trait TransactionFeed: Send + Sync {
    fn snapshot(&self) -> FeedSnapshot;
}

/// A feed holding its state in memory. Writers replace the state wholesale.
#[derive(Debug)]
pub struct InMemoryFeed {
    inner: RwLock<FeedSnapshot>,
}

impl InMemoryFeed {
    pub fn new(selector: Selector) -> Self {
        Self {
            inner: RwLock::new(FeedSnapshot {
                transactions: Arc::from(Vec::new()),
                selector,
            }),
        }
    }

    pub fn set_transactions(&self, transactions: Vec<RawTransaction>) {
        self.inner.write().transactions = Arc::from(transactions);
    }

    /// Replace the selector, returning the previous one.
    pub fn set_selector(&self, selector: Selector) -> Selector {
        std::mem::replace(&mut self.inner.write().selector, selector)
    }

    pub fn selector(&self) -> Selector {
        self.inner.read().selector.clone()
    }
}

impl TransactionFeed for InMemoryFeed {
    fn snapshot(&self) -> FeedSnapshot {
        self.inner.read().clone()
    }
}

/// What the rendering layer gets after a pass.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewUpdate {
    pub visible: Arc<[TransactionRecord]>,
    pub pending: Arc<[TransactionRecord]>,
    /// The visible list was replaced by this pass.
    pub changed: bool,
    /// Advisory; the session already scheduled the scroll itself.
    pub should_scroll_top: bool,
    /// Show a placeholder instead of the list.
    pub loading: bool,
    /// At least one pass completed or aborted since the session started.
    pub history_ready: bool,
}

/// Rendering layer hook.
pub trait ViewSink: Send + Sync {
    fn publish(&self, update: &ViewUpdate);
}

#[derive(Debug, Default)]
pub struct NoopViewSink;

impl ViewSink for NoopViewSink {
    fn publish(&self, _update: &ViewUpdate) {}
}

#[derive(Debug, Clone)]
pub enum PassOutcome {
    /// The pass ran. `update.changed` tells whether the list was replaced.
    Completed(ViewUpdate),
    /// The selector could not be resolved. The previous list is kept and the
    /// loading state is cleared.
    Aborted {
        error: ConfigurationError,
        update: ViewUpdate,
    },
    /// Another pass was in flight.
    Dropped,
    /// The session is not mounted.
    Inactive,
}

impl PassOutcome {
    pub fn update(&self) -> Option<&ViewUpdate> {
        match self {
            Self::Completed(update) | Self::Aborted { update, .. } => Some(update),
            Self::Dropped | Self::Inactive => None,
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    view: HistoryView,
    mounted: bool,
    torn_down: bool,
    loading: bool,
    history_ready: bool,
    /// Set by a selector switch, cleared by the first pass that completes.
    reset_pending: bool,
    /// Bumped on every selector switch and teardown. A pass whose snapshot
    /// predates the current generation is discarded.
    generation: u64,
}

impl SessionState {
    fn update(&self, changed: bool, should_scroll_top: bool) -> ViewUpdate {
        ViewUpdate {
            visible: Arc::clone(&self.view.visible),
            pending: Arc::clone(&self.view.pending),
            changed,
            should_scroll_top,
            loading: self.loading,
            history_ready: self.history_ready,
        }
    }
}

/// Clears the busy flag when a pass ends, however it ends.
struct PassGuard<'a>(&'a AtomicBool);

impl<'a> PassGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Builder that wires the feed, registry, sink and scroll scheduling together.
pub struct HistorySessionBuilder {
    feed: Arc<dyn TransactionFeed>,
    registry: Arc<dyn NetworkRegistry>,
    sink: Option<Arc<dyn ViewSink>>,
    scroll: Option<ScrollScheduler>,
    config: HistoryConfig,
}

impl HistorySessionBuilder {
    pub fn new(feed: Arc<dyn TransactionFeed>, registry: Arc<dyn NetworkRegistry>) -> Self {
        Self {
            feed,
            registry,
            sink: None,
            scroll: None,
            config: HistoryConfig::default(),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ViewSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_config(mut self, config: HistoryConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a prepared scheduler instead of one built from the config.
    pub fn with_scroll_scheduler(mut self, scroll: ScrollScheduler) -> Self {
        self.scroll = Some(scroll);
        self
    }

    pub fn build(self) -> Result<HistorySession> {
        let config = self.config.validate()?;
        let scroll = self
            .scroll
            .unwrap_or_else(|| ScrollScheduler::new(config.scroll_delay(), config.animated_scroll));
        Ok(HistorySession {
            feed: self.feed,
            registry: self.registry,
            sink: self.sink.unwrap_or_else(|| Arc::new(NoopViewSink)),
            scroll,
            normalizing: AtomicBool::new(false),
            rerun: AtomicBool::new(false),
            state: Mutex::new(SessionState::default()),
        })
    }
}

/// Transaction history engine for one screen session.
pub struct HistorySession {
    feed: Arc<dyn TransactionFeed>,
    registry: Arc<dyn NetworkRegistry>,
    sink: Arc<dyn ViewSink>,
    scroll: ScrollScheduler,
    normalizing: AtomicBool,
    /// A selector switch was dropped while a pass was in flight.
    rerun: AtomicBool,
    state: Mutex<SessionState>,
}

impl HistorySession {
    pub fn builder(
        feed: Arc<dyn TransactionFeed>,
        registry: Arc<dyn NetworkRegistry>,
    ) -> HistorySessionBuilder {
        HistorySessionBuilder::new(feed, registry)
    }

    /// The view is ready. Runs the first pass.
    pub fn on_mount(&self) -> PassOutcome {
        {
            let mut state = self.state.lock();
            if state.torn_down {
                return PassOutcome::Inactive;
            }
            state.mounted = true;
        }
        debug!(target: "tx_history", "history session mounted");
        self.normalize_transactions()
    }

    /// The transaction store changed.
    pub fn on_feed_changed(&self) -> PassOutcome {
        self.normalize_transactions()
    }

    /// The account or the network changed.
    ///
    /// The previous context's lists are discarded, the view goes into loading
    /// and the next pass publishes unconditionally. Equal selectors are
    /// treated as a plain feed change.
    pub fn on_selector_changed(&self, prev: &Selector, next: &Selector) -> PassOutcome {
        if prev == next {
            return self.on_feed_changed();
        }

        let loading_update = {
            let mut state = self.state.lock();
            if !state.mounted || state.torn_down {
                return PassOutcome::Inactive;
            }
            state.view = HistoryView::default();
            state.loading = true;
            state.reset_pending = true;
            state.generation += 1;
            state.update(false, false)
        };
        let network_name = self
            .registry
            .display_name(&next.network_type)
            .unwrap_or(&next.network_type);
        info!(
            target: "tx_history",
            prev_network = %prev.network_type,
            next_network = %next.network_type,
            %network_name,
            account_changed = prev.selected_address != next.selected_address,
            "selector changed, reloading history"
        );
        self.publish_guarded(&loading_update);

        self.normalize_transactions()
    }

    /// The view is gone. Pending scrolls are cancelled and later triggers are
    /// ignored.
    pub fn on_teardown(&self) {
        {
            let mut state = self.state.lock();
            state.mounted = false;
            state.torn_down = true;
            state.generation += 1;
            state.view = HistoryView::default();
        }
        self.scroll.clear_target();
        self.scroll.cancel();
        debug!(target: "tx_history", "history session torn down");
    }

    pub fn set_scroll_target(&self, target: &Arc<dyn ScrollTarget>) {
        self.scroll.set_target(target);
    }

    /// Current presentation state, without running a pass.
    pub fn current(&self) -> ViewUpdate {
        self.state.lock().update(false, false)
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    /// Publish outside of a pass, unless one is running; a running pass
    /// publishes a fresher update itself.
    fn publish_guarded(&self, update: &ViewUpdate) {
        if let Some(_guard) = PassGuard::acquire(&self.normalizing) {
            self.sink.publish(update);
        }
    }

    /// Run a pass, then run again for as long as a selector switch arrived
    /// while the previous one was in flight. Returns the last pass's outcome.
    fn normalize_transactions(&self) -> PassOutcome {
        let mut last = None;
        loop {
            let Some(guard) = self.acquire_pass() else {
                return last.unwrap_or_else(|| {
                    debug!(target: "tx_history", "pass already in flight, dropping trigger");
                    metrics::record_pass_dropped();
                    PassOutcome::Dropped
                });
            };
            self.rerun.store(false, Ordering::SeqCst);
            let outcome = self.run_pass();
            drop(guard);

            if !self.rerun.load(Ordering::SeqCst) {
                return outcome;
            }
            last = Some(outcome);
            debug!(target: "tx_history", "selector switched during pass, running again");
        }
    }

    /// Take the busy flag. When it is held and a reset is waiting, leave a
    /// rerun request for the holder and try once more, in case the holder
    /// released the flag before it could see the request.
    fn acquire_pass(&self) -> Option<PassGuard<'_>> {
        if let Some(guard) = PassGuard::acquire(&self.normalizing) {
            return Some(guard);
        }
        if !self.state.lock().reset_pending {
            return None;
        }
        self.rerun.store(true, Ordering::SeqCst);
        PassGuard::acquire(&self.normalizing)
    }

    fn run_pass(&self) -> PassOutcome {
        let generation = {
            let state = self.state.lock();
            if !state.mounted {
                return PassOutcome::Inactive;
            }
            state.generation
        };

        let snapshot = self.feed.snapshot();
        let candidates = match filter::filter(
            &snapshot.transactions,
            &snapshot.selector,
            self.registry.as_ref(),
        ) {
            Ok(candidates) => candidates,
            Err(error) => return self.abort_pass(error),
        };
        metrics::record_malformed(candidates.malformed);

        let (update, was_loading, was_ready) = {
            let mut state = self.state.lock();
            if !state.mounted {
                return PassOutcome::Inactive;
            }
            if state.generation != generation {
                debug!(target: "tx_history", "selector switched mid-pass, discarding result");
                return PassOutcome::Dropped;
            }
            let mode = if state.reset_pending {
                PassMode::Reset
            } else {
                PassMode::Incremental
            };
            let normalized = detector::normalize(candidates.records, &state.view, mode);

            let was_loading = state.loading;
            let was_ready = state.history_ready;
            state.view = normalized.view;
            state.reset_pending = false;
            state.loading = false;
            state.history_ready = true;
            (
                state.update(normalized.changed, normalized.should_scroll_top),
                was_loading,
                was_ready,
            )
        };

        metrics::record_pass(update.changed, update.visible.len());
        debug!(
            target: "tx_history",
            visible = update.visible.len(),
            pending = update.pending.len(),
            malformed = candidates.malformed,
            changed = update.changed,
            "normalized transactions"
        );

        if update.should_scroll_top {
            self.scroll.schedule();
        }
        if update.changed || was_loading || !was_ready {
            self.sink.publish(&update);
        }

        PassOutcome::Completed(update)
    }

    fn abort_pass(&self, error: ConfigurationError) -> PassOutcome {
        warn!(target: "tx_history", %error, "cannot resolve selector, keeping previous history");
        metrics::record_configuration_error();

        let (update, placeholder_shown) = {
            let mut state = self.state.lock();
            let placeholder_shown = state.loading || !state.history_ready;
            state.loading = false;
            state.history_ready = true;
            (state.update(false, false), placeholder_shown)
        };
        if placeholder_shown {
            self.sink.publish(&update);
        }

        PassOutcome::Aborted { error, update }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        network::StaticNetworkRegistry,
        record::TxParams,
    };
    use std::sync::Weak;

    const ALICE: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
    const BOB: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";

    fn tx(id: &str, time: u64, status: &str) -> RawTransaction {
        RawTransaction {
            id: Some(id.into()),
            network_id: Some("1".into()),
            status: Some(status.into()),
            time: Some(time),
            transaction: TxParams {
                from: Some(ALICE.into()),
                to: Some(BOB.into()),
                value: None,
            },
            transaction_hash: None,
        }
    }

    fn session_with_sink(
        sink: Arc<dyn ViewSink>,
    ) -> (Arc<InMemoryFeed>, HistorySession) {
        let feed = Arc::new(InMemoryFeed::new(Selector::new(ALICE, "mainnet")));
        let session = HistorySession::builder(
            feed.clone(),
            Arc::new(StaticNetworkRegistry::default()),
        )
        .with_sink(sink)
        .build()
        .unwrap();
        (feed, session)
    }

    #[derive(Default)]
    struct RecordingSink {
        updates: Mutex<Vec<ViewUpdate>>,
    }

    impl ViewSink for RecordingSink {
        fn publish(&self, update: &ViewUpdate) {
            self.updates.lock().push(update.clone());
        }
    }

    /// Re-triggers the session from inside `publish`, the way a re-rendered
    /// view reacts to the update it just received.
    #[derive(Default)]
    struct ReentrantSink {
        session: Mutex<Weak<HistorySession>>,
        nested: Mutex<Vec<&'static str>>,
    }

    impl ViewSink for ReentrantSink {
        fn publish(&self, _update: &ViewUpdate) {
            if let Some(session) = self.session.lock().upgrade() {
                let outcome = match session.on_feed_changed() {
                    PassOutcome::Dropped => "dropped",
                    _ => "ran",
                };
                self.nested.lock().push(outcome);
            }
        }
    }

    /// Switches the network once, from inside `publish`.
    #[derive(Default)]
    struct SwitchingSink {
        session: Mutex<Weak<HistorySession>>,
        feed: Mutex<Option<Arc<InMemoryFeed>>>,
        nested: Mutex<Option<bool>>,
        updates: Mutex<Vec<ViewUpdate>>,
    }

    impl ViewSink for SwitchingSink {
        fn publish(&self, update: &ViewUpdate) {
            self.updates.lock().push(update.clone());
            if self.nested.lock().is_some() {
                return;
            }
            let session = self.session.lock().upgrade();
            let feed = self.feed.lock().clone();
            if let (Some(session), Some(feed)) = (session, feed) {
                let next = Selector::new(ALICE, "ropsten");
                let prev = feed.set_selector(next.clone());
                let outcome = session.on_selector_changed(&prev, &next);
                *self.nested.lock() = Some(matches!(outcome, PassOutcome::Dropped));
            }
        }
    }

    #[test]
    fn switch_during_a_pass_runs_again_for_the_new_selector() {
        let sink = Arc::new(SwitchingSink::default());
        let (feed, session) = session_with_sink(sink.clone());
        let session = Arc::new(session);
        *sink.session.lock() = Arc::downgrade(&session);
        *sink.feed.lock() = Some(feed.clone());

        let mut ropsten = tx("ropsten", 2, "confirmed");
        ropsten.network_id = Some("3".into());
        feed.set_transactions(vec![tx("mainnet", 1, "confirmed"), ropsten]);

        let update = session.on_mount().update().cloned().unwrap();
        assert_eq!(*sink.nested.lock(), Some(true), "nested switch is deferred");

        let ids = |update: &ViewUpdate| {
            update
                .visible
                .iter()
                .filter_map(|record| record.id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(ids(&update), ["ropsten"]);
        assert!(update.changed);
        assert!(!session.is_loading());

        let updates = sink.updates.lock();
        assert_eq!(updates.len(), 2, "mainnet pass and the rerun");
        assert_eq!(ids(&updates[0]), ["mainnet"]);
        let last = updates.last().unwrap();
        assert_eq!(ids(last), ["ropsten"]);
        assert!(!last.loading);
    }

    #[test]
    fn aborted_first_pass_ends_the_placeholder() {
        let sink = Arc::new(RecordingSink::default());
        let (feed, session) = session_with_sink(sink.clone());
        feed.set_selector(Selector::new(ALICE, "bogus"));

        assert!(matches!(session.on_mount(), PassOutcome::Aborted { .. }));

        let updates = sink.updates.lock();
        assert_eq!(updates.len(), 1);
        assert!(updates[0].history_ready);
        assert!(!updates[0].loading);
        assert!(updates[0].visible.is_empty());
        drop(updates);

        // A second abort has nothing new to show.
        assert!(matches!(session.on_feed_changed(), PassOutcome::Aborted { .. }));
        assert_eq!(sink.updates.lock().len(), 1);
    }

    #[test]
    fn triggers_before_mount_are_inactive() {
        let (feed, session) = session_with_sink(Arc::new(NoopViewSink));
        feed.set_transactions(vec![tx("a", 1, "confirmed")]);

        assert!(matches!(session.on_feed_changed(), PassOutcome::Inactive));
        assert!(!session.current().history_ready);
    }

    #[test]
    fn reentrant_trigger_is_dropped() {
        let sink = Arc::new(ReentrantSink::default());
        let (feed, session) = session_with_sink(sink.clone());
        let session = Arc::new(session);
        *sink.session.lock() = Arc::downgrade(&session);

        feed.set_transactions(vec![tx("a", 1, "confirmed")]);
        let outcome = session.on_mount();

        assert!(matches!(outcome, PassOutcome::Completed(ref u) if u.changed));
        assert_eq!(*sink.nested.lock(), ["dropped"]);

        // The flag is released once the pass ends.
        assert!(matches!(session.on_feed_changed(), PassOutcome::Completed(_)));
    }

    #[test]
    fn sink_only_hears_about_observable_changes() {
        let sink = Arc::new(RecordingSink::default());
        let (feed, session) = session_with_sink(sink.clone());

        session.on_mount();
        feed.set_transactions(vec![tx("a", 1, "pending")]);
        session.on_feed_changed();
        session.on_feed_changed();

        let updates = sink.updates.lock();
        assert_eq!(updates.len(), 2, "first pass and the new transaction");
        assert!(updates[0].history_ready);
        assert!(!updates[0].changed);
        assert!(updates[1].changed);
        assert_eq!(updates[1].pending.len(), 1);
    }

    #[test]
    fn teardown_stops_the_session() {
        let (feed, session) = session_with_sink(Arc::new(NoopViewSink));
        feed.set_transactions(vec![tx("a", 1, "confirmed")]);
        session.on_mount();
        session.on_teardown();

        assert!(matches!(session.on_feed_changed(), PassOutcome::Inactive));
        assert!(matches!(session.on_mount(), PassOutcome::Inactive));
        assert!(session.current().visible.is_empty());
    }

    #[test]
    fn equal_selectors_are_a_feed_change() {
        let (feed, session) = session_with_sink(Arc::new(NoopViewSink));
        feed.set_transactions(vec![tx("a", 1, "confirmed")]);
        session.on_mount();

        let selector = feed.selector();
        let outcome = session.on_selector_changed(&selector, &selector);
        let update = outcome.update().unwrap();
        assert!(!update.changed);
        assert!(!update.loading);
    }
}
