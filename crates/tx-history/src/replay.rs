//! Drives a session over recorded store snapshots.
//!
//! The first snapshot mounts the session. Every later one replaces the feed's
//! transactions and fires a selector change when the account or network
//! differs from the previous snapshot, otherwise a feed change.

use std::sync::Arc;

use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    config::HistoryConfig,
    error::Result,
    filter::Selector,
    network::StaticNetworkRegistry,
    record::RawTransaction,
    scroll::ScrollTarget,
    session::{
        HistorySession,
        InMemoryFeed,
        PassOutcome,
        ViewUpdate,
    },
};

/// One recorded state of the transaction store.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedSnapshot {
    pub selected_address: String,
    pub network_type: String,
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
}

impl RecordedSnapshot {
    pub fn selector(&self) -> Selector {
        Selector::new(&self.selected_address, &self.network_type)
    }
}

/// The printed result of one replay step.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayLine {
    pub step: usize,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update: Option<ViewUpdate>,
}

impl ReplayLine {
    fn new(step: usize, outcome: &PassOutcome) -> Self {
        let (label, error) = match outcome {
            PassOutcome::Completed(_) => ("completed", None),
            PassOutcome::Aborted { error, .. } => ("aborted", Some(error.to_string())),
            PassOutcome::Dropped => ("dropped", None),
            PassOutcome::Inactive => ("inactive", None),
        };
        Self {
            step,
            outcome: label,
            error,
            update: outcome.update().cloned(),
        }
    }
}

pub struct Replayer {
    feed: Arc<InMemoryFeed>,
    session: HistorySession,
    step: usize,
}

impl Replayer {
    /// Session over an empty feed selecting `selector`. Networks declared in
    /// `config` extend the built-in registry.
    pub fn new(selector: Selector, config: HistoryConfig) -> Result<Self> {
        let feed = Arc::new(InMemoryFeed::new(selector));
        let registry = Arc::new(StaticNetworkRegistry::from_config(&config));
        let session = HistorySession::builder(feed.clone(), registry)
            .with_config(config)
            .build()?;
        Ok(Self {
            feed,
            session,
            step: 0,
        })
    }

    pub fn set_scroll_target(&self, target: &Arc<dyn ScrollTarget>) {
        self.session.set_scroll_target(target);
    }

    /// Apply the next snapshot and fire the matching trigger.
    pub fn apply(&mut self, snapshot: &RecordedSnapshot) -> ReplayLine {
        self.feed.set_transactions(snapshot.transactions.clone());
        let next = snapshot.selector();
        let prev = self.feed.set_selector(next.clone());

        let outcome = if self.step == 0 {
            self.session.on_mount()
        } else if prev == next {
            self.session.on_feed_changed()
        } else {
            self.session.on_selector_changed(&prev, &next)
        };

        let line = ReplayLine::new(self.step, &outcome);
        self.step += 1;
        line
    }

    pub fn finish(self) {
        self.session.on_teardown();
    }
}
