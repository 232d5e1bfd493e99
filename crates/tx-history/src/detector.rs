//! Change detector and sequencer.
//!
//! Orders the filtered records newest first and decides whether the result is
//! different enough from what is on screen to be worth publishing.
//!
//! The decision is a shallow heuristic on two counts: the number of visible
//! records and the number of pending ones. A pending transaction confirming
//! while another one becomes pending in the same pass leaves both counts
//! unchanged and is therefore not published until some later pass moves a
//! count.

use std::sync::Arc;

use crate::record::TransactionRecord;

/// The lists currently on screen.
///
/// Lists are shared: an unchanged pass hands back the very same allocations so
/// consumers can skip work with a pointer comparison.
#[derive(Debug, Clone)]
pub struct HistoryView {
    pub visible: Arc<[TransactionRecord]>,
    pub pending: Arc<[TransactionRecord]>,
    /// Whether any pass has completed for this context.
    pub published: bool,
}

impl Default for HistoryView {
    fn default() -> Self {
        Self {
            visible: Arc::from(Vec::new()),
            pending: Arc::from(Vec::new()),
            published: false,
        }
    }
}

impl HistoryView {
    pub fn is_first_pass(&self) -> bool {
        !self.published
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    /// Publish only when the heuristic detects a change.
    Incremental,
    /// Always publish. Used for the first pass after an account or network
    /// switch.
    Reset,
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub view: HistoryView,
    pub changed: bool,
    pub should_scroll_top: bool,
}

/// Sort `records` by time, newest first. Records with equal timestamps keep
/// their relative order.
pub fn sort_newest_first(records: &mut [TransactionRecord]) {
    // `sort_by` is stable.
    records.sort_by(|a, b| b.time.cmp(&a.time));
}

pub fn pending_of(visible: &[TransactionRecord]) -> Vec<TransactionRecord> {
    visible
        .iter()
        .filter(|record| record.status.is_pending())
        .cloned()
        .collect()
}

/// Sequence `candidates` and compare them against `previous`.
pub fn normalize(
    mut candidates: Vec<TransactionRecord>,
    previous: &HistoryView,
    mode: PassMode,
) -> Normalized {
    sort_newest_first(&mut candidates);
    let pending = pending_of(&candidates);
    let first_pass = previous.is_first_pass();

    let changed = mode == PassMode::Reset
        || (first_pass && !candidates.is_empty())
        || candidates.len() != previous.visible.len()
        || pending.len() != previous.pending.len();

    if !changed {
        return Normalized {
            view: HistoryView {
                published: true,
                ..previous.clone()
            },
            changed: false,
            should_scroll_top: false,
        };
    }

    // Filling an empty wallet for the first time is not an update worth
    // scrolling for.
    let should_scroll_top = !(first_pass && candidates.is_empty());

    Normalized {
        view: HistoryView {
            visible: Arc::from(candidates),
            pending: Arc::from(pending),
            published: true,
        },
        changed: true,
        should_scroll_top,
    }
}
