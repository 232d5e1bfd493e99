//! Metrics for history sessions.
//!
//! Nothing here installs a recorder; without one every call is a no-op.

#![allow(clippy::cast_precision_loss)]

use metrics::{
    counter,
    histogram,
};

/// Record a completed normalization pass.
///
/// ### Counters
/// - `tx_history_passes_total`: Passes that ran to completion
/// - `tx_history_refreshes_total`: Passes that published a new list
///
/// ### Histograms
/// - `tx_history_visible_transactions`: Length of the visible list after the pass
pub fn record_pass(changed: bool, visible: usize) {
    counter!("tx_history_passes_total").increment(1);
    if changed {
        counter!("tx_history_refreshes_total").increment(1);
    }
    histogram!("tx_history_visible_transactions").record(visible as f64);
}

/// Committed as a `Counter`: `tx_history_passes_dropped_total`
pub fn record_pass_dropped() {
    counter!("tx_history_passes_dropped_total").increment(1);
}

/// Committed as a `Counter`: `tx_history_configuration_errors_total`
pub fn record_configuration_error() {
    counter!("tx_history_configuration_errors_total").increment(1);
}

/// Committed as a `Counter`: `tx_history_malformed_records_total`
pub fn record_malformed(count: usize) {
    if count > 0 {
        counter!("tx_history_malformed_records_total").increment(count as u64);
    }
}

/// Record the fate of a deferred scroll, labelled by `outcome`
/// (`fired`, `cancelled` or `detached`).
pub fn record_scroll(outcome: &'static str) {
    counter!("tx_history_scrolls_total", "outcome" => outcome).increment(1);
}
