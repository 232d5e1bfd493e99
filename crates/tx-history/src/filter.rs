//! Relevance filter.
//!
//! Selects the records that belong to the current account and network view. A
//! record is kept when the selected account sent or received it, it was
//! submitted on the selected network, and the user approved it.

use alloy_primitives::Address;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::trace;

use crate::{
    address,
    error::ConfigurationError,
    network::{
        NetworkRegistry,
        ResolvedNetwork,
    },
    record::{
        RawTransaction,
        TransactionRecord,
    },
};

/// The viewing context: which account on which network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    pub selected_address: String,
    pub network_type: String,
}

impl Selector {
    pub fn new(selected_address: impl Into<String>, network_type: impl Into<String>) -> Self {
        Self {
            selected_address: selected_address.into(),
            network_type: network_type.into(),
        }
    }
}

/// Records surviving the filter, in feed order, plus how many were skipped
/// for being malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidates {
    pub records: Vec<TransactionRecord>,
    pub malformed: usize,
}

/// Selector with the address parsed and the network resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSelector {
    pub account: Address,
    pub network: ResolvedNetwork,
}

impl ResolvedSelector {
    pub fn resolve(
        selector: &Selector,
        registry: &dyn NetworkRegistry,
    ) -> Result<Self, ConfigurationError> {
        let network = registry.resolve(&selector.network_type)?;
        let account = address::canonicalize(&selector.selected_address).map_err(|source| {
            ConfigurationError::InvalidSelectedAddress {
                address: selector.selected_address.clone(),
                source,
            }
        })?;
        Ok(Self { account, network })
    }

    fn matches_network(&self, record: &TransactionRecord, registry: &dyn NetworkRegistry) -> bool {
        match &self.network {
            ResolvedNetwork::Known { network_id } => {
                record.network_id.as_deref() == Some(network_id.to_string().as_str())
            }
            ResolvedNetwork::CustomRpc => {
                !record
                    .network_id
                    .as_deref()
                    .is_some_and(|id| registry.is_known_network(id))
            }
        }
    }

    /// Apply all inclusion rules to an already validated record.
    pub fn includes(&self, record: &TransactionRecord, registry: &dyn NetworkRegistry) -> bool {
        record.involves(&self.account)
            && self.matches_network(record, registry)
            && !record.status.is_unapproved()
    }
}

/// Select the records of `raw` that belong to the `selector` view.
///
/// Malformed records are skipped and counted, never reported as errors. An
/// unresolvable selector fails the whole call.
pub fn filter(
    raw: &[RawTransaction],
    selector: &Selector,
    registry: &dyn NetworkRegistry,
) -> Result<Candidates, ConfigurationError> {
    let resolved = ResolvedSelector::resolve(selector, registry)?;

    let mut candidates = Candidates::default();
    for tx in raw {
        let record = match TransactionRecord::try_from(tx) {
            Ok(record) => record,
            Err(reason) => {
                trace!(target: "tx_history", id = ?tx.id, %reason, "skipping malformed record");
                candidates.malformed += 1;
                continue;
            }
        };
        if resolved.includes(&record, registry) {
            candidates.records.push(record);
        }
    }

    Ok(candidates)
}
