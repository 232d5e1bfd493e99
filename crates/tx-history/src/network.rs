//! Lookup from symbolic network types to network ids.

use std::{
    collections::BTreeMap,
    fmt,
};

use crate::{
    config::{
        DEFAULT_CUSTOM_RPC_TYPE,
        HistoryConfig,
    },
    error::ConfigurationError,
};

/// Built-in networks: `(network type, network id, display name)`.
pub const WELL_KNOWN_NETWORKS: [(&str, u64, &str); 5] = [
    ("mainnet", 1, "Ethereum Main Network"),
    ("ropsten", 3, "Ropsten Test Network"),
    ("rinkeby", 4, "Rinkeby Test Network"),
    ("goerli", 5, "Goerli Test Network"),
    ("kovan", 42, "Kovan Test Network"),
];

/// The outcome of resolving a selector's network type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedNetwork {
    /// A network with a fixed id.
    Known { network_id: u64 },
    /// The user's custom RPC endpoint. Its id is arbitrary, so records are
    /// matched by exclusion against every known network.
    CustomRpc,
}

pub trait NetworkRegistry: Send + Sync + fmt::Debug {
    fn resolve(&self, network_type: &str) -> Result<ResolvedNetwork, ConfigurationError>;

    /// `true` if `network_id` belongs to one of the registry's fixed networks.
    fn is_known_network(&self, network_id: &str) -> bool;

    /// Human readable name of a fixed network, for logs.
    fn display_name(&self, network_type: &str) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NetworkEntry {
    network_id: u64,
    name: String,
}

/// A registry backed by a fixed table.
#[derive(Debug, Clone)]
pub struct StaticNetworkRegistry {
    networks: BTreeMap<String, NetworkEntry>,
    custom_rpc_type: String,
}

impl Default for StaticNetworkRegistry {
    fn default() -> Self {
        let networks = WELL_KNOWN_NETWORKS
            .iter()
            .map(|(network_type, network_id, name)| {
                (
                    (*network_type).to_string(),
                    NetworkEntry {
                        network_id: *network_id,
                        name: (*name).to_string(),
                    },
                )
            })
            .collect();

        Self {
            networks,
            custom_rpc_type: DEFAULT_CUSTOM_RPC_TYPE.to_string(),
        }
    }
}

impl StaticNetworkRegistry {
    /// Built-in networks extended with the ones declared in `config`.
    /// Declared networks replace built-ins with the same type.
    pub fn from_config(config: &HistoryConfig) -> Self {
        let mut registry = Self {
            custom_rpc_type: config.custom_rpc_type.clone(),
            ..Self::default()
        };
        for network in &config.networks {
            let name = network
                .name
                .clone()
                .unwrap_or_else(|| network.network_type.clone());
            registry = registry.with_network(&network.network_type, network.network_id, name);
        }
        registry
    }

    pub fn with_network(
        mut self,
        network_type: impl Into<String>,
        network_id: u64,
        name: impl Into<String>,
    ) -> Self {
        self.networks.insert(
            network_type.into(),
            NetworkEntry {
                network_id,
                name: name.into(),
            },
        );
        self
    }

    pub fn custom_rpc_type(&self) -> &str {
        &self.custom_rpc_type
    }
}

impl NetworkRegistry for StaticNetworkRegistry {
    fn resolve(&self, network_type: &str) -> Result<ResolvedNetwork, ConfigurationError> {
        if network_type == self.custom_rpc_type {
            return Ok(ResolvedNetwork::CustomRpc);
        }
        self.networks
            .get(network_type)
            .map(|entry| {
                ResolvedNetwork::Known {
                    network_id: entry.network_id,
                }
            })
            .ok_or_else(|| ConfigurationError::UnknownNetworkType(network_type.to_string()))
    }

    fn is_known_network(&self, network_id: &str) -> bool {
        let Ok(id) = network_id.trim().parse::<u64>() else {
            return false;
        };
        self.networks.values().any(|entry| entry.network_id == id)
    }

    fn display_name(&self, network_type: &str) -> Option<&str> {
        self.networks
            .get(network_type)
            .map(|entry| entry.name.as_str())
    }
}
