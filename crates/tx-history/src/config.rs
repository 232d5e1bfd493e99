use std::{
    collections::HashSet,
    path::Path,
    time::Duration,
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::error::ConfigError;

/// Network type that selects the user's custom RPC endpoint.
pub const DEFAULT_CUSTOM_RPC_TYPE: &str = "rpc";

/// Runtime configuration for a history session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Delay before an advisory scroll-to-top is applied, in milliseconds.
    /// Gives in-flight layout and animations time to settle.
    #[serde(default = "default_scroll_delay_ms")]
    pub scroll_delay_ms: u64,
    /// Whether the scroll-to-top is animated.
    #[serde(default = "default_animated_scroll")]
    pub animated_scroll: bool,
    /// Network type naming the custom RPC endpoint.
    #[serde(default = "default_custom_rpc_type")]
    pub custom_rpc_type: String,
    /// Networks known in addition to the built-in ones.
    #[serde(default)]
    pub networks: Vec<NetworkConfig>,
}

/// An additional named network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub network_type: String,
    pub network_id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

const fn default_scroll_delay_ms() -> u64 {
    1_000
}

const fn default_animated_scroll() -> bool {
    true
}

fn default_custom_rpc_type() -> String {
    DEFAULT_CUSTOM_RPC_TYPE.to_string()
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            scroll_delay_ms: default_scroll_delay_ms(),
            animated_scroll: default_animated_scroll(),
            custom_rpc_type: default_custom_rpc_type(),
            networks: Vec::new(),
        }
    }
}

impl HistoryConfig {
    /// Load a JSON config file. The result is validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|source| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        config.validate()
    }

    /// Validates a configuration loaded from CLI flags or disk.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.custom_rpc_type.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "custom_rpc_type must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for network in &self.networks {
            if network.network_type.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "network_type must not be empty".to_string(),
                ));
            }
            if network.network_type == self.custom_rpc_type {
                return Err(ConfigError::Invalid(format!(
                    "network {} collides with the custom RPC type",
                    network.network_type
                )));
            }
            if !seen.insert(network.network_type.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "network {} is declared twice",
                    network.network_type
                )));
            }
        }

        Ok(self)
    }

    pub fn scroll_delay(&self) -> Duration {
        Duration::from_millis(self.scroll_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_object_yields_defaults() {
        let config: HistoryConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, HistoryConfig::default());
        assert_eq!(config.scroll_delay(), Duration::from_secs(1));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "scroll_delay_ms": 250, "networks": [{{ "network_type": "sepolia", "network_id": 11155111 }}] }}"#
        )
        .unwrap();

        let config = HistoryConfig::from_file(file.path()).unwrap();
        assert_eq!(config.scroll_delay_ms, 250);
        assert!(config.animated_scroll);
        assert_eq!(config.networks[0].network_id, 11_155_111);
    }

    #[test]
    fn reports_unreadable_and_unparseable_files() {
        let missing = HistoryConfig::from_file("/definitely/not/here.json");
        assert!(matches!(missing, Err(ConfigError::Read { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            HistoryConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn rejects_colliding_networks() {
        let network = |network_type: &str| {
            NetworkConfig {
                network_type: network_type.into(),
                network_id: 7,
                name: None,
            }
        };

        let config = HistoryConfig {
            networks: vec![network("rpc")],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = HistoryConfig {
            networks: vec![network("devnet"), network("devnet")],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = HistoryConfig {
            custom_rpc_type: " ".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
