use std::path::PathBuf;

use thiserror::Error;

use crate::address::AddressError;

pub type Result<T, E = HistoryError> = std::result::Result<T, E>;

/// Top level error type for the history engine.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
}

/// The current selector cannot be turned into a filter.
///
/// Aborts a single pass. The session keeps its previous list and recovers once
/// the selector points at something resolvable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("unknown network type {0:?}")]
    UnknownNetworkType(String),
    #[error("selected address {address:?} is not a valid account address: {source}")]
    InvalidSelectedAddress {
        address: String,
        #[source]
        source: AddressError,
    },
}

/// Errors produced while loading or validating [`HistoryConfig`](crate::HistoryConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Invalid(String),
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
