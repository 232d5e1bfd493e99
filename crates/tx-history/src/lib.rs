#![doc = include_str!("../README.md")]
#![allow(clippy::missing_errors_doc)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![warn(clippy::indexing_slicing)]
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::indexing_slicing))]

pub mod address;
pub mod config;
pub mod detector;
pub mod error;
pub mod filter;
mod metrics;
pub mod network;
pub mod record;
pub mod replay;
pub mod scroll;
pub mod session;

pub use config::{
    HistoryConfig,
    NetworkConfig,
};
pub use error::{
    ConfigError,
    ConfigurationError,
    HistoryError,
    Result,
};
pub use filter::Selector;
pub use network::{
    NetworkRegistry,
    StaticNetworkRegistry,
};
pub use record::{
    RawTransaction,
    TransactionRecord,
    TransactionStatus,
};
pub use session::{
    HistorySession,
    HistorySessionBuilder,
    InMemoryFeed,
    PassOutcome,
    TransactionFeed,
    ViewSink,
    ViewUpdate,
};
