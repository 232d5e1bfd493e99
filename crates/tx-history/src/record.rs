//! Transaction records as stored by the transaction controller, and the
//! validated form the engine works with.

use std::fmt;

use alloy_primitives::Address;
use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::address::{
    self,
    canonicalize_opt,
};

/// Lifecycle status of a transaction.
///
/// The set is open ended: statuses this crate does not know about are kept
/// verbatim in [`TransactionStatus::Other`]. The engine itself only cares
/// about `unapproved` and `pending`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionStatus {
    /// Drafted but not yet approved by the user. Never shown.
    Unapproved,
    Approved,
    Pending,
    Submitted,
    Confirmed,
    Failed,
    Rejected,
    Cancelled,
    Other(String),
}

impl TransactionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unapproved => "unapproved",
            Self::Approved => "approved",
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::Other(other) => other.as_str(),
        }
    }

    pub fn is_unapproved(&self) -> bool {
        matches!(self, Self::Unapproved)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl From<String> for TransactionStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "unapproved" => Self::Unapproved,
            "approved" => Self::Approved,
            "pending" => Self::Pending,
            "submitted" => Self::Submitted,
            "confirmed" => Self::Confirmed,
            "failed" => Self::Failed,
            "rejected" => Self::Rejected,
            "cancelled" => Self::Cancelled,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for TransactionStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<TransactionStatus> for String {
    fn from(value: TransactionStatus) -> Self {
        match value {
            TransactionStatus::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of the underlying Ethereum transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A transaction exactly as the store holds it. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "networkID", default, skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TransactionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<u64>,
    #[serde(default)]
    pub transaction: TxParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MalformedRecord {
    #[error("record has no timestamp")]
    MissingTime,
    #[error("record has neither a valid sender nor a valid recipient")]
    MissingParties,
}

/// A validated transaction record.
///
/// Addresses are parsed, so comparing them is a canonical comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: Option<String>,
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub network_id: Option<String>,
    pub status: TransactionStatus,
    pub time: u64,
    pub value: Option<String>,
    pub hash: Option<String>,
}

impl TransactionRecord {
    /// `true` if `account` sent or received this transaction.
    pub fn involves(&self, account: &Address) -> bool {
        self.from.as_ref() == Some(account) || self.to.as_ref() == Some(account)
    }

    pub fn from_checksummed(&self) -> Option<String> {
        self.from.as_ref().map(address::checksummed)
    }

    pub fn to_checksummed(&self) -> Option<String> {
        self.to.as_ref().map(address::checksummed)
    }
}

impl TryFrom<&RawTransaction> for TransactionRecord {
    type Error = MalformedRecord;

    fn try_from(raw: &RawTransaction) -> Result<Self, Self::Error> {
        let time = raw.time.ok_or(MalformedRecord::MissingTime)?;
        let from = canonicalize_opt(raw.transaction.from.as_deref());
        let to = canonicalize_opt(raw.transaction.to.as_deref());
        if from.is_none() && to.is_none() {
            return Err(MalformedRecord::MissingParties);
        }

        Ok(Self {
            id: raw.id.clone(),
            from,
            to,
            network_id: raw.network_id.clone(),
            // Only an explicit `unapproved` hides a record.
            status: raw
                .status
                .clone()
                .unwrap_or_else(|| TransactionStatus::Other(String::new())),
            time,
            value: raw.transaction.value.clone(),
            hash: raw.transaction_hash.clone(),
        })
    }
}
