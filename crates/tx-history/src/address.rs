//! Account address canonicalization.
//!
//! The transaction store hands us addresses in whatever case the dapp or the
//! user typed them. Everything is parsed into an [`Address`] before comparison,
//! which makes equality independent of case and of the `0x` prefix. The
//! checksummed (EIP-55) string is the canonical textual form.

use std::str::FromStr;

use alloy_primitives::Address;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("invalid hex address: {0}")]
    Hex(String),
}

/// Parse an address string of any case into an [`Address`].
///
/// Mixed-case input is accepted without checksum validation: the store is not
/// guaranteed to hold checksummed values.
pub fn canonicalize(value: &str) -> Result<Address, AddressError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AddressError::Empty);
    }
    Address::from_str(trimmed).map_err(|e| AddressError::Hex(e.to_string()))
}

/// Canonical string form of `address`.
pub fn checksummed(address: &Address) -> String {
    address.to_checksum(None)
}

/// Lenient variant of [`canonicalize`] for record fields, where an absent or
/// garbled address simply cannot match.
pub(crate) fn canonicalize_opt(value: Option<&str>) -> Option<Address> {
    value.and_then(|v| canonicalize(v).ok())
}
