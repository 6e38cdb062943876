// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Identity and amount primitives shared by every converter module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConverterError;

/// Token amount in the smallest unit of the token.
pub type Amount = u128;

/// Weight and fee resolution: parts per million.
pub const PPM_RESOLUTION: u32 = 1_000_000;

/// Upper bound of a single reserve weight and of the total reserve weight.
pub const MAX_WEIGHT: u32 = PPM_RESOLUTION;

/// Upper bound of the installed maximum conversion fee.
pub const MAX_CONVERSION_FEE: u32 = PPM_RESOLUTION;

/// Memo attached to every reserve transfer paid out by a conversion.
pub const TRANSFER_DATA: &[u8] = b"conversionResult";

const ADDRESS_BODY_LEN: usize = 40;

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Account or contract identity (`hx...` for accounts, `cx...` for contracts).
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse a textual identity, rejecting anything that is not a prefix
    /// followed by 40 lowercase-insensitive hex digits.
    pub fn parse(text: &str) -> Result<Self, ConverterError> {
        let text = text.trim();
        let (prefix, body) = match (text.get(..2), text.get(2..)) {
            (Some(prefix), Some(body)) => (prefix, body),
            _ => return Err(ConverterError::InvalidAddress(text.to_string())),
        };
        let prefix_ok = prefix == "hx" || prefix == "cx";
        let body_ok = body.len() == ADDRESS_BODY_LEN
            && body.chars().all(|c| c.is_ascii_hexdigit());
        if !prefix_ok || !body_ok {
            return Err(ConverterError::InvalidAddress(text.to_string()));
        }
        Ok(Self(format!("{}{}", prefix, body.to_ascii_lowercase())))
    }

    /// The null account identity.
    pub fn zero() -> Self {
        Self(format!("hx{}", "0".repeat(ADDRESS_BODY_LEN)))
    }

    /// Build a contract identity from a small numeric seed (tests, sandboxes).
    pub fn contract(seed: u64) -> Self {
        Self(format!("cx{:040x}", seed))
    }

    /// Build an account identity from a small numeric seed (tests, sandboxes).
    pub fn account(seed: u64) -> Self {
        Self(format!("hx{:040x}", seed))
    }

    pub fn is_contract(&self) -> bool {
        self.0.starts_with("cx")
    }

    /// Whether the identity is all zeroes.
    pub fn is_zero(&self) -> bool {
        self.0[2..].bytes().all(|b| b == b'0')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Rejects the null identity.
pub fn require_valid_address(address: &Address) -> Result<(), ConverterError> {
    if address.is_zero() {
        return Err(ConverterError::InvalidAddress(address.to_string()));
    }
    Ok(())
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = ConverterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = ConverterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

// ---------------------------------------------------------------------------
// ServiceName
// ---------------------------------------------------------------------------

/// Well-known entries resolved through the score registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceName {
    /// The network contract, the only trader allowed to request conversions.
    Network,
    /// The registry's own forwarding entry.
    ScoreRegistry,
}

impl ServiceName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "Network",
            Self::ScoreRegistry => "ScoreRegistry",
        }
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_account_and_contract() {
        let hx = Address::parse("hx1234567890abcdef1234567890abcdef12345678")
            .expect("test: account address");
        let cx = Address::parse("cxABCDEF7890abcdef1234567890abcdef12345678")
            .expect("test: contract address");
        assert!(!hx.is_contract());
        assert!(cx.is_contract());
        assert_eq!(cx.as_str(), "cxabcdef7890abcdef1234567890abcdef12345678");
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["", "hx", "0x1234567890abcdef1234567890abcdef12345678", "hx12", "hxzz34567890abcdef1234567890abcdef12345678"] {
            let err = Address::parse(bad);
            assert!(
                matches!(err, Err(ConverterError::InvalidAddress(_))),
                "expected InvalidAddress for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn zero_address_is_not_valid() {
        assert!(Address::zero().is_zero());
        assert!(require_valid_address(&Address::zero()).is_err());
        assert!(require_valid_address(&Address::account(1)).is_ok());
    }

    #[test]
    fn seeded_addresses_round_trip_through_serde() {
        let addr = Address::contract(42);
        let json = serde_json::to_string(&addr).expect("test: serialize");
        let back: Address = serde_json::from_str(&json).expect("test: deserialize");
        assert_eq!(addr, back);
        assert!(serde_json::from_str::<Address>("\"nope\"").is_err());
    }
}
