// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Request rejection reasons.
//!
//! Every variant except [`ConverterError::InvariantViolation`] is an ordinary
//! rejection of the current request. An invariant violation means the reserve
//! bookkeeping was already inconsistent before the request ran.

use crate::formula::FormulaError;
use crate::services::ServiceError;
use crate::types::Address;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConverterError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid connector weight: {0}")]
    InvalidWeight(u32),

    #[error("total connector weight is overflow: {0}")]
    WeightOverflow(u64),

    #[error("the input token has already been set: {0}")]
    DuplicateReserve(Address),

    #[error("invalid connector: {0}")]
    UnknownReserve(Address),

    #[error("connector index {index} out of range (count {count})")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("invalid conversion fee: {0}")]
    InvalidFee(u32),

    #[error("invalid amount: {0}")]
    InvalidAmount(&'static str),

    #[error("required conversions enabled")]
    ConversionsDisabled,

    #[error("'from token' and 'to token' must not be same")]
    IdenticalTokens,

    #[error("required purchase enabled: {0}")]
    PurchaseDisabled(Address),

    #[error("returning amount less than minimum requested amount ({actual} < {min_return})")]
    SlippageExceeded { actual: u128, min_return: u128 },

    #[error("returning amount does not meet connector balance condition ({amount} vs balance {balance})")]
    ReserveDepletionViolation { amount: u128, balance: u128 },

    #[error("virtual balance of {token} ({balance}) is below the deposit of {deposit}")]
    VirtualBalanceBelowDeposit {
        token: Address,
        balance: u128,
        deposit: u128,
    },

    #[error("required active")]
    NotActive,

    #[error("required inactive")]
    RequiresInactive,

    #[error("malformed conversion request: {0}")]
    MalformedRequest(String),

    #[error("bonding curve: {0}")]
    Curve(#[from] FormulaError),

    #[error("external call failed: {0}")]
    Service(#[from] ServiceError),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl ConverterError {
    /// Whether this error signals corrupted bookkeeping rather than bad input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invariant_violation_is_fatal() {
        assert!(ConverterError::InvariantViolation("x".into()).is_fatal());
        assert!(!ConverterError::IdenticalTokens.is_fatal());
        assert!(!ConverterError::SlippageExceeded { actual: 1, min_return: 2 }.is_fatal());
    }

    #[test]
    fn reason_strings_are_stable() {
        assert_eq!(
            ConverterError::IdenticalTokens.to_string(),
            "'from token' and 'to token' must not be same"
        );
        assert_eq!(ConverterError::NotActive.to_string(), "required active");
        assert_eq!(
            ConverterError::InvalidWeight(0).to_string(),
            "invalid connector weight: 0"
        );
    }
}
