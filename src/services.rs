// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Collaborator contracts consumed by the converter.
//!
//! Each external service the converter calls into is a narrow trait. Calls are
//! synchronous and any `Err` aborts the whole request.

use crate::events::ConverterEvent;
use crate::types::{Address, Amount, ServiceName};

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("insufficient balance of {token} held by {holder}: {available} < {requested}")]
    InsufficientBalance {
        token: Address,
        holder: Address,
        available: Amount,
        requested: Amount,
    },

    #[error("unknown token {0}")]
    UnknownToken(Address),

    #[error("call rejected: {0}")]
    Rejected(String),
}

/// The flexible token governed by the converter.
pub trait GovernedToken {
    fn issue(&mut self, to: &Address, amount: Amount) -> Result<(), ServiceError>;

    fn destroy(&mut self, from: &Address, amount: Amount) -> Result<(), ServiceError>;

    fn total_supply(&self) -> Result<Amount, ServiceError>;

    /// Current controller of the token; the converter is active while it is the owner.
    fn owner(&self) -> Result<Address, ServiceError>;
}

/// Any IRC2 token the converter holds, reserves included.
pub trait ReserveToken {
    fn balance_of(&self, token: &Address, holder: &Address) -> Result<Amount, ServiceError>;

    /// Transfer `amount` of `token` from the converter's holdings to `to`.
    fn transfer(
        &mut self,
        token: &Address,
        to: &Address,
        amount: Amount,
        memo: &[u8],
    ) -> Result<(), ServiceError>;
}

/// Well-known address lookup through a score registry.
pub trait RegistryResolver {
    /// Resolve `name` through the registry deployed at `registry`.
    fn resolve(&self, registry: &Address, name: ServiceName) -> Result<Option<Address>, ServiceError>;
}

/// Receiver of converter reports.
pub trait EventSink {
    fn emit(&mut self, event: ConverterEvent);
}

/// Everything the converter needs from its host environment.
pub trait Host: GovernedToken + ReserveToken + RegistryResolver + EventSink {}

impl<T> Host for T where T: GovernedToken + ReserveToken + RegistryResolver + EventSink {}
