// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! In-memory host -- token ledgers, registry tables and an event log.
//!
//! Backs the stress runner, the WASM sandbox and the test suites. Every
//! collaborator trait is implemented over plain maps so a whole converter
//! lifecycle can be replayed without a chain.

use std::collections::HashMap;

use crate::converter::Converter;
use crate::error::ConverterError;
use crate::events::ConverterEvent;
use crate::services::{EventSink, GovernedToken, RegistryResolver, ReserveToken, ServiceError};
use crate::types::{Address, Amount, ServiceName};

#[derive(Debug, Clone)]
pub struct MemoryHost {
    /// Identity the host treats as the caller of `transfer`.
    converter: Address,
    governed: Address,
    token_owner: Address,
    supply: Amount,
    balances: HashMap<Address, HashMap<Address, Amount>>,
    registries: HashMap<Address, HashMap<ServiceName, Address>>,
    events: Vec<ConverterEvent>,
    reject_transfers: bool,
}

impl MemoryHost {
    /// A host whose governed token is still owned by `token_owner`.
    pub fn new(converter: Address, governed: Address, token_owner: Address) -> Self {
        Self {
            converter,
            governed,
            token_owner,
            supply: 0,
            balances: HashMap::new(),
            registries: HashMap::new(),
            events: Vec::new(),
            reject_transfers: false,
        }
    }

    pub fn converter(&self) -> &Address {
        &self.converter
    }

    pub fn governed(&self) -> &Address {
        &self.governed
    }

    /// Hand control of the governed token to `owner`.
    pub fn set_token_owner(&mut self, owner: Address) {
        self.token_owner = owner;
    }

    /// Register `name -> address` inside the registry deployed at `registry`.
    pub fn register(&mut self, registry: &Address, name: ServiceName, address: Address) {
        self.registries
            .entry(registry.clone())
            .or_default()
            .insert(name, address);
    }

    /// Credit `amount` of `token` to `holder` out of thin air. Minting the
    /// governed token this way also grows its supply.
    pub fn mint(&mut self, token: &Address, holder: &Address, amount: Amount) {
        *self
            .balances
            .entry(token.clone())
            .or_default()
            .entry(holder.clone())
            .or_default() += amount;
        if token == &self.governed {
            self.supply += amount;
        }
    }

    pub fn balance(&self, token: &Address, holder: &Address) -> Amount {
        self.balances
            .get(token)
            .and_then(|holders| holders.get(holder))
            .copied()
            .unwrap_or(0)
    }

    /// Move tokens between two holders, e.g. a trader paying the converter.
    pub fn send(
        &mut self,
        token: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), ServiceError> {
        let holders = self.balances.entry(token.clone()).or_default();
        let available = holders.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(ServiceError::InsufficientBalance {
                token: token.clone(),
                holder: from.clone(),
                available,
                requested: amount,
            });
        }
        holders.insert(from.clone(), available - amount);
        *holders.entry(to.clone()).or_default() += amount;
        Ok(())
    }

    /// Make every subsequent `transfer` fail.
    pub fn set_reject_transfers(&mut self, reject: bool) {
        self.reject_transfers = reject;
    }

    pub fn events(&self) -> &[ConverterEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<ConverterEvent> {
        std::mem::take(&mut self.events)
    }
}

impl GovernedToken for MemoryHost {
    fn issue(&mut self, to: &Address, amount: Amount) -> Result<(), ServiceError> {
        let supply = self
            .supply
            .checked_add(amount)
            .ok_or_else(|| ServiceError::Rejected(format!("issuing {amount} overflows total supply")))?;
        let holders = self.balances.entry(self.governed.clone()).or_default();
        let held = holders.get(to).copied().unwrap_or(0);
        let balance = held
            .checked_add(amount)
            .ok_or_else(|| ServiceError::Rejected(format!("issuing {amount} overflows balance of {to}")))?;
        holders.insert(to.clone(), balance);
        self.supply = supply;
        Ok(())
    }

    fn destroy(&mut self, from: &Address, amount: Amount) -> Result<(), ServiceError> {
        let governed = self.governed.clone();
        let available = self.balance(&governed, from);
        if available < amount {
            return Err(ServiceError::InsufficientBalance {
                token: governed,
                holder: from.clone(),
                available,
                requested: amount,
            });
        }
        self.balances
            .entry(governed)
            .or_default()
            .insert(from.clone(), available - amount);
        self.supply -= amount;
        Ok(())
    }

    fn total_supply(&self) -> Result<Amount, ServiceError> {
        Ok(self.supply)
    }

    fn owner(&self) -> Result<Address, ServiceError> {
        Ok(self.token_owner.clone())
    }
}

impl ReserveToken for MemoryHost {
    fn balance_of(&self, token: &Address, holder: &Address) -> Result<Amount, ServiceError> {
        Ok(self.balance(token, holder))
    }

    fn transfer(
        &mut self,
        token: &Address,
        to: &Address,
        amount: Amount,
        _memo: &[u8],
    ) -> Result<(), ServiceError> {
        if self.reject_transfers {
            return Err(ServiceError::Rejected(format!("transfer of {token} refused")));
        }
        let from = self.converter.clone();
        self.send(token, &from, to, amount)
    }
}

impl RegistryResolver for MemoryHost {
    fn resolve(&self, registry: &Address, name: ServiceName) -> Result<Option<Address>, ServiceError> {
        Ok(self
            .registries
            .get(registry)
            .and_then(|entries| entries.get(&name))
            .cloned())
    }
}

impl EventSink for MemoryHost {
    fn emit(&mut self, event: ConverterEvent) {
        self.events.push(event);
    }
}

// ---------------------------------------------------------------------------
// Transactional delivery
// ---------------------------------------------------------------------------

impl Converter<MemoryHost> {
    /// Move `value` of `token` from `from` into the converter and run the
    /// inbound dispatch. On failure the host ledgers are rolled back too, so
    /// the request leaves no trace.
    pub fn deliver(
        &mut self,
        token: &Address,
        from: &Address,
        value: Amount,
        data: &[u8],
    ) -> Result<Option<Amount>, ConverterError> {
        let snapshot = self.host().clone();
        let converter = self.address().clone();
        let outcome = match self.host_mut().send(token, from, &converter, value) {
            Ok(()) => self.on_token_received(token, from, value, data),
            Err(err) => Err(err.into()),
        };
        if outcome.is_err() {
            *self.host_mut() = snapshot;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> MemoryHost {
        MemoryHost::new(Address::contract(0xc0), Address::contract(0xf1e), Address::account(1))
    }

    #[test]
    fn issue_and_destroy_track_supply() {
        let mut host = host();
        let trader = Address::account(7);
        host.issue(&trader, 500).expect("test: issue");
        assert_eq!(host.total_supply(), Ok(500));
        host.destroy(&trader, 200).expect("test: destroy");
        assert_eq!(host.total_supply(), Ok(300));
        assert!(matches!(
            host.destroy(&trader, 301),
            Err(ServiceError::InsufficientBalance { available: 300, .. })
        ));
    }

    #[test]
    fn issue_overflow_is_rejected() {
        let mut host = host();
        let trader = Address::account(7);
        host.issue(&trader, Amount::MAX - 10).expect("test: issue");
        assert!(matches!(
            host.issue(&Address::account(8), 11),
            Err(ServiceError::Rejected(_))
        ));
        assert_eq!(host.total_supply(), Ok(Amount::MAX - 10));
        assert_eq!(host.balance(host.governed(), &Address::account(8)), 0);
    }

    #[test]
    fn transfer_moves_converter_holdings() {
        let mut host = host();
        let reserve = Address::contract(1);
        let converter = host.converter().clone();
        host.mint(&reserve, &converter, 1_000);
        host.transfer(&reserve, &Address::account(9), 400, b"").expect("test: transfer");
        assert_eq!(host.balance(&reserve, &converter), 600);
        assert_eq!(host.balance(&reserve, &Address::account(9)), 400);

        host.set_reject_transfers(true);
        assert!(matches!(
            host.transfer(&reserve, &Address::account(9), 1, b""),
            Err(ServiceError::Rejected(_))
        ));
    }

    #[test]
    fn resolves_registered_names_per_registry() {
        let mut host = host();
        let registry = Address::contract(0x5e6);
        host.register(&registry, ServiceName::Network, Address::contract(0x4e7));
        assert_eq!(
            host.resolve(&registry, ServiceName::Network),
            Ok(Some(Address::contract(0x4e7)))
        );
        assert_eq!(host.resolve(&registry, ServiceName::ScoreRegistry), Ok(None));
        assert_eq!(host.resolve(&Address::contract(2), ServiceName::Network), Ok(None));
    }
}
