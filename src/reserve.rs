// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Reserve table -- per-connector weights, virtual balances and purchase flags.
//!
//! The table exclusively owns every reserve record. Records are keyed by token
//! identity and enumerated in insertion order. A record, once added, is never
//! removed, and `total_weight` always equals the sum of all record weights.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ConverterError;
use crate::services::ReserveToken;
use crate::types::{Address, Amount, MAX_WEIGHT};

// ---------------------------------------------------------------------------
// WeightedReserve
// ---------------------------------------------------------------------------

/// Configuration and balance accounting for one reserve token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedReserve {
    /// Constant weight in ppm, `1..=1_000_000`.
    pub weight: u32,
    pub virtual_balance_enabled: bool,
    /// Stand-in balance used by the curve while `virtual_balance_enabled`.
    pub virtual_balance: Amount,
    /// Buying with this reserve can be disabled; selling into it cannot.
    pub purchase_enabled: bool,
}

/// Read-only view of a reserve slot, including whether it is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveInfo {
    pub virtual_balance: Amount,
    pub weight: u32,
    pub is_virtual_balance_enabled: bool,
    pub is_purchase_enabled: bool,
    pub is_set: bool,
}

impl From<&WeightedReserve> for ReserveInfo {
    fn from(reserve: &WeightedReserve) -> Self {
        Self {
            virtual_balance: reserve.virtual_balance,
            weight: reserve.weight,
            is_virtual_balance_enabled: reserve.virtual_balance_enabled,
            is_purchase_enabled: reserve.purchase_enabled,
            is_set: true,
        }
    }
}

fn require_valid_weight(weight: u32) -> Result<(), ConverterError> {
    if weight == 0 || weight > MAX_WEIGHT {
        return Err(ConverterError::InvalidWeight(weight));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ReserveRegistry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveRegistry {
    tokens: Vec<Address>,
    reserves: HashMap<Address, WeightedReserve>,
    total_weight: u32,
}

impl ReserveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a new reserve with a zero virtual balance and purchases enabled.
    ///
    /// `governed` is the flexible token and `converter` the converter's own
    /// identity; neither may become a reserve.
    pub fn add(
        &mut self,
        token: &Address,
        weight: u32,
        virtual_balance_enabled: bool,
        governed: &Address,
        converter: &Address,
    ) -> Result<(), ConverterError> {
        if token == converter {
            return Err(ConverterError::InvalidIdentity(format!(
                "{token} is the converter itself"
            )));
        }
        require_valid_weight(weight)?;
        if token == governed {
            return Err(ConverterError::InvalidIdentity(format!(
                "{token} is the flexible token"
            )));
        }
        if self.reserves.contains_key(token) {
            return Err(ConverterError::DuplicateReserve(token.clone()));
        }
        let total = u64::from(self.total_weight) + u64::from(weight);
        if total > u64::from(MAX_WEIGHT) {
            return Err(ConverterError::WeightOverflow(total));
        }

        self.reserves.insert(
            token.clone(),
            WeightedReserve {
                weight,
                virtual_balance_enabled,
                virtual_balance: 0,
                purchase_enabled: true,
            },
        );
        self.tokens.push(token.clone());
        self.total_weight += weight;
        Ok(())
    }

    /// Replace weight and virtual-balance settings of an existing reserve.
    pub fn update(
        &mut self,
        token: &Address,
        weight: u32,
        virtual_balance_enabled: bool,
        virtual_balance: Amount,
    ) -> Result<(), ConverterError> {
        let old_weight = self.get(token)?.weight;
        require_valid_weight(weight)?;
        let total = u64::from(self.total_weight) - u64::from(old_weight) + u64::from(weight);
        if total > u64::from(MAX_WEIGHT) {
            return Err(ConverterError::WeightOverflow(total));
        }

        let reserve = self.get_mut(token)?;
        reserve.weight = weight;
        reserve.virtual_balance_enabled = virtual_balance_enabled;
        reserve.virtual_balance = virtual_balance;
        self.total_weight = total as u32;
        Ok(())
    }

    pub fn set_purchase_enabled(&mut self, token: &Address, enabled: bool) -> Result<(), ConverterError> {
        self.get_mut(token)?.purchase_enabled = enabled;
        Ok(())
    }

    pub fn get(&self, token: &Address) -> Result<&WeightedReserve, ConverterError> {
        self.reserves
            .get(token)
            .ok_or_else(|| ConverterError::UnknownReserve(token.clone()))
    }

    fn get_mut(&mut self, token: &Address) -> Result<&mut WeightedReserve, ConverterError> {
        self.reserves
            .get_mut(token)
            .ok_or_else(|| ConverterError::UnknownReserve(token.clone()))
    }

    pub fn contains(&self, token: &Address) -> bool {
        self.reserves.contains_key(token)
    }

    /// Slot view; unset slots report `is_set == false` with zeroed fields.
    pub fn info(&self, token: &Address) -> ReserveInfo {
        match self.reserves.get(token) {
            Some(reserve) => reserve.into(),
            None => ReserveInfo {
                virtual_balance: 0,
                weight: 0,
                is_virtual_balance_enabled: false,
                is_purchase_enabled: false,
                is_set: false,
            },
        }
    }

    /// Balance the curve sees: the virtual balance when enabled, otherwise
    /// what `holder` actually owns of `token`.
    pub fn effective_balance<R>(
        &self,
        token: &Address,
        holder: &Address,
        ledger: &R,
    ) -> Result<Amount, ConverterError>
    where
        R: ReserveToken + ?Sized,
    {
        let reserve = self.get(token)?;
        if reserve.virtual_balance_enabled {
            return Ok(reserve.virtual_balance);
        }
        Ok(ledger.balance_of(token, holder)?)
    }

    /// Grow a virtual balance after a deposit; no-op for real balances.
    pub fn credit_virtual(&mut self, token: &Address, amount: Amount) -> Result<(), ConverterError> {
        let reserve = self.get_mut(token)?;
        if !reserve.virtual_balance_enabled {
            return Ok(());
        }
        reserve.virtual_balance = reserve.virtual_balance.checked_add(amount).ok_or_else(|| {
            ConverterError::InvariantViolation(format!("virtual balance of {token} overflows"))
        })?;
        Ok(())
    }

    /// Shrink a virtual balance after a payout; no-op for real balances.
    pub fn debit_virtual(&mut self, token: &Address, amount: Amount) -> Result<(), ConverterError> {
        let reserve = self.get_mut(token)?;
        if !reserve.virtual_balance_enabled {
            return Ok(());
        }
        let current = reserve.virtual_balance;
        reserve.virtual_balance = current.checked_sub(amount).ok_or_else(|| {
            ConverterError::InvariantViolation(format!(
                "virtual balance of {token} underflows: {current} < {amount}"
            ))
        })?;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.tokens.len()
    }

    /// Reserve token at `index` in insertion order.
    pub fn at(&self, index: usize) -> Result<&Address, ConverterError> {
        self.tokens.get(index).ok_or(ConverterError::IndexOutOfRange {
            index,
            count: self.tokens.len(),
        })
    }

    pub fn tokens(&self) -> &[Address] {
        &self.tokens
    }

    pub fn total_weight(&self) -> u32 {
        self.total_weight
    }

    /// Check that the cached total matches the records and stays within 100%.
    pub fn verify(&self) -> Result<(), ConverterError> {
        let sum: u64 = self.reserves.values().map(|r| u64::from(r.weight)).sum();
        if sum != u64::from(self.total_weight) || sum > u64::from(MAX_WEIGHT) {
            return Err(ConverterError::InvariantViolation(format!(
                "total weight {} does not match reserve weights {sum}",
                self.total_weight
            )));
        }
        if self.tokens.len() != self.reserves.len() {
            return Err(ConverterError::InvariantViolation(
                "reserve index out of sync with reserve table".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceError;

    struct FixedBalance(Amount);

    impl ReserveToken for FixedBalance {
        fn balance_of(&self, _token: &Address, _holder: &Address) -> Result<Amount, ServiceError> {
            Ok(self.0)
        }

        fn transfer(&mut self, _: &Address, _: &Address, _: Amount, _: &[u8]) -> Result<(), ServiceError> {
            Ok(())
        }
    }

    fn governed() -> Address {
        Address::contract(0xf1e)
    }

    fn converter() -> Address {
        Address::contract(0xc0)
    }

    fn registry_with(weights: &[u32]) -> ReserveRegistry {
        let mut registry = ReserveRegistry::new();
        for (i, &w) in weights.iter().enumerate() {
            registry
                .add(&Address::contract(i as u64 + 1), w, false, &governed(), &converter())
                .expect("test: add reserve");
        }
        registry
    }

    #[test]
    fn add_tracks_total_and_order() {
        let registry = registry_with(&[300_000, 200_000, 500_000]);
        assert_eq!(registry.total_weight(), 1_000_000);
        assert_eq!(registry.count(), 3);
        assert_eq!(registry.at(1).expect("test: index 1"), &Address::contract(2));
        let reserve = registry.get(&Address::contract(3)).expect("test: reserve 3");
        assert!(reserve.purchase_enabled);
        assert_eq!(reserve.virtual_balance, 0);
        registry.verify().expect("test: invariants hold");
    }

    #[test]
    fn add_rejects_overflow_without_mutation() {
        let mut registry = registry_with(&[600_000]);
        let before = registry.clone();
        let err = registry.add(&Address::contract(9), 400_001, false, &governed(), &converter());
        assert_eq!(err, Err(ConverterError::WeightOverflow(1_000_001)));
        assert_eq!(registry, before);
    }

    #[test]
    fn add_rejects_bad_weights_and_identities() {
        let mut registry = registry_with(&[100_000]);
        let token = Address::contract(7);
        assert_eq!(
            registry.add(&token, 0, false, &governed(), &converter()),
            Err(ConverterError::InvalidWeight(0))
        );
        assert_eq!(
            registry.add(&token, 1_000_001, false, &governed(), &converter()),
            Err(ConverterError::InvalidWeight(1_000_001))
        );
        assert!(matches!(
            registry.add(&governed(), 1, false, &governed(), &converter()),
            Err(ConverterError::InvalidIdentity(_))
        ));
        assert!(matches!(
            registry.add(&converter(), 1, false, &governed(), &converter()),
            Err(ConverterError::InvalidIdentity(_))
        ));
        assert_eq!(
            registry.add(&Address::contract(1), 1, false, &governed(), &converter()),
            Err(ConverterError::DuplicateReserve(Address::contract(1)))
        );
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn update_recomputes_total() {
        let mut registry = registry_with(&[400_000, 400_000]);
        registry
            .update(&Address::contract(1), 600_000, true, 12_345)
            .expect("test: update fits exactly");
        assert_eq!(registry.total_weight(), 1_000_000);
        let reserve = registry.get(&Address::contract(1)).expect("test: reserve");
        assert!(reserve.virtual_balance_enabled);
        assert_eq!(reserve.virtual_balance, 12_345);

        let err = registry.update(&Address::contract(2), 400_001, false, 0);
        assert_eq!(err, Err(ConverterError::WeightOverflow(1_000_001)));
        assert!(matches!(
            registry.update(&Address::contract(99), 1, false, 0),
            Err(ConverterError::UnknownReserve(_))
        ));
        registry.verify().expect("test: invariants hold");
    }

    #[test]
    fn purchase_flag_and_info() {
        let mut registry = registry_with(&[500_000]);
        let token = Address::contract(1);
        registry.set_purchase_enabled(&token, false).expect("test: disable");
        assert!(!registry.info(&token).is_purchase_enabled);
        assert!(registry.info(&token).is_set);
        assert!(!registry.info(&Address::contract(42)).is_set);
        assert!(registry.set_purchase_enabled(&Address::contract(42), false).is_err());
    }

    #[test]
    fn effective_balance_prefers_virtual() {
        let mut registry = registry_with(&[500_000]);
        let token = Address::contract(1);
        let ledger = FixedBalance(777);
        assert_eq!(registry.effective_balance(&token, &converter(), &ledger), Ok(777));

        registry.update(&token, 500_000, true, 1_000).expect("test: enable virtual");
        assert_eq!(registry.effective_balance(&token, &converter(), &ledger), Ok(1_000));
        assert!(registry.effective_balance(&Address::contract(5), &converter(), &ledger).is_err());
    }

    #[test]
    fn virtual_debit_underflow_is_fatal() {
        let mut registry = registry_with(&[500_000]);
        let token = Address::contract(1);
        registry.update(&token, 500_000, true, 10).expect("test: enable virtual");
        registry.credit_virtual(&token, 5).expect("test: credit");
        registry.debit_virtual(&token, 15).expect("test: debit to zero");
        let err = registry.debit_virtual(&token, 1).expect_err("test: underflow");
        assert!(err.is_fatal());
    }

    #[test]
    fn index_out_of_range() {
        let registry = registry_with(&[1]);
        assert_eq!(
            registry.at(1),
            Err(ConverterError::IndexOutOfRange { index: 1, count: 1 })
        );
    }
}
