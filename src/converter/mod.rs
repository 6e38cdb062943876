// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! The converter aggregate.
//!
//! [`Converter`] owns all converter state and the host it calls into. Every
//! mutating operation takes `&mut self`, so requests run one at a time to
//! completion.
//!
//! - [`admin`]: reserve configuration, fees, registry pointer and roles.
//! - [`conversion`]: inbound transfer dispatch, conversions and quotes.

pub mod admin;
pub mod conversion;

pub use conversion::ConversionPath;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use crate::config::ConverterConfig;
use crate::error::ConverterError;
use crate::fee::{final_amount, FeeSchedule};
use crate::governance::{RegistryPointer, Roles};
use crate::reserve::{ReserveInfo, ReserveRegistry};
use crate::services::Host;
use crate::types::{Address, Amount, PPM_RESOLUTION};

// ---------------------------------------------------------------------------
// ConverterState
// ---------------------------------------------------------------------------

/// Snapshot of everything the converter stores itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConverterState {
    address: Address,
    token: Address,
    roles: Roles,
    registry: RegistryPointer,
    reserves: ReserveRegistry,
    fees: FeeSchedule,
    conversions_enabled: bool,
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

pub struct Converter<H: Host> {
    state: ConverterState,
    host: H,
}

impl<H: Host> Converter<H> {
    /// Install a converter over `host`, adding the configured initial reserve.
    pub fn install(config: &ConverterConfig, host: H) -> Result<Self, ConverterError> {
        config.validate()?;
        let fees = FeeSchedule::new(config.max_conversion_fee)?;
        let mut converter = Self {
            state: ConverterState {
                address: config.address.clone(),
                token: config.token.clone(),
                roles: Roles::new(config.owner.clone()),
                registry: RegistryPointer::new(config.registry.clone()),
                reserves: ReserveRegistry::new(),
                fees,
                conversions_enabled: true,
            },
            host,
        };

        if let Some(initial) = &config.initial_reserve {
            converter.add_reserve(&config.owner, &initial.token, initial.weight, false)?;
        }

        info!(
            converter = %config.address,
            token = %config.token,
            max_conversion_fee = config.max_conversion_fee,
            "converter installed"
        );
        Ok(converter)
    }

    pub fn state(&self) -> &ConverterState {
        &self.state
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Active while the converter controls its governed token.
    pub fn is_active(&self) -> Result<bool, ConverterError> {
        Ok(self.host.owner()? == self.state.address)
    }

    pub(crate) fn require_active(&self) -> Result<(), ConverterError> {
        if !self.is_active()? {
            return Err(ConverterError::NotActive);
        }
        Ok(())
    }

    pub(crate) fn require_inactive(&self) -> Result<(), ConverterError> {
        if self.is_active()? {
            return Err(ConverterError::RequiresInactive);
        }
        Ok(())
    }

    pub fn address(&self) -> &Address {
        &self.state.address
    }

    /// The governed flexible token.
    pub fn token(&self) -> &Address {
        &self.state.token
    }

    pub fn owner(&self) -> &Address {
        self.state.roles.owner()
    }

    pub fn manager(&self) -> &Address {
        self.state.roles.manager()
    }

    pub fn pending_owner(&self) -> Option<&Address> {
        self.state.roles.pending_owner()
    }

    pub fn pending_manager(&self) -> Option<&Address> {
        self.state.roles.pending_manager()
    }

    pub fn registry(&self) -> &Address {
        self.state.registry.current()
    }

    pub fn previous_registry(&self) -> &Address {
        self.state.registry.previous()
    }

    pub fn is_registry_update_allowed(&self) -> bool {
        self.state.registry.allow_update()
    }

    pub fn conversions_enabled(&self) -> bool {
        self.state.conversions_enabled
    }

    pub fn conversion_fee(&self) -> u32 {
        self.state.fees.conversion_fee()
    }

    pub fn max_conversion_fee(&self) -> u32 {
        self.state.fees.max_conversion_fee()
    }

    pub fn conversion_fee_percent(&self) -> Decimal {
        self.state.fees.conversion_fee_percent()
    }

    pub fn reserves(&self) -> &ReserveRegistry {
        &self.state.reserves
    }

    pub fn reserve_count(&self) -> usize {
        self.state.reserves.count()
    }

    pub fn reserve_at(&self, index: usize) -> Result<&Address, ConverterError> {
        self.state.reserves.at(index)
    }

    pub fn reserve_info(&self, token: &Address) -> ReserveInfo {
        self.state.reserves.info(token)
    }

    pub fn total_reserve_weight(&self) -> u32 {
        self.state.reserves.total_weight()
    }

    /// Balance the curve uses for `token`: virtual when enabled, otherwise
    /// the converter's real holding.
    pub fn reserve_balance(&self, token: &Address) -> Result<Amount, ConverterError> {
        self.state
            .reserves
            .effective_balance(token, &self.state.address, &self.host)
    }

    /// `amount` after the current fee, compounded `magnitude` times.
    pub fn get_final_amount(&self, amount: Amount, magnitude: u32) -> Amount {
        final_amount(amount, magnitude, self.state.fees.conversion_fee(), PPM_RESOLUTION)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
