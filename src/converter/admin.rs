// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Administrative operations.
//!
//! | operation                   | role             | lifecycle          |
//! |-----------------------------|------------------|--------------------|
//! | `add_reserve`               | owner            | inactive           |
//! | `update_reserve`            | owner or manager | any                |
//! | `disable_reserve_purchases` | owner or manager | any                |
//! | `update_registry`           | anyone           | updates allowed    |
//! | `restore_registry`          | owner or manager | any                |
//! | `disable_registry_update`   | owner or manager | re-enable by owner |
//! | `disable_conversions`       | owner or manager | any                |
//! | `set_conversion_fee`        | owner or manager | any                |
//! | `withdraw_stranded_tokens`  | owner            | reserves: inactive |

use tracing::info;

use super::Converter;
use crate::error::ConverterError;
use crate::events::ConverterEvent;
use crate::services::Host;
use crate::types::{require_valid_address, Address, Amount, ServiceName};

impl<H: Host> Converter<H> {
    // -----------------------------------------------------------------------
    // Reserves
    // -----------------------------------------------------------------------

    pub fn add_reserve(
        &mut self,
        caller: &Address,
        token: &Address,
        weight: u32,
        virtual_balance_enabled: bool,
    ) -> Result<(), ConverterError> {
        self.state.roles.require_owner(caller)?;
        self.require_inactive()?;
        require_valid_address(token)?;
        self.state.reserves.add(
            token,
            weight,
            virtual_balance_enabled,
            &self.state.token,
            &self.state.address,
        )?;
        info!(reserve = %token, weight, virtual_balance_enabled, "reserve added");
        Ok(())
    }

    pub fn update_reserve(
        &mut self,
        caller: &Address,
        token: &Address,
        weight: u32,
        virtual_balance_enabled: bool,
        virtual_balance: Amount,
    ) -> Result<(), ConverterError> {
        self.state.roles.require_owner_or_manager(caller)?;
        self.state
            .reserves
            .update(token, weight, virtual_balance_enabled, virtual_balance)?;
        info!(
            reserve = %token,
            weight,
            virtual_balance_enabled,
            virtual_balance = %virtual_balance,
            "reserve updated"
        );
        Ok(())
    }

    pub fn disable_reserve_purchases(
        &mut self,
        caller: &Address,
        token: &Address,
        disable: bool,
    ) -> Result<(), ConverterError> {
        self.state.roles.require_owner_or_manager(caller)?;
        self.state.reserves.set_purchase_enabled(token, !disable)?;
        info!(reserve = %token, purchase_enabled = !disable, "reserve purchases toggled");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Registry pointer
    // -----------------------------------------------------------------------

    /// Follow the current registry's own forwarding entry.
    ///
    /// Open to any caller while updates are allowed; `caller` is recorded in
    /// the log only.
    pub fn update_registry(&mut self, caller: &Address) -> Result<(), ConverterError> {
        if !self.state.registry.allow_update() {
            return Err(ConverterError::Unauthorized("registry update is disabled".to_string()));
        }
        let resolved = self
            .host
            .resolve(self.state.registry.current(), ServiceName::ScoreRegistry)?;
        self.state.registry.update(resolved)?;
        info!(
            caller = %caller,
            registry = %self.state.registry.current(),
            previous = %self.state.registry.previous(),
            "registry updated"
        );
        Ok(())
    }

    /// Roll back to the previous registry and lock automatic updates.
    pub fn restore_registry(&mut self, caller: &Address) -> Result<(), ConverterError> {
        self.state.roles.require_owner_or_manager(caller)?;
        self.state.registry.restore();
        info!(registry = %self.state.registry.current(), "registry restored");
        Ok(())
    }

    pub fn disable_registry_update(&mut self, caller: &Address, disable: bool) -> Result<(), ConverterError> {
        if disable {
            self.state.roles.require_owner_or_manager(caller)?;
        } else {
            self.state.roles.require_owner(caller)?;
        }
        self.state.registry.set_allow_update(!disable);
        info!(allow_update = !disable, "registry update toggled");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Conversion switches
    // -----------------------------------------------------------------------

    /// Turn conversions off or on; reports only an actual change.
    pub fn disable_conversions(&mut self, caller: &Address, disable: bool) -> Result<(), ConverterError> {
        self.state.roles.require_owner_or_manager(caller)?;
        let enabled = !disable;
        if self.state.conversions_enabled != enabled {
            self.state.conversions_enabled = enabled;
            self.host.emit(ConverterEvent::ConversionsEnable { enabled });
            info!(enabled, "conversions toggled");
        }
        Ok(())
    }

    pub fn set_conversion_fee(&mut self, caller: &Address, fee: u32) -> Result<(), ConverterError> {
        self.state.roles.require_owner_or_manager(caller)?;
        let prev_fee = self.state.fees.set_conversion_fee(fee)?;
        self.host.emit(ConverterEvent::ConversionFeeUpdate {
            prev_fee,
            new_fee: fee,
        });
        info!(prev_fee, new_fee = fee, "conversion fee updated");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Maintenance
    // -----------------------------------------------------------------------

    /// Send tokens held by the converter to `to`. Live reserves stay locked
    /// while the converter is active.
    pub fn withdraw_stranded_tokens(
        &mut self,
        caller: &Address,
        token: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), ConverterError> {
        self.state.roles.require_owner(caller)?;
        require_valid_address(to)?;
        if to == &self.state.address {
            return Err(ConverterError::InvalidIdentity(
                "cannot withdraw to the converter itself".to_string(),
            ));
        }
        if amount == 0 {
            return Err(ConverterError::InvalidAmount("withdraw amount must be positive"));
        }
        if self.state.reserves.contains(token) && self.is_active()? {
            return Err(ConverterError::RequiresInactive);
        }
        self.host.transfer(token, to, amount, b"")?;
        info!(token = %token, to = %to, amount = %amount, "stranded tokens withdrawn");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Roles
    // -----------------------------------------------------------------------

    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: &Address) -> Result<(), ConverterError> {
        self.state.roles.transfer_ownership(caller, new_owner)?;
        info!(new_owner = %new_owner, "ownership transfer proposed");
        Ok(())
    }

    pub fn accept_ownership(&mut self, caller: &Address) -> Result<(), ConverterError> {
        self.state.roles.accept_ownership(caller)?;
        info!(owner = %caller, "ownership accepted");
        Ok(())
    }

    pub fn transfer_management(&mut self, caller: &Address, new_manager: &Address) -> Result<(), ConverterError> {
        self.state.roles.transfer_management(caller, new_manager)?;
        info!(new_manager = %new_manager, "management transfer proposed");
        Ok(())
    }

    pub fn accept_management(&mut self, caller: &Address) -> Result<(), ConverterError> {
        self.state.roles.accept_management(caller)?;
        info!(manager = %caller, "management accepted");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
