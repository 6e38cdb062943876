// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Access control and registry pointer lifecycle.
//!
//! Owner and manager are separate roles, each handed over in two steps: the
//! current holder nominates, the nominee accepts. The registry pointer keeps
//! one step of history so an emergency rollback is always possible.

use serde::{Deserialize, Serialize};

use crate::error::ConverterError;
use crate::types::{require_valid_address, Address};

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roles {
    owner: Address,
    new_owner: Option<Address>,
    manager: Address,
    new_manager: Option<Address>,
}

impl Roles {
    /// The installing owner starts out as manager too.
    pub fn new(owner: Address) -> Self {
        Self {
            manager: owner.clone(),
            owner,
            new_owner: None,
            new_manager: None,
        }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn manager(&self) -> &Address {
        &self.manager
    }

    pub fn pending_owner(&self) -> Option<&Address> {
        self.new_owner.as_ref()
    }

    pub fn pending_manager(&self) -> Option<&Address> {
        self.new_manager.as_ref()
    }

    pub fn is_owner(&self, caller: &Address) -> bool {
        caller == &self.owner
    }

    pub fn is_owner_or_manager(&self, caller: &Address) -> bool {
        caller == &self.owner || caller == &self.manager
    }

    pub fn require_owner(&self, caller: &Address) -> Result<(), ConverterError> {
        if !self.is_owner(caller) {
            return Err(ConverterError::Unauthorized(format!("{caller} is not the owner")));
        }
        Ok(())
    }

    pub fn require_owner_or_manager(&self, caller: &Address) -> Result<(), ConverterError> {
        if !self.is_owner_or_manager(caller) {
            return Err(ConverterError::Unauthorized(format!(
                "{caller} is neither owner nor manager"
            )));
        }
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: &Address) -> Result<(), ConverterError> {
        self.require_owner(caller)?;
        require_valid_address(new_owner)?;
        if new_owner == &self.owner {
            return Err(ConverterError::InvalidIdentity(format!("{new_owner} already owns the converter")));
        }
        self.new_owner = Some(new_owner.clone());
        Ok(())
    }

    pub fn accept_ownership(&mut self, caller: &Address) -> Result<(), ConverterError> {
        if self.new_owner.as_ref() != Some(caller) {
            return Err(ConverterError::Unauthorized(format!("{caller} is not the pending owner")));
        }
        self.owner = caller.clone();
        self.new_owner = None;
        Ok(())
    }

    pub fn transfer_management(&mut self, caller: &Address, new_manager: &Address) -> Result<(), ConverterError> {
        self.require_owner_or_manager(caller)?;
        require_valid_address(new_manager)?;
        if new_manager == &self.manager {
            return Err(ConverterError::InvalidIdentity(format!("{new_manager} already manages the converter")));
        }
        self.new_manager = Some(new_manager.clone());
        Ok(())
    }

    pub fn accept_management(&mut self, caller: &Address) -> Result<(), ConverterError> {
        if self.new_manager.as_ref() != Some(caller) {
            return Err(ConverterError::Unauthorized(format!("{caller} is not the pending manager")));
        }
        self.manager = caller.clone();
        self.new_manager = None;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RegistryPointer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryPointer {
    current: Address,
    previous: Address,
    allow_update: bool,
}

impl RegistryPointer {
    pub fn new(registry: Address) -> Self {
        Self {
            previous: registry.clone(),
            current: registry,
            allow_update: true,
        }
    }

    pub fn current(&self) -> &Address {
        &self.current
    }

    pub fn previous(&self) -> &Address {
        &self.previous
    }

    pub fn allow_update(&self) -> bool {
        self.allow_update
    }

    /// Adopt the address the current registry forwards to.
    pub fn update(&mut self, resolved: Option<Address>) -> Result<(), ConverterError> {
        if !self.allow_update {
            return Err(ConverterError::Unauthorized("registry update is disabled".to_string()));
        }
        let new_registry = resolved
            .ok_or_else(|| ConverterError::InvalidAddress("registry forwards to nothing".to_string()))?;
        require_valid_address(&new_registry)?;
        if new_registry == self.current {
            return Err(ConverterError::InvalidIdentity(
                "new registry should not be same with old one".to_string(),
            ));
        }
        self.previous = std::mem::replace(&mut self.current, new_registry);
        Ok(())
    }

    /// Roll back to the previous registry and lock further updates.
    pub fn restore(&mut self) {
        self.current = self.previous.clone();
        self.allow_update = false;
    }

    pub fn set_allow_update(&mut self, allow: bool) {
        self.allow_update = allow;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Address {
        Address::account(1)
    }

    #[test]
    fn owner_starts_as_manager() {
        let roles = Roles::new(owner());
        assert_eq!(roles.manager(), &owner());
        assert!(roles.is_owner_or_manager(&owner()));
        assert!(roles.require_owner(&Address::account(2)).is_err());
    }

    #[test]
    fn ownership_handover_needs_acceptance() {
        let mut roles = Roles::new(owner());
        let next = Address::account(2);
        roles.transfer_ownership(&owner(), &next).expect("test: nominate");
        assert_eq!(roles.owner(), &owner());
        assert!(matches!(
            roles.accept_ownership(&Address::account(3)),
            Err(ConverterError::Unauthorized(_))
        ));
        roles.accept_ownership(&next).expect("test: accept");
        assert_eq!(roles.owner(), &next);
        assert!(roles.pending_owner().is_none());
        assert!(roles.transfer_ownership(&owner(), &Address::account(4)).is_err());
    }

    #[test]
    fn management_handover() {
        let mut roles = Roles::new(owner());
        let manager = Address::account(5);
        roles.transfer_management(&owner(), &manager).expect("test: nominate");
        roles.accept_management(&manager).expect("test: accept");
        assert_eq!(roles.manager(), &manager);
        assert!(roles.is_owner_or_manager(&manager));
        assert!(!roles.is_owner(&manager));
        assert!(roles.transfer_management(&manager, &Address::zero()).is_err());
    }

    #[test]
    fn registry_update_shifts_history() {
        let mut pointer = RegistryPointer::new(Address::contract(1));
        pointer.update(Some(Address::contract(2))).expect("test: update");
        assert_eq!(pointer.current(), &Address::contract(2));
        assert_eq!(pointer.previous(), &Address::contract(1));
    }

    #[test]
    fn registry_update_rejects_null_and_unchanged() {
        let mut pointer = RegistryPointer::new(Address::contract(1));
        assert!(matches!(pointer.update(None), Err(ConverterError::InvalidAddress(_))));
        assert!(matches!(
            pointer.update(Some(Address::zero())),
            Err(ConverterError::InvalidAddress(_))
        ));
        assert!(matches!(
            pointer.update(Some(Address::contract(1))),
            Err(ConverterError::InvalidIdentity(_))
        ));
        assert_eq!(pointer.current(), &Address::contract(1));
    }

    #[test]
    fn restore_locks_updates_until_reenabled() {
        let mut pointer = RegistryPointer::new(Address::contract(1));
        pointer.update(Some(Address::contract(2))).expect("test: update");
        pointer.restore();
        assert_eq!(pointer.current(), &Address::contract(1));
        assert!(!pointer.allow_update());
        assert!(matches!(
            pointer.update(Some(Address::contract(2))),
            Err(ConverterError::Unauthorized(_))
        ));
        pointer.set_allow_update(true);
        pointer.update(Some(Address::contract(2))).expect("test: update after re-enable");
    }
}
