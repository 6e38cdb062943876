// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Constant-weight bonding curve.
//!
//! ```text
//! purchase = supply * ((1 + amount / balance) ^ (weight / 1e6) - 1)
//! sale     = balance * (1 - (1 - amount / supply) ^ (1e6 / weight))
//! cross    = toBalance * (1 - (fromBalance / (fromBalance + amount)) ^ (fromWeight / toWeight))
//! ```
//!
//! All three are deterministic integer functions; results are rounded in
//! favour of the reserve, never the trader.

pub mod power;

pub use power::{power, Power, U512};

use crate::types::{Amount, MAX_WEIGHT};

/// Errors from the curve functions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormulaError {
    #[error("invalid curve input: {0}")]
    InvalidInput(&'static str),

    #[error("curve result overflows the amount range")]
    Overflow,
}

fn require_valid_weight(weight: u32) -> Result<(), FormulaError> {
    if weight == 0 || weight > MAX_WEIGHT {
        return Err(FormulaError::InvalidInput("weight out of range"));
    }
    Ok(())
}

fn to_amount(value: U512) -> Result<Amount, FormulaError> {
    if value.bits() > 128 {
        return Err(FormulaError::Overflow);
    }
    Ok(value.as_u128())
}

fn mul_div(a: Amount, b: Amount, c: Amount) -> Result<Amount, FormulaError> {
    to_amount(U512::from(a) * U512::from(b) / U512::from(c))
}

/// Governed tokens issued for depositing `amount` into a reserve.
pub fn purchase_return(
    supply: Amount,
    reserve_balance: Amount,
    reserve_weight: u32,
    amount: Amount,
) -> Result<Amount, FormulaError> {
    if supply == 0 || reserve_balance == 0 {
        return Err(FormulaError::InvalidInput("empty supply or reserve"));
    }
    require_valid_weight(reserve_weight)?;

    if amount == 0 {
        return Ok(0);
    }
    if reserve_weight == MAX_WEIGHT {
        return mul_div(supply, amount, reserve_balance);
    }

    let base_n = reserve_balance
        .checked_add(amount)
        .ok_or(FormulaError::Overflow)?;
    let growth = power(base_n, reserve_balance, reserve_weight, MAX_WEIGHT)?;
    let grown = growth.scale(supply)?;
    to_amount(grown.checked_sub(U512::from(supply)).unwrap_or_else(U512::zero))
}

/// Reserve tokens returned for destroying `amount` governed tokens.
///
/// Selling the whole supply returns the whole reserve balance; any smaller
/// sale returns strictly less than the balance.
pub fn sale_return(
    supply: Amount,
    reserve_balance: Amount,
    reserve_weight: u32,
    amount: Amount,
) -> Result<Amount, FormulaError> {
    if supply == 0 || reserve_balance == 0 {
        return Err(FormulaError::InvalidInput("empty supply or reserve"));
    }
    require_valid_weight(reserve_weight)?;
    if amount > supply {
        return Err(FormulaError::InvalidInput("sell amount exceeds supply"));
    }

    if amount == 0 {
        return Ok(0);
    }
    if amount == supply {
        return Ok(reserve_balance);
    }
    if reserve_weight == MAX_WEIGHT {
        return mul_div(reserve_balance, amount, supply);
    }

    let shrink = power(supply, supply - amount, MAX_WEIGHT, reserve_weight)?;
    let kept = to_amount(shrink.divide_ceil(reserve_balance))?;
    Ok(reserve_balance - kept)
}

/// Destination reserve tokens returned for depositing `amount` of the source
/// reserve, without touching the governed token supply.
pub fn cross_reserve_return(
    from_balance: Amount,
    from_weight: u32,
    to_balance: Amount,
    to_weight: u32,
    amount: Amount,
) -> Result<Amount, FormulaError> {
    if from_balance == 0 || to_balance == 0 {
        return Err(FormulaError::InvalidInput("empty reserve"));
    }
    require_valid_weight(from_weight)?;
    require_valid_weight(to_weight)?;

    if amount == 0 {
        return Ok(0);
    }

    let base_n = from_balance
        .checked_add(amount)
        .ok_or(FormulaError::Overflow)?;
    if from_weight == to_weight {
        return mul_div(to_balance, amount, base_n);
    }

    let ratio = power(base_n, from_balance, from_weight, to_weight)?;
    let kept = to_amount(ratio.divide_ceil(to_balance))?;
    Ok(to_balance - kept)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
