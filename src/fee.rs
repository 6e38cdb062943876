// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Conversion fee -- trimming a raw curve output down to what the trader gets.
//!
//! ```text
//! final = raw * (resolution - fee) ^ magnitude / resolution ^ magnitude
//! ```
//!
//! Magnitude is 1 for a buy or sell and 2 for a cross-reserve conversion,
//! which chains two fee-bearing legs in a single curve evaluation.

use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConverterError;
use crate::formula::U512;
use crate::types::{Amount, MAX_CONVERSION_FEE, PPM_RESOLUTION};

/// Fee exponent for a buy or a sell.
pub const SINGLE_LEG: u32 = 1;

/// Fee exponent for a cross-reserve conversion.
pub const CROSS_LEG: u32 = 2;

/// Fee-adjusted `raw_amount`, truncated.
///
/// `fee` and `resolution` are both in parts per `resolution`; the caller
/// guarantees `fee <= resolution`.
pub fn final_amount(raw_amount: Amount, magnitude: u32, fee: u32, resolution: u32) -> Amount {
    if resolution == 0 {
        return raw_amount;
    }
    let ratio = U512::from(resolution.saturating_sub(fee)).pow(U512::from(magnitude));
    let scale = U512::from(resolution).pow(U512::from(magnitude));
    // result <= raw_amount, so it always fits
    (U512::from(raw_amount) * ratio / scale).as_u128()
}

// ---------------------------------------------------------------------------
// ConversionQuote
// ---------------------------------------------------------------------------

/// Expected return of a conversion and the fee withheld from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionQuote {
    pub amount: Amount,
    pub fee: Amount,
}

// ---------------------------------------------------------------------------
// FeeSchedule
// ---------------------------------------------------------------------------

/// Current conversion fee and its immutable ceiling, both in ppm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    conversion_fee: u32,
    max_conversion_fee: u32,
}

impl FeeSchedule {
    /// Install a schedule with a zero fee and the given ceiling.
    pub fn new(max_conversion_fee: u32) -> Result<Self, ConverterError> {
        if max_conversion_fee > MAX_CONVERSION_FEE {
            return Err(ConverterError::InvalidFee(max_conversion_fee));
        }
        Ok(Self {
            conversion_fee: 0,
            max_conversion_fee,
        })
    }

    pub fn conversion_fee(&self) -> u32 {
        self.conversion_fee
    }

    pub fn max_conversion_fee(&self) -> u32 {
        self.max_conversion_fee
    }

    /// Replace the fee, returning the previous one.
    pub fn set_conversion_fee(&mut self, fee: u32) -> Result<u32, ConverterError> {
        if fee > self.max_conversion_fee {
            return Err(ConverterError::InvalidFee(fee));
        }
        Ok(std::mem::replace(&mut self.conversion_fee, fee))
    }

    /// Apply the current fee to a raw curve output.
    pub fn quote(&self, raw_amount: Amount, magnitude: u32) -> ConversionQuote {
        let amount = final_amount(raw_amount, magnitude, self.conversion_fee, PPM_RESOLUTION);
        ConversionQuote {
            amount,
            fee: raw_amount - amount,
        }
    }

    /// Current fee as a percentage (`2500` ppm -> `0.25`).
    pub fn conversion_fee_percent(&self) -> Decimal {
        Decimal::from_u32(self.conversion_fee).unwrap_or(Decimal::ZERO) / Decimal::from(10_000)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const RES: u32 = PPM_RESOLUTION;

    #[test]
    fn zero_fee_is_identity() {
        for raw in [0, 1, 999, u128::MAX] {
            assert_eq!(final_amount(raw, SINGLE_LEG, 0, RES), raw);
            assert_eq!(final_amount(raw, CROSS_LEG, 0, RES), raw);
        }
    }

    #[test]
    fn fee_never_increases_amount() {
        for fee in [1, 100, 2_500, 500_000, RES] {
            for raw in [1, 999, 1_000_000, u128::MAX] {
                let single = final_amount(raw, SINGLE_LEG, fee, RES);
                assert!(single <= raw);
                if raw >= 1_000_000 {
                    assert!(single < raw, "fee {fee} left {raw} untouched");
                }
            }
        }
    }

    #[test]
    fn cross_fee_compounds() {
        for fee in [1, 3_000, 250_000] {
            let single = final_amount(1_000_000, SINGLE_LEG, fee, RES);
            let double = final_amount(1_000_000, CROSS_LEG, fee, RES);
            assert!(double <= single, "fee {fee}: {double} > {single}");
        }
        assert_eq!(final_amount(1_000_000, SINGLE_LEG, 2_500, RES), 997_500);
        assert_eq!(final_amount(1_000_000, CROSS_LEG, 2_500, RES), 995_006);
    }

    #[test]
    fn truncates_rather_than_rounds() {
        // 999 * 0.997 = 996.003
        assert_eq!(final_amount(999, SINGLE_LEG, 3_000, RES), 996);
        // 999 * 0.997^2 = 993.0
        assert_eq!(final_amount(999, CROSS_LEG, 3_000, RES), 993);
    }

    #[test]
    fn quote_splits_fee() {
        let mut schedule = FeeSchedule::new(10_000).expect("test: schedule");
        schedule.set_conversion_fee(3_000).expect("test: set fee");
        let quote = schedule.quote(999, SINGLE_LEG);
        assert_eq!(quote, ConversionQuote { amount: 996, fee: 3 });
    }

    #[test]
    fn fee_bounded_by_ceiling() {
        let mut schedule = FeeSchedule::new(10_000).expect("test: schedule");
        assert_eq!(schedule.set_conversion_fee(10_000), Ok(0));
        assert_eq!(schedule.set_conversion_fee(10_001), Err(ConverterError::InvalidFee(10_001)));
        assert_eq!(schedule.conversion_fee(), 10_000);
        assert!(matches!(FeeSchedule::new(RES + 1), Err(ConverterError::InvalidFee(_))));
    }

    #[test]
    fn fee_percent() {
        let mut schedule = FeeSchedule::new(RES).expect("test: schedule");
        schedule.set_conversion_fee(2_500).expect("test: set fee");
        assert_eq!(schedule.conversion_fee_percent(), dec!(0.25));
    }
}
