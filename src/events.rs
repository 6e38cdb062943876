// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Reports produced by the converter.

use num_traits::FromPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{Address, Amount, PPM_RESOLUTION};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum ConverterEvent {
    /// A conversion between two tokens completed.
    #[serde(rename_all = "camelCase")]
    Conversion {
        from_token: Address,
        to_token: Address,
        trader: Address,
        amount: Amount,
        return_amount: Amount,
        conversion_fee: Amount,
    },
    /// Post-trade price inputs for one reserve.
    #[serde(rename_all = "camelCase")]
    PriceDataUpdate {
        reserve_token: Address,
        token_supply: Amount,
        reserve_balance: Amount,
        reserve_weight: u32,
    },
    #[serde(rename_all = "camelCase")]
    ConversionFeeUpdate { prev_fee: u32, new_fee: u32 },
    #[serde(rename_all = "camelCase")]
    ConversionsEnable { enabled: bool },
}

impl ConverterEvent {
    /// Spot price of one governed token in reserve units for a
    /// `PriceDataUpdate`: `balance / (supply * weight)`.
    ///
    /// `None` for other events or when the inputs exceed `Decimal` range.
    pub fn spot_price(&self) -> Option<Decimal> {
        let Self::PriceDataUpdate {
            token_supply,
            reserve_balance,
            reserve_weight,
            ..
        } = self
        else {
            return None;
        };
        let supply = Decimal::from_u128(*token_supply)?;
        let balance = Decimal::from_u128(*reserve_balance)?;
        let weight = Decimal::from_u32(*reserve_weight)? / Decimal::from(PPM_RESOLUTION);
        balance.checked_div(supply.checked_mul(weight)?)
    }

    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::Conversion { .. })
    }

    pub fn is_price_update(&self) -> bool {
        matches!(self, Self::PriceDataUpdate { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn spot_price_of_half_weight_reserve() {
        let event = ConverterEvent::PriceDataUpdate {
            reserve_token: Address::contract(1),
            token_supply: 1_000_000,
            reserve_balance: 500_000,
            reserve_weight: 500_000,
        };
        assert_eq!(event.spot_price(), Some(dec!(1)));
    }

    #[test]
    fn spot_price_only_for_price_updates() {
        let event = ConverterEvent::ConversionsEnable { enabled: true };
        assert_eq!(event.spot_price(), None);
        assert!(!event.is_conversion());
    }

    #[test]
    fn serializes_with_event_tag() {
        let event = ConverterEvent::ConversionFeeUpdate { prev_fee: 0, new_fee: 3_000 };
        let json = serde_json::to_value(&event).expect("test: serialize");
        assert_eq!(json["event"], "conversionFeeUpdate");
        assert_eq!(json["newFee"], 3_000);
    }
}
