// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Conversion engine.
//!
//! A request moves through validate -> classify -> curve -> fee -> reserve
//! bookkeeping -> token calls -> reports. The reserve table is checkpointed
//! before the path runs and restored if any later step fails; reports are
//! buffered and reach the sink only once the whole path has succeeded.
//!
//! Balance handling follows the deposit-first model: by the time a conversion
//! runs, the incoming tokens already sit in the converter's real balance. The
//! source reserve is priced at its effective balance minus the deposit, for
//! real and virtual balances alike. A virtual balance is credited afterwards.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::Converter;
use crate::error::ConverterError;
use crate::events::ConverterEvent;
use crate::fee::{ConversionQuote, CROSS_LEG, SINGLE_LEG};
use crate::formula::{cross_reserve_return, purchase_return, sale_return};
use crate::request::{ConversionParams, InboundRequest};
use crate::services::Host;
use crate::types::{Address, Amount, ServiceName, TRANSFER_DATA};

/// Which side of the curve a conversion uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConversionPath {
    /// Reserve token in, governed token out.
    Buy,
    /// Governed token in, reserve token out.
    Sell,
    /// Reserve token in, another reserve token out.
    Cross,
}

impl ConversionPath {
    pub fn classify(governed: &Address, from_token: &Address, to_token: &Address) -> Self {
        if to_token == governed {
            Self::Buy
        } else if from_token == governed {
            Self::Sell
        } else {
            Self::Cross
        }
    }
}

impl<H: Host> Converter<H> {
    // -----------------------------------------------------------------------
    // Inbound transfers
    // -----------------------------------------------------------------------

    /// Decide what an inbound transfer of `token` from `from` asks for.
    pub fn decode_transfer(
        &self,
        token: &Address,
        from: &Address,
        data: &[u8],
    ) -> Result<InboundRequest, ConverterError> {
        if self.state.roles.is_owner_or_manager(from)
            && self.state.reserves.contains(token)
            && !self.is_active()?
        {
            return Ok(InboundRequest::Deposit);
        }

        let network = self
            .host
            .resolve(self.state.registry.current(), ServiceName::Network)?;
        if network.as_ref() != Some(from) {
            return Err(ConverterError::Unauthorized(
                "'trader' must be network only".to_string(),
            ));
        }
        Ok(InboundRequest::Convert(ConversionParams::from_bytes(data)?))
    }

    /// Handle `value` of `token` that `from` has just transferred in.
    ///
    /// Returns the conversion result, or `None` for an operator deposit.
    pub fn on_token_received(
        &mut self,
        token: &Address,
        from: &Address,
        value: Amount,
        data: &[u8],
    ) -> Result<Option<Amount>, ConverterError> {
        if value == 0 {
            return Err(ConverterError::InvalidAmount("transferred value must be positive"));
        }
        match self.decode_transfer(token, from, data)? {
            InboundRequest::Deposit => {
                info!(reserve = %token, from = %from, value = %value, "reserve deposit received");
                Ok(None)
            }
            InboundRequest::Convert(params) => self
                .convert(from, token, &params.to_token, value, params.min_return)
                .map(Some),
        }
    }

    // -----------------------------------------------------------------------
    // Conversion
    // -----------------------------------------------------------------------

    /// Convert `amount` of `from_token`, already held by the converter, into
    /// `to_token` for `trader`.
    pub fn convert(
        &mut self,
        trader: &Address,
        from_token: &Address,
        to_token: &Address,
        amount: Amount,
        min_return: Amount,
    ) -> Result<Amount, ConverterError> {
        if !self.state.conversions_enabled {
            return Err(ConverterError::ConversionsDisabled);
        }
        if amount == 0 {
            return Err(ConverterError::InvalidAmount("conversion amount must be positive"));
        }
        if min_return == 0 {
            return Err(ConverterError::InvalidAmount("minimum return must be positive"));
        }
        if from_token == to_token {
            return Err(ConverterError::IdenticalTokens);
        }

        let path = ConversionPath::classify(&self.state.token, from_token, to_token);
        let checkpoint = self.state.reserves.clone();
        let mut reports = Vec::with_capacity(3);

        let outcome = match path {
            ConversionPath::Buy => self.buy(trader, from_token, amount, min_return, &mut reports),
            ConversionPath::Sell => self.sell(trader, to_token, amount, min_return, &mut reports),
            ConversionPath::Cross => {
                self.cross(trader, from_token, to_token, amount, min_return, &mut reports)
            }
        };

        match outcome {
            Ok(return_amount) => {
                for report in reports {
                    self.host.emit(report);
                }
                info!(
                    ?path,
                    trader = %trader,
                    from = %from_token,
                    to = %to_token,
                    amount = %amount,
                    return_amount = %return_amount,
                    "conversion completed"
                );
                Ok(return_amount)
            }
            Err(err) => {
                self.state.reserves = checkpoint;
                if err.is_fatal() {
                    error!(?path, from = %from_token, to = %to_token, %err, "reserve bookkeeping corrupted");
                } else {
                    warn!(?path, from = %from_token, to = %to_token, %err, "conversion rejected");
                }
                Err(err)
            }
        }
    }

    fn buy(
        &mut self,
        trader: &Address,
        reserve_token: &Address,
        amount: Amount,
        min_return: Amount,
        reports: &mut Vec<ConverterEvent>,
    ) -> Result<Amount, ConverterError> {
        let quote = self.purchase_quote(reserve_token, amount, true)?;
        require_min_return(&quote, min_return)?;

        self.state.reserves.credit_virtual(reserve_token, amount)?;
        self.host.issue(trader, quote.amount)?;

        reports.push(ConverterEvent::Conversion {
            from_token: reserve_token.clone(),
            to_token: self.state.token.clone(),
            trader: trader.clone(),
            amount,
            return_amount: quote.amount,
            conversion_fee: quote.fee,
        });
        let supply = self.host.total_supply()?;
        reports.push(self.price_update(reserve_token, supply)?);
        Ok(quote.amount)
    }

    fn sell(
        &mut self,
        trader: &Address,
        reserve_token: &Address,
        amount: Amount,
        min_return: Amount,
        reports: &mut Vec<ConverterEvent>,
    ) -> Result<Amount, ConverterError> {
        let quote = self.sale_quote(reserve_token, amount)?;
        require_min_return(&quote, min_return)?;

        // only a full redemption may empty the reserve
        let supply = self.host.total_supply()?;
        let balance = self.reserve_balance(reserve_token)?;
        let drains_exactly = quote.amount == balance && amount == supply;
        if quote.amount >= balance && !drains_exactly {
            return Err(ConverterError::ReserveDepletionViolation {
                amount: quote.amount,
                balance,
            });
        }

        self.state.reserves.debit_virtual(reserve_token, quote.amount)?;
        let address = self.state.address.clone();
        self.host.destroy(&address, amount)?;
        self.host
            .transfer(reserve_token, trader, quote.amount, TRANSFER_DATA)?;

        reports.push(ConverterEvent::Conversion {
            from_token: self.state.token.clone(),
            to_token: reserve_token.clone(),
            trader: trader.clone(),
            amount,
            return_amount: quote.amount,
            conversion_fee: quote.fee,
        });
        let supply = self.host.total_supply()?;
        reports.push(self.price_update(reserve_token, supply)?);
        Ok(quote.amount)
    }

    fn cross(
        &mut self,
        trader: &Address,
        from_token: &Address,
        to_token: &Address,
        amount: Amount,
        min_return: Amount,
        reports: &mut Vec<ConverterEvent>,
    ) -> Result<Amount, ConverterError> {
        let quote = self.cross_quote(from_token, to_token, amount, true)?;
        require_min_return(&quote, min_return)?;

        let to_balance = self.reserve_balance(to_token)?;
        if quote.amount >= to_balance {
            return Err(ConverterError::ReserveDepletionViolation {
                amount: quote.amount,
                balance: to_balance,
            });
        }

        self.state.reserves.credit_virtual(from_token, amount)?;
        self.state.reserves.debit_virtual(to_token, quote.amount)?;
        self.host
            .transfer(to_token, trader, quote.amount, TRANSFER_DATA)?;

        reports.push(ConverterEvent::Conversion {
            from_token: from_token.clone(),
            to_token: to_token.clone(),
            trader: trader.clone(),
            amount,
            return_amount: quote.amount,
            conversion_fee: quote.fee,
        });
        let supply = self.host.total_supply()?;
        reports.push(self.price_update(from_token, supply)?);
        reports.push(self.price_update(to_token, supply)?);
        Ok(quote.amount)
    }

    fn price_update(&self, reserve_token: &Address, token_supply: Amount) -> Result<ConverterEvent, ConverterError> {
        Ok(ConverterEvent::PriceDataUpdate {
            reserve_token: reserve_token.clone(),
            token_supply,
            reserve_balance: self.reserve_balance(reserve_token)?,
            reserve_weight: self.state.reserves.get(reserve_token)?.weight,
        })
    }

    // -----------------------------------------------------------------------
    // Quotes
    // -----------------------------------------------------------------------

    /// Expected return for converting `amount` of `from_token` into `to_token`.
    pub fn get_return(
        &self,
        from_token: &Address,
        to_token: &Address,
        amount: Amount,
    ) -> Result<ConversionQuote, ConverterError> {
        if from_token == to_token {
            return Err(ConverterError::IdenticalTokens);
        }
        match ConversionPath::classify(&self.state.token, from_token, to_token) {
            ConversionPath::Buy => self.get_purchase_return(from_token, amount),
            ConversionPath::Sell => self.get_sale_return(to_token, amount),
            ConversionPath::Cross => self.get_cross_reserve_return(from_token, to_token, amount),
        }
    }

    pub fn get_purchase_return(&self, reserve_token: &Address, amount: Amount) -> Result<ConversionQuote, ConverterError> {
        self.purchase_quote(reserve_token, amount, false)
    }

    pub fn get_sale_return(&self, reserve_token: &Address, amount: Amount) -> Result<ConversionQuote, ConverterError> {
        self.sale_quote(reserve_token, amount)
    }

    pub fn get_cross_reserve_return(
        &self,
        from_token: &Address,
        to_token: &Address,
        amount: Amount,
    ) -> Result<ConversionQuote, ConverterError> {
        self.cross_quote(from_token, to_token, amount, false)
    }

    fn purchase_quote(
        &self,
        reserve_token: &Address,
        amount: Amount,
        deposited: bool,
    ) -> Result<ConversionQuote, ConverterError> {
        self.require_active()?;
        let reserve = self.state.reserves.get(reserve_token)?;
        if !reserve.purchase_enabled {
            return Err(ConverterError::PurchaseDisabled(reserve_token.clone()));
        }

        let supply = self.host.total_supply()?;
        let mut balance = self.reserve_balance(reserve_token)?;
        if deposited {
            balance = exclude_deposit(reserve_token, reserve.virtual_balance_enabled, balance, amount)?;
        }

        let raw = purchase_return(supply, balance, reserve.weight, amount)?;
        let quote = self.state.fees.quote(raw, SINGLE_LEG);
        debug!(reserve = %reserve_token, supply = %supply, balance = %balance, raw = %raw, "purchase quote");
        Ok(quote)
    }

    fn sale_quote(&self, reserve_token: &Address, amount: Amount) -> Result<ConversionQuote, ConverterError> {
        self.require_active()?;
        let reserve = self.state.reserves.get(reserve_token)?;

        let supply = self.host.total_supply()?;
        let balance = self.reserve_balance(reserve_token)?;

        let raw = sale_return(supply, balance, reserve.weight, amount)?;
        let quote = self.state.fees.quote(raw, SINGLE_LEG);
        debug!(reserve = %reserve_token, supply = %supply, balance = %balance, raw = %raw, "sale quote");
        Ok(quote)
    }

    fn cross_quote(
        &self,
        from_token: &Address,
        to_token: &Address,
        amount: Amount,
        deposited: bool,
    ) -> Result<ConversionQuote, ConverterError> {
        self.require_active()?;
        let from_reserve = self.state.reserves.get(from_token)?;
        let to_reserve = self.state.reserves.get(to_token)?;
        if !to_reserve.purchase_enabled {
            return Err(ConverterError::PurchaseDisabled(to_token.clone()));
        }

        let mut from_balance = self.reserve_balance(from_token)?;
        if deposited {
            from_balance = exclude_deposit(from_token, from_reserve.virtual_balance_enabled, from_balance, amount)?;
        }
        let to_balance = self.reserve_balance(to_token)?;

        let raw = cross_reserve_return(
            from_balance,
            from_reserve.weight,
            to_balance,
            to_reserve.weight,
            amount,
        )?;
        let quote = self.state.fees.quote(raw, CROSS_LEG);
        debug!(
            from = %from_token,
            to = %to_token,
            from_balance = %from_balance,
            to_balance = %to_balance,
            raw = %raw,
            "cross reserve quote"
        );
        Ok(quote)
    }
}

fn require_min_return(quote: &ConversionQuote, min_return: Amount) -> Result<(), ConverterError> {
    if quote.amount < min_return {
        return Err(ConverterError::SlippageExceeded {
            actual: quote.amount,
            min_return,
        });
    }
    Ok(())
}

/// Source balance with the incoming deposit taken out.
///
/// A real balance that does not cover the deposit means the ledger lost
/// tokens; a virtual balance that does not is an operator setting the request
/// cannot be priced against.
fn exclude_deposit(
    token: &Address,
    virtual_balance: bool,
    balance: Amount,
    deposit: Amount,
) -> Result<Amount, ConverterError> {
    match balance.checked_sub(deposit) {
        Some(remaining) => Ok(remaining),
        None if virtual_balance => Err(ConverterError::VirtualBalanceBelowDeposit {
            token: token.clone(),
            balance,
            deposit,
        }),
        None => Err(ConverterError::InvariantViolation(format!(
            "balance of {token} ({balance}) does not include the deposit of {deposit}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConverterConfig;
    use crate::memory::MemoryHost;
    use crate::services::GovernedToken;

    const SUPPLY: Amount = 1_000_000;
    const BALANCE: Amount = 500_000;

    fn owner() -> Address {
        Address::account(1)
    }

    fn network() -> Address {
        Address::contract(0x4e7)
    }

    fn reserve() -> Address {
        Address::contract(1)
    }

    /// Active converter with one 50% reserve holding `BALANCE` against `SUPPLY`.
    fn converter() -> Converter<MemoryHost> {
        let config = ConverterConfig {
            address: Address::contract(0xc0),
            token: Address::contract(0xf1e),
            registry: Address::contract(0x5e6),
            owner: owner(),
            max_conversion_fee: 10_000,
            initial_reserve: None,
        };
        let mut host = MemoryHost::new(config.address.clone(), config.token.clone(), owner());
        host.register(&config.registry, ServiceName::Network, network());
        host.mint(&config.token, &owner(), SUPPLY);
        host.mint(&reserve(), &config.address, BALANCE);

        let mut converter = Converter::install(&config, host).expect("test: install");
        converter
            .add_reserve(&owner(), &reserve(), 500_000, false)
            .expect("test: add reserve");
        converter.host_mut().set_token_owner(config.address.clone());
        converter
    }

    fn deposit(converter: &mut Converter<MemoryHost>, token: &Address, amount: Amount) {
        let address = converter.address().clone();
        converter.host_mut().mint(token, &network(), amount);
        converter
            .host_mut()
            .send(token, &network(), &address, amount)
            .expect("test: deposit");
    }

    #[test]
    fn classify_paths() {
        let governed = Address::contract(0xf1e);
        let a = Address::contract(1);
        let b = Address::contract(2);
        assert_eq!(ConversionPath::classify(&governed, &a, &governed), ConversionPath::Buy);
        assert_eq!(ConversionPath::classify(&governed, &governed, &a), ConversionPath::Sell);
        assert_eq!(ConversionPath::classify(&governed, &a, &b), ConversionPath::Cross);
    }

    #[test]
    fn buy_prices_against_pre_deposit_balance() {
        let mut converter = converter();
        let quote = converter.get_purchase_return(&reserve(), 1_000).expect("test: quote");
        assert_eq!(quote, ConversionQuote { amount: 999, fee: 0 });

        deposit(&mut converter, &reserve(), 1_000);
        let token = converter.token().clone();
        let returned = converter
            .convert(&network(), &reserve(), &token, 1_000, 1)
            .expect("test: buy");
        assert_eq!(returned, 999);
        assert_eq!(converter.host().balance(&token, &network()), 999);

        let events = converter.host().events();
        assert_eq!(events.len(), 2);
        assert!(events[0].is_conversion());
        assert_eq!(
            events[1],
            ConverterEvent::PriceDataUpdate {
                reserve_token: reserve(),
                token_supply: SUPPLY + 999,
                reserve_balance: BALANCE + 1_000,
                reserve_weight: 500_000,
            }
        );
    }

    #[test]
    fn validation_order() {
        let mut converter = converter();
        let token = converter.token().clone();
        assert_eq!(
            converter.convert(&network(), &reserve(), &token, 0, 1),
            Err(ConverterError::InvalidAmount("conversion amount must be positive"))
        );
        assert_eq!(
            converter.convert(&network(), &reserve(), &token, 1, 0),
            Err(ConverterError::InvalidAmount("minimum return must be positive"))
        );
        assert_eq!(
            converter.convert(&network(), &reserve(), &reserve(), 1, 1),
            Err(ConverterError::IdenticalTokens)
        );
        converter.disable_conversions(&owner(), true).expect("test: disable");
        assert_eq!(
            converter.convert(&network(), &reserve(), &reserve(), 1, 1),
            Err(ConverterError::ConversionsDisabled)
        );
    }

    #[test]
    fn slippage_rejects_without_reports() {
        let mut converter = converter();
        deposit(&mut converter, &reserve(), 1_000);
        let token = converter.token().clone();
        assert_eq!(
            converter.convert(&network(), &reserve(), &token, 1_000, 1_000),
            Err(ConverterError::SlippageExceeded { actual: 999, min_return: 1_000 })
        );
        assert!(converter.host().events().is_empty());
        assert_eq!(converter.host().total_supply(), Ok(SUPPLY));
    }

    #[test]
    fn sell_burns_and_pays_out() {
        let mut converter = converter();
        let token = converter.token().clone();
        let address = converter.address().clone();
        converter
            .host_mut()
            .send(&token, &owner(), &address, 1_000)
            .expect("test: hand governed tokens to converter");

        let expected = converter.get_sale_return(&reserve(), 1_000).expect("test: quote");
        let returned = converter
            .convert(&network(), &token, &reserve(), 1_000, 1)
            .expect("test: sell");
        assert_eq!(returned, expected.amount);
        assert!(returned < 1_000);
        assert_eq!(converter.host().total_supply(), Ok(SUPPLY - 1_000));
        assert_eq!(converter.host().balance(&reserve(), &network()), returned);
    }

    #[test]
    fn transfer_failure_restores_virtual_balance() {
        let mut converter = converter();
        converter
            .update_reserve(&owner(), &reserve(), 500_000, true, BALANCE)
            .expect("test: switch to virtual");
        let token = converter.token().clone();
        let address = converter.address().clone();
        converter
            .host_mut()
            .send(&token, &owner(), &address, 1_000)
            .expect("test: hand governed tokens to converter");
        converter.host_mut().set_reject_transfers(true);

        let before = converter.reserves().clone();
        let err = converter.convert(&network(), &token, &reserve(), 1_000, 1);
        assert!(matches!(err, Err(ConverterError::Service(_))));
        assert_eq!(converter.reserves(), &before);
        assert!(converter.host().events().is_empty());
    }

    #[test]
    fn quotes_require_active() {
        let mut converter = converter();
        converter.host_mut().set_token_owner(owner());
        let token = converter.token().clone();
        assert_eq!(converter.get_return(&reserve(), &token, 1_000), Err(ConverterError::NotActive));
        assert_eq!(
            converter.get_return(&token, &token, 1_000),
            Err(ConverterError::IdenticalTokens)
        );
    }

    #[test]
    fn operator_deposit_is_accepted_while_inactive() {
        let mut converter = converter();
        converter.host_mut().set_token_owner(owner());
        assert_eq!(
            converter.decode_transfer(&reserve(), &owner(), b""),
            Ok(InboundRequest::Deposit)
        );
        assert_eq!(converter.on_token_received(&reserve(), &owner(), 10, b""), Ok(None));
        assert!(matches!(
            converter.on_token_received(&reserve(), &owner(), 0, b""),
            Err(ConverterError::InvalidAmount(_))
        ));
    }

    #[test]
    fn transfers_from_strangers_are_refused() {
        let converter = converter();
        assert!(matches!(
            converter.decode_transfer(&reserve(), &Address::account(9), b"{}"),
            Err(ConverterError::Unauthorized(_))
        ));
        // once active, even the owner must go through the network
        assert!(matches!(
            converter.decode_transfer(&reserve(), &owner(), b""),
            Err(ConverterError::Unauthorized(_))
        ));
        assert!(matches!(
            converter.decode_transfer(&reserve(), &network(), b"garbage"),
            Err(ConverterError::MalformedRequest(_))
        ));
    }
}
