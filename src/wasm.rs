// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Browser sandbox over an in-memory converter.
//!
//! Amounts cross the JS boundary as decimal strings since they exceed the
//! safe integer range of a JS number.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::config::ConverterConfig;
use crate::converter::Converter;
use crate::memory::MemoryHost;
use crate::types::{Address, Amount, ServiceName};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

#[cfg(not(target_arch = "wasm32"))]
fn log(s: &str) {
    tracing::debug!("{s}");
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse_address(text: &str) -> Result<Address, JsValue> {
    Address::parse(text).map_err(js_error)
}

fn parse_amount(text: &str) -> Result<Amount, JsValue> {
    text.trim()
        .parse::<Amount>()
        .map_err(|_| JsValue::from_str(&format!("invalid amount {text:?}")))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteView {
    amount: String,
    fee: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReserveView {
    token: String,
    weight: u32,
    balance: String,
    is_virtual_balance_enabled: bool,
    is_purchase_enabled: bool,
}

#[wasm_bindgen]
pub struct ConverterSandbox {
    converter: Converter<MemoryHost>,
}

#[wasm_bindgen]
impl ConverterSandbox {
    /// Install a converter from a JSON [`ConverterConfig`]; the installing
    /// owner keeps the governed token until `activate` is called.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<ConverterSandbox, JsValue> {
        #[cfg(target_arch = "wasm32")]
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));

        let config = ConverterConfig::from_json_str(config_json).map_err(js_error)?;
        let host = MemoryHost::new(config.address.clone(), config.token.clone(), config.owner.clone());
        let converter = Converter::install(&config, host).map_err(js_error)?;
        log(&format!("converter {} installed", config.address));
        Ok(Self { converter })
    }

    /// Register `address` under `name` ("Network" or "ScoreRegistry") in the
    /// converter's current registry.
    pub fn register_service(&mut self, name: &str, address: &str) -> Result<(), JsValue> {
        let name = match name {
            "Network" => ServiceName::Network,
            "ScoreRegistry" => ServiceName::ScoreRegistry,
            other => return Err(JsValue::from_str(&format!("unknown service {other:?}"))),
        };
        let address = parse_address(address)?;
        let registry = self.converter.registry().clone();
        self.converter.host_mut().register(&registry, name, address);
        Ok(())
    }

    pub fn mint(&mut self, token: &str, holder: &str, amount: &str) -> Result<(), JsValue> {
        let token = parse_address(token)?;
        let holder = parse_address(holder)?;
        let amount = parse_amount(amount)?;
        self.converter.host_mut().mint(&token, &holder, amount);
        Ok(())
    }

    pub fn balance_of(&self, token: &str, holder: &str) -> Result<String, JsValue> {
        let token = parse_address(token)?;
        let holder = parse_address(holder)?;
        Ok(self.converter.host().balance(&token, &holder).to_string())
    }

    /// Hand the governed token to the converter.
    pub fn activate(&mut self) {
        let address = self.converter.address().clone();
        self.converter.host_mut().set_token_owner(address);
    }

    pub fn is_active(&self) -> Result<bool, JsValue> {
        self.converter.is_active().map_err(js_error)
    }

    pub fn add_reserve(&mut self, caller: &str, token: &str, weight: u32, virtual_balance: bool) -> Result<(), JsValue> {
        let caller = parse_address(caller)?;
        let token = parse_address(token)?;
        self.converter
            .add_reserve(&caller, &token, weight, virtual_balance)
            .map_err(js_error)
    }

    pub fn set_conversion_fee(&mut self, caller: &str, fee: u32) -> Result<(), JsValue> {
        let caller = parse_address(caller)?;
        self.converter.set_conversion_fee(&caller, fee).map_err(js_error)
    }

    pub fn disable_reserve_purchases(&mut self, caller: &str, token: &str, disable: bool) -> Result<(), JsValue> {
        let caller = parse_address(caller)?;
        let token = parse_address(token)?;
        self.converter
            .disable_reserve_purchases(&caller, &token, disable)
            .map_err(js_error)
    }

    /// Expected `{ amount, fee }` for converting `amount` of `from` into `to`.
    pub fn quote(&self, from: &str, to: &str, amount: &str) -> Result<JsValue, JsValue> {
        let from = parse_address(from)?;
        let to = parse_address(to)?;
        let amount = parse_amount(amount)?;
        let quote = self.converter.get_return(&from, &to, amount).map_err(js_error)?;
        let view = QuoteView {
            amount: quote.amount.to_string(),
            fee: quote.fee.to_string(),
        };
        serde_wasm_bindgen::to_value(&view).map_err(js_error)
    }

    /// Transfer `amount` of `token` from `sender` into the converter with
    /// `data` attached. Returns the conversion result, or `null` for a
    /// reserve deposit.
    pub fn deliver(&mut self, token: &str, sender: &str, amount: &str, data: &str) -> Result<JsValue, JsValue> {
        let token = parse_address(token)?;
        let sender = parse_address(sender)?;
        let amount = parse_amount(amount)?;
        match self
            .converter
            .deliver(&token, &sender, amount, data.as_bytes())
            .map_err(js_error)?
        {
            Some(returned) => {
                log(&format!("converted {amount} of {token} into {returned}"));
                Ok(JsValue::from_str(&returned.to_string()))
            }
            None => Ok(JsValue::NULL),
        }
    }

    pub fn reserves(&self) -> Result<JsValue, JsValue> {
        let mut views = Vec::with_capacity(self.converter.reserve_count());
        for token in self.converter.reserves().tokens() {
            let info = self.converter.reserve_info(token);
            views.push(ReserveView {
                token: token.to_string(),
                weight: info.weight,
                balance: self.converter.reserve_balance(token).map_err(js_error)?.to_string(),
                is_virtual_balance_enabled: info.is_virtual_balance_enabled,
                is_purchase_enabled: info.is_purchase_enabled,
            });
        }
        serde_wasm_bindgen::to_value(&views).map_err(js_error)
    }

    /// Drain the event log as a JSON array.
    pub fn take_events(&mut self) -> Result<String, JsValue> {
        let events = self.converter.host_mut().take_events();
        serde_json::to_string(&events).map_err(js_error)
    }

    /// Full converter state as JSON.
    pub fn state(&self) -> Result<String, JsValue> {
        serde_json::to_string(self.converter.state()).map_err(js_error)
    }
}
