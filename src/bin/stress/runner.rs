// Stress runner -- replays one seeded trade workload against an in-memory converter
// Every request goes through the inbound transfer path, exactly as the network would send it

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Instant;
use tracing::{debug, info_span};

use converter_engine::{
    Address, Amount, ConversionPath, Converter, ConverterConfig, ConverterError, MemoryHost, ServiceName,
};

use crate::report::RunResult;
use crate::scenarios::{Scenario, DECIMALS};

// ─── Fixed Identities ───────────────────────────────────────────────────────

fn owner() -> Address {
    Address::account(1)
}

fn network() -> Address {
    Address::contract(0x4e7)
}

fn reserve_token(index: usize) -> Address {
    Address::contract(0x100 + index as u64)
}

// ─── Setup ──────────────────────────────────────────────────────────────────

fn setup(scenario: &Scenario) -> Result<Converter<MemoryHost>, ConverterError> {
    let config = ConverterConfig {
        address: Address::contract(0xc0),
        token: Address::contract(0xf1e),
        registry: Address::contract(0x5e6),
        owner: owner(),
        max_conversion_fee: 50_000,
        initial_reserve: None,
    };
    let mut host = MemoryHost::new(config.address.clone(), config.token.clone(), owner());
    host.register(&config.registry, ServiceName::Network, network());
    host.mint(&config.token, &network(), scenario.supply * DECIMALS);

    let mut converter = Converter::install(&config, host)?;
    for (index, layout) in scenario.reserves.iter().enumerate() {
        let token = reserve_token(index);
        let balance = layout.balance * DECIMALS;
        converter.add_reserve(&owner(), &token, layout.weight, layout.virtual_balance)?;
        if layout.virtual_balance {
            converter.update_reserve(&owner(), &token, layout.weight, true, balance)?;
        }
        // operator funding goes through the deposit branch of the transfer hook
        converter.host_mut().mint(&token, &owner(), balance);
        converter.deliver(&token, &owner(), balance, b"")?;
    }
    converter.set_conversion_fee(&owner(), scenario.fee_ppm)?;
    converter.host_mut().set_token_owner(config.address.clone());
    converter.host_mut().take_events();
    Ok(converter)
}

fn request(to_token: &Address, min_return: Amount) -> Vec<u8> {
    serde_json::json!({
        "toToken": to_token.to_string(),
        "minReturn": min_return.to_string(),
    })
    .to_string()
    .into_bytes()
}

fn rejection_kind(err: &ConverterError) -> &'static str {
    match err {
        ConverterError::SlippageExceeded { .. } => "slippage",
        ConverterError::ReserveDepletionViolation { .. } => "depletion",
        ConverterError::PurchaseDisabled(_) => "purchase_disabled",
        ConverterError::Curve(_) => "curve",
        ConverterError::Service(_) => "service",
        ConverterError::InvariantViolation(_) => "invariant",
        _ => "other",
    }
}

// ─── Trading ────────────────────────────────────────────────────────────────

struct Trader<'a> {
    converter: &'a mut Converter<MemoryHost>,
    result: &'a mut RunResult,
    max_drift: Amount,
}

impl Trader<'_> {
    /// Quote, fund and send one conversion request; checks reports and drift.
    fn convert(&mut self, from: &Address, to: &Address, amount: Amount, tight: bool) -> Option<Amount> {
        self.result.attempted += 1;
        let governed = self.converter.token().clone();
        let path = ConversionPath::classify(&governed, from, to);

        // a virtual source is quoted before the deposit but priced net of it
        let virtual_source = from != &governed && self.converter.reserve_info(from).is_virtual_balance_enabled;
        let quoted = self.converter.get_return(from, to, amount).ok().map(|q| q.amount);
        let min_return = match (tight, quoted) {
            (true, Some(q)) => q + 1,
            _ => 1,
        };
        if from != &governed {
            self.converter.host_mut().mint(from, &network(), amount);
        }

        let outcome = self.converter.deliver(from, &network(), amount, &request(to, min_return));
        let reports = self.converter.host_mut().take_events();

        match outcome {
            Ok(Some(returned)) => {
                let expected = if path == ConversionPath::Cross { 3 } else { 2 };
                if reports.len() != expected {
                    self.result.report_mismatches += 1;
                }
                match quoted {
                    Some(q) if virtual_source => {
                        if returned < q {
                            self.result.invariant_failures.push(format!(
                                "virtual source {from} returned {returned} below its quote {q}"
                            ));
                        }
                    }
                    Some(q) => self.max_drift = self.max_drift.max(q.abs_diff(returned)),
                    None => {}
                }
                match path {
                    ConversionPath::Buy => self.result.buys += 1,
                    ConversionPath::Sell => self.result.sells += 1,
                    ConversionPath::Cross => self.result.crosses += 1,
                }
                Some(returned)
            }
            Ok(None) => {
                self.result.report_mismatches += 1;
                None
            }
            Err(err) => {
                debug!(?path, %err, "request rejected");
                if !reports.is_empty() {
                    self.result.report_mismatches += 1;
                }
                if err.is_fatal() {
                    self.result.fatal_errors += 1;
                }
                self.result.reject(rejection_kind(&err));
                None
            }
        }
    }

    fn check_invariants(&mut self, step: usize) {
        if let Err(err) = self.converter.reserves().verify() {
            self.result.invariant_failures.push(format!("step {step}: {err}"));
        }
        if self.converter.total_reserve_weight() > 1_000_000 {
            self.result
                .invariant_failures
                .push(format!("step {step}: total weight above 100%"));
        }
    }
}

fn pool_fraction(rng: &mut ChaCha8Rng, pool: Amount, max_bps: u32) -> Amount {
    let bps = rng.gen_range(1..=max_bps.max(1));
    (pool / 10_000 * Amount::from(bps)).max(1)
}

// ─── Single Run ─────────────────────────────────────────────────────────────

pub fn run_single(scenario: &Scenario, seed: u64, trades: usize) -> RunResult {
    let _span = info_span!("run", scenario = scenario.name, seed).entered();
    let start = Instant::now();
    let mut result = RunResult {
        seed,
        ..RunResult::default()
    };

    let mut converter = match setup(scenario) {
        Ok(converter) => converter,
        Err(err) => {
            result.invariant_failures.push(format!("setup: {err}"));
            result.elapsed_ms = start.elapsed().as_millis();
            return result;
        }
    };

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let governed = converter.token().clone();
    let reserve_count = scenario.reserves.len();
    let mut trader = Trader {
        converter: &mut converter,
        result: &mut result,
        max_drift: 0,
    };

    for step in 0..trades {
        if scenario.freeze_last_reserve && step == trades / 2 {
            let last = reserve_token(reserve_count - 1);
            if let Err(err) = trader.converter.disable_reserve_purchases(&owner(), &last, true) {
                trader.result.invariant_failures.push(format!("freeze: {err}"));
            }
        }

        let index = rng.gen_range(0..reserve_count);
        let token = reserve_token(index);
        let tight = rng.gen_range(0..100) < 5;

        if rng.gen_range(0..100) < scenario.round_trip_pct {
            let pool = trader.converter.reserve_balance(&token).unwrap_or(0);
            let deposit = pool_fraction(&mut rng, pool, scenario.max_trade_bps);
            if let Some(issued) = trader.convert(&token, &governed, deposit, false) {
                if let Some(redeemed) = trader.convert(&governed, &token, issued, false) {
                    trader.result.round_trips += 1;
                    // pricing net of the deposit lets a virtual reserve pay back more than it took
                    let virtual_reserve = trader.converter.reserve_info(&token).is_virtual_balance_enabled;
                    if redeemed > deposit && !virtual_reserve {
                        trader.result.arbitrage_violations += 1;
                    }
                }
            }
        } else {
            match rng.gen_range(0..3) {
                0 => {
                    let pool = trader.converter.reserve_balance(&token).unwrap_or(0);
                    let amount = pool_fraction(&mut rng, pool, scenario.max_trade_bps);
                    trader.convert(&token, &governed, amount, tight);
                }
                1 => {
                    let held = trader.converter.host().balance(&governed, &network());
                    let amount = pool_fraction(&mut rng, held, scenario.max_trade_bps);
                    trader.convert(&governed, &token, amount, tight);
                }
                _ if reserve_count > 1 => {
                    let other = reserve_token((index + rng.gen_range(1..reserve_count)) % reserve_count);
                    let pool = trader.converter.reserve_balance(&token).unwrap_or(0);
                    let amount = pool_fraction(&mut rng, pool, scenario.max_trade_bps);
                    trader.convert(&token, &other, amount, tight);
                }
                _ => {
                    let pool = trader.converter.reserve_balance(&token).unwrap_or(0);
                    let amount = pool_fraction(&mut rng, pool, scenario.max_trade_bps);
                    trader.convert(&token, &governed, amount, tight);
                }
            }
        }
        trader.check_invariants(step);
    }

    let max_drift = trader.max_drift;
    result.max_quote_drift = max_drift.to_string();
    if max_drift != 0 {
        result
            .invariant_failures
            .push(format!("executed return drifted from quote by {max_drift}"));
    }
    result.pass = result.fatal_errors == 0
        && result.arbitrage_violations == 0
        && result.report_mismatches == 0
        && result.invariant_failures.is_empty();
    result.elapsed_ms = start.elapsed().as_millis();
    result
}
