// Stress report types -- per-run outcomes and suite summary, written as JSON

use serde::Serialize;
use std::collections::BTreeMap;

// ─── Single-Run Result ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunResult {
    pub seed: u64,
    pub pass: bool,
    pub attempted: usize,
    pub buys: usize,
    pub sells: usize,
    pub crosses: usize,
    pub round_trips: usize,
    /// Rejections keyed by error kind.
    pub rejections: BTreeMap<String, usize>,
    pub fatal_errors: usize,
    /// Round trips that returned more than was deposited.
    pub arbitrage_violations: usize,
    /// Successful conversions with the wrong number of reports, or failed
    /// ones that reported anything.
    pub report_mismatches: usize,
    pub invariant_failures: Vec<String>,
    /// Largest shortfall between a quote and the executed conversion.
    pub max_quote_drift: String,
    pub elapsed_ms: u128,
}

impl RunResult {
    pub fn reject(&mut self, kind: &str) {
        *self.rejections.entry(kind.to_string()).or_default() += 1;
    }

    pub fn conversions(&self) -> usize {
        self.buys + self.sells + self.crosses
    }
}

// ─── Scenario Aggregate ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario_name: String,
    pub label: String,
    pub runs: usize,
    pub pass_rate: f64,
    pub conversions_mean: f64,
    pub rejection_rate: f64,
    pub fatal_errors: usize,
    pub arbitrage_violations: usize,
    pub report_mismatches: usize,
    pub results: Vec<RunResult>,
}

impl ScenarioReport {
    pub fn from_runs(name: &str, label: &str, results: Vec<RunResult>) -> Self {
        let runs = results.len();
        let passed = results.iter().filter(|r| r.pass).count();
        let conversions: usize = results.iter().map(RunResult::conversions).sum();
        let attempted: usize = results.iter().map(|r| r.attempted).sum();
        let rejected: usize = results.iter().map(|r| r.rejections.values().sum::<usize>()).sum();
        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        Self {
            scenario_name: name.to_string(),
            label: label.to_string(),
            runs,
            pass_rate: ratio(passed, runs),
            conversions_mean: ratio(conversions, runs),
            rejection_rate: ratio(rejected, attempted),
            fatal_errors: results.iter().map(|r| r.fatal_errors).sum(),
            arbitrage_violations: results.iter().map(|r| r.arbitrage_violations).sum(),
            report_mismatches: results.iter().map(|r| r.report_mismatches).sum(),
            results,
        }
    }

    pub fn passed(&self) -> bool {
        self.runs > 0 && self.pass_rate >= 1.0
    }
}

// ─── Suite Report ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub version: &'static str,
    pub timestamp: u64,
    pub base_seed: u64,
    pub runs_per_scenario: usize,
    pub elapsed_ms: u128,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub scenarios: Vec<ScenarioReport>,
}
