// Converter Stress Runner -- seeded random trade workloads with invariant auditing
// ChaCha8 PRNG, N runs per scenario, JSON report under stress-results/
//
// Usage:
//   cargo run --release --bin stress                      # All scenarios (10 runs each)
//   cargo run --release --bin stress -- --runs 3          # Quick mode
//   cargo run --release --bin stress -- --trades 2000     # Override trades per run
//   cargo run --release --bin stress -- --seed 42         # Custom base seed
//   cargo run --release --bin stress -- VIRTUAL           # Filter by name
//   RUST_LOG=converter_engine=debug cargo run --bin stress -- --runs 1

mod report;
mod runner;
mod scenarios;

use report::*;
use scenarios::*;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

// ─── CLI Parsing ────────────────────────────────────────────────────────────

struct CliArgs {
    runs: usize,
    seed: u64,
    trades: Option<usize>,
    filter: Option<String>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut cli = CliArgs {
        runs: 10,
        seed: 0,
        trades: None,
        filter: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--runs" => {
                i += 1;
                if i < args.len() {
                    cli.runs = args[i].parse().unwrap_or(10);
                }
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    cli.seed = args[i].parse().unwrap_or(0);
                }
            }
            "--trades" => {
                i += 1;
                if i < args.len() {
                    cli.trades = args[i].parse().ok();
                }
            }
            arg if !arg.starts_with('-') => {
                cli.filter = Some(arg.to_string());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    cli
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();
    let all_scenarios = scenarios();

    let to_run: Vec<&Scenario> = match &cli.filter {
        Some(f) => {
            let f_lower = f.to_lowercase();
            all_scenarios
                .iter()
                .filter(|s| s.name.to_lowercase().contains(&f_lower) || s.label.to_lowercase().contains(&f_lower))
                .collect()
        }
        None => all_scenarios.iter().collect(),
    };

    if to_run.is_empty() {
        eprintln!("No scenarios match filter: {:?}", cli.filter);
        std::process::exit(1);
    }

    println!("\n  Converter Stress Runner");
    println!("  PRNG: ChaCha8Rng | Runs/scenario: {} | Base seed: {}", cli.runs, cli.seed);
    println!("  Running {} scenario(s)...\n", to_run.len());
    println!(
        "  {:<18} {:>6} {:>8} {:>8} {:>6} {:>6} {:>6}",
        "Scenario", "Pass%", "Conv", "Reject%", "Fatal", "Arb", "Rpt"
    );
    println!("  {}", "-".repeat(66));

    let suite_start = Instant::now();
    let mut scenario_reports = Vec::new();

    for scenario in &to_run {
        let trades = cli.trades.unwrap_or(scenario.trades);
        let results: Vec<RunResult> = (0..cli.runs)
            .map(|run| runner::run_single(scenario, cli.seed + run as u64, trades))
            .collect();
        let report = ScenarioReport::from_runs(scenario.name, scenario.label, results);

        let status = if report.passed() { "PASS" } else { "FAIL" };
        println!(
            "  {:<18} {:>5}% {:>8.0} {:>7.1}% {:>6} {:>6} {:>6}  {}",
            report.scenario_name,
            (report.pass_rate * 100.0) as u32,
            report.conversions_mean,
            report.rejection_rate * 100.0,
            report.fatal_errors,
            report.arbitrage_violations,
            report.report_mismatches,
            status,
        );
        for failed in report.results.iter().filter(|r| !r.pass) {
            for failure in failed.invariant_failures.iter().take(3) {
                println!("      seed {}: {}", failed.seed, failure);
            }
        }

        scenario_reports.push(report);
    }

    // ─── Summary ────────────────────────────────────────────────────────

    let total = scenario_reports.len();
    let passed = scenario_reports.iter().filter(|r| r.passed()).count();
    let failed = total - passed;

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let suite = SuiteReport {
        version: env!("CARGO_PKG_VERSION"),
        timestamp,
        base_seed: cli.seed,
        runs_per_scenario: cli.runs,
        elapsed_ms: suite_start.elapsed().as_millis(),
        total,
        passed,
        failed,
        scenarios: scenario_reports,
    };

    println!("\n  {} passed, {} failed ({} ms)", passed, failed, suite.elapsed_ms);

    let dir = std::path::Path::new("stress-results");
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("  Could not create {}: {}", dir.display(), e);
    } else {
        let path = dir.join(format!("stress-{}.json", timestamp));
        match serde_json::to_string_pretty(&suite) {
            Ok(json) => match std::fs::write(&path, json) {
                Ok(()) => println!("  Report written to {}", path.display()),
                Err(e) => eprintln!("  Could not write {}: {}", path.display(), e),
            },
            Err(e) => eprintln!("  Could not serialize report: {}", e),
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}
