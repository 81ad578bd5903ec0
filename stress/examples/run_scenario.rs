//! Single scenario stress test
//!
//! Loads a scenario and a run configuration, simulates it and prints the
//! headline metrics and factor attribution.
//!
//! Run with: cargo run --example run_scenario -- [scenario.yaml] [config.yaml]
//! Set RUST_LOG=ag_stress=debug to see the pipeline logs.

use ag_stress::{Scenario, StressConfig, StressTestRunner};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let scenario_path = args.next().unwrap_or_else(|| {
        concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios/equity_crash.yaml").to_string()
    });
    let config_path = args.next().unwrap_or_else(|| {
        concat!(env!("CARGO_MANIFEST_DIR"), "/configs/default.yaml").to_string()
    });

    println!("=== Macro Stress Test ===\n");

    let scenario = Scenario::from_file(&scenario_path)?;
    let config = StressConfig::from_file(&config_path)?;

    println!("Scenario: {}", scenario.name);
    if !scenario.narrative.is_empty() {
        println!("  {}", scenario.narrative);
    }
    println!("  GDP shock: {:+.1}%", scenario.gdp_shock_pct);
    println!("  Equity drawdown: {:+.1}%", scenario.equity_drawdown_pct);
    println!("  Rate shift: {:+.0} bps", scenario.rate_shift_bps);
    for shock in &scenario.additional_shocks {
        println!("  {}: {:+.2} ({:?})", shock.factor, shock.shock_value, shock.unit);
    }
    println!("  Horizon: {} months", scenario.horizon_months);
    println!();

    let runner = StressTestRunner::from_config(config)?;
    let outcome = runner.run(&scenario)?;
    let report = &outcome.report;

    println!("--- Headline Metrics ({}) ---", outcome.scenario_id);
    for metric in &outcome.metrics {
        println!(
            "  {:<22} {:>10.2} {:<12} (baseline {:.2}, {:+.2})",
            metric.metric_name,
            metric.value,
            metric.unit,
            metric.baseline_value,
            metric.delta()
        );
    }
    println!();

    println!("--- Distribution ---");
    println!("  Trials: {}", report.trials);
    println!("  Mean PnL: {:.2}", report.mean_total_pnl);
    println!("  Stressed net impact: {:.2}", report.stressed_net_impact);
    println!("  Expected shortfall: {:.2}", report.expected_shortfall);
    println!("  Parametric VaR: {:.2}", report.parametric_var);
    println!();

    println!("--- Factor Attribution ({:?}) ---", report.contribution_basis);
    let mut contributions: Vec<_> = report.factor_contributions.iter().collect();
    contributions.sort_by(|a, b| b.1.total_cmp(a.1));
    for (factor, share) in contributions {
        println!("  {:<14} {:>6.1}%", factor, share * 100.0);
    }

    Ok(())
}
