//! Preset scenario comparison
//!
//! Runs every built-in scenario against the mock portfolio and ranks them
//! by tail loss.
//!
//! Run with: cargo run --example compare_presets

use ag_stress::{summarize, ScenarioLibrary, StressConfig, StressTestRunner};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    println!("=== Preset Scenario Comparison ===\n");

    let config = StressConfig::default().with_trials(20_000).with_seed(42);
    let runner = StressTestRunner::from_config(config)?;
    let library = ScenarioLibrary::presets();

    let mut outcomes = runner.run_all(&library)?;
    outcomes.sort_by(|a, b| b.report.value_at_risk.total_cmp(&a.report.value_at_risk));

    println!(
        "{:<30} {:>10} {:>10} {:>10} {:>12}",
        "Scenario", "EL", "VaR 99%", "ES", "Liquidity"
    );
    for outcome in &outcomes {
        println!(
            "{:<30} {:>10.2} {:>10.2} {:>10.2} {:>9.1} d",
            outcome.scenario_name,
            outcome.report.expected_loss,
            outcome.report.value_at_risk,
            outcome.report.expected_shortfall,
            outcome.liquidity_gap_days
        );
    }
    println!();

    let summary = summarize(&outcomes)?;
    println!(
        "Worst scenario: {} (VaR {:.2})",
        summary.worst_scenario, summary.max_value_at_risk
    );
    println!(
        "Mildest scenario: {} (VaR {:.2})",
        summary.mildest_scenario, summary.min_value_at_risk
    );
    println!("Average net impact: {:.2}", summary.average_net_impact);

    Ok(())
}
