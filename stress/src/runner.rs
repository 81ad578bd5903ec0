//! End-to-end stress test orchestration
//!
//! [`StressTestRunner`] wires the pipeline together:
//! scenario → shock mapper → sensitivity model → Monte Carlo engine →
//! aggregator. It holds only immutable configuration, so one runner can
//! serve concurrent evaluations.

use crate::aggregate::{RiskAggregator, RiskReport};
use crate::config::{MetricBaselines, StressConfig};
use crate::engine::MonteCarloEngine;
use crate::error::{Result, StressError};
use crate::exposure::SensitivityModel;
use crate::scenario::{Scenario, ScenarioLibrary};
use crate::shock::{ShockMapper, StressVector};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Headline metric with its unstressed reference value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetric {
    pub metric_name: String,
    pub value: f64,
    pub unit: String,
    pub baseline_value: f64,
}

impl RiskMetric {
    fn new(name: String, value: f64, unit: &str, baseline_value: f64) -> Self {
        Self {
            metric_name: name,
            value,
            unit: unit.to_string(),
            baseline_value,
        }
    }

    /// Change relative to the baseline
    pub fn delta(&self) -> f64 {
        self.value - self.baseline_value
    }
}

/// Result of running one scenario, ready for the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTestOutcome {
    /// Run identifier (e.g. "SCN-1718000000000")
    pub scenario_id: String,

    pub scenario_name: String,

    pub portfolio_segment: String,

    /// One-line summary of the run
    pub description: String,

    pub generated_at: DateTime<Utc>,

    /// Stress applied per factor
    pub stress: StressVector,

    /// Simulated risk metrics
    pub report: RiskReport,

    /// Headline metrics with baselines
    pub metrics: Vec<RiskMetric>,

    /// Estimated funding gap in days
    pub liquidity_gap_days: f64,
}

/// Comparison across several scenario outcomes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTestSummary {
    /// Scenario with the largest VaR
    pub worst_scenario: String,

    pub max_value_at_risk: f64,

    /// Scenario with the smallest VaR
    pub mildest_scenario: String,

    pub min_value_at_risk: f64,

    /// Average stressed net impact across scenarios
    pub average_net_impact: f64,

    pub scenarios_run: usize,
}

/// Runs scenarios through the full simulation pipeline
pub struct StressTestRunner {
    config: StressConfig,
    mapper: ShockMapper,
    model: Box<dyn SensitivityModel>,
    engine: MonteCarloEngine,
    aggregator: RiskAggregator,
}

impl StressTestRunner {
    /// Build a runner with the sensitivity model named in the configuration
    pub fn from_config(config: StressConfig) -> Result<Self> {
        let model = config.sensitivity_model()?;
        Self::with_model(config, model)
    }

    /// Build a runner with a caller-supplied sensitivity model
    pub fn with_model(config: StressConfig, model: Box<dyn SensitivityModel>) -> Result<Self> {
        config.validate()?;
        let engine =
            MonteCarloEngine::new(config.factor_dynamics.clone()).with_parallel(config.parallel);
        let aggregator = RiskAggregator::new(config.sample_paths);

        Ok(Self {
            config,
            mapper: ShockMapper::new(),
            model,
            engine,
            aggregator,
        })
    }

    pub fn config(&self) -> &StressConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Map, simulate and aggregate one scenario
    pub fn evaluate(&self, scenario: &Scenario) -> Result<RiskReport> {
        let stress = self.mapper.map(scenario)?;
        self.evaluate_stress(scenario, &stress)
    }

    fn evaluate_stress(&self, scenario: &Scenario, stress: &StressVector) -> Result<RiskReport> {
        let exposures = self.model.sensitivities_for(scenario)?;
        let correlation = self.config.correlation(exposures.num_factors())?;

        let dist = self.engine.simulate(
            stress,
            &exposures,
            self.config.trials,
            scenario.horizon_months,
            &correlation,
            self.config.seed,
        )?;

        self.aggregator.aggregate(&dist, self.config.confidence)
    }

    /// Run a scenario and package the result with headline metrics
    ///
    /// # Example
    ///
    /// ```
    /// use ag_stress::{Scenario, StressConfig, StressTestRunner};
    ///
    /// let config = StressConfig::default().with_trials(2_000).with_seed(42);
    /// let runner = StressTestRunner::from_config(config).unwrap();
    ///
    /// let outcome = runner.run(&Scenario::new(-4.0, -35.0, 0.0, 12)).unwrap();
    /// assert!(outcome.report.expected_loss > 0.0);
    /// assert_eq!(outcome.metrics.len(), 3);
    /// ```
    pub fn run(&self, scenario: &Scenario) -> Result<StressTestOutcome> {
        info!(
            scenario = %scenario.name,
            segment = %scenario.portfolio_segment,
            horizon_months = scenario.horizon_months,
            trials = self.config.trials,
            seed = ?self.config.seed,
            model = self.model.name(),
            "Running stress test"
        );

        let stress = self.mapper.map(scenario)?;
        let report = self.evaluate_stress(scenario, &stress)?;
        let liquidity_gap_days = liquidity_gap_days(scenario);
        let metrics = headline_metrics(&report, liquidity_gap_days, &self.config.baselines);

        info!(
            scenario = %scenario.name,
            expected_loss = report.expected_loss,
            value_at_risk = report.value_at_risk,
            stressed_net_impact = report.stressed_net_impact,
            "Stress test completed"
        );

        let generated_at = Utc::now();
        Ok(StressTestOutcome {
            scenario_id: format!("SCN-{}", generated_at.timestamp_millis()),
            scenario_name: scenario.name.clone(),
            portfolio_segment: scenario.portfolio_segment.clone(),
            description: format!(
                "Stress test completed for {} under the '{}' scenario.",
                scenario.portfolio_segment, scenario.name
            ),
            generated_at,
            stress,
            report,
            metrics,
            liquidity_gap_days,
        })
    }

    /// Run every scenario in a library, in order
    pub fn run_all(&self, library: &ScenarioLibrary) -> Result<Vec<StressTestOutcome>> {
        library
            .scenarios()
            .iter()
            .map(|scenario| self.run(scenario))
            .collect()
    }

    /// Run a scenario on the blocking thread pool
    ///
    /// Dropping the returned future abandons the result; the simulation
    /// holds no external resources.
    #[cfg(feature = "async")]
    pub async fn run_async(
        self: std::sync::Arc<Self>,
        scenario: Scenario,
    ) -> Result<StressTestOutcome> {
        tokio::task::spawn_blocking(move || self.run(&scenario))
            .await
            .map_err(|e| StressError::Aborted(e.to_string()))?
    }
}

/// Compare outcomes across scenarios
pub fn summarize(outcomes: &[StressTestOutcome]) -> Result<StressTestSummary> {
    let first = outcomes
        .first()
        .ok_or_else(|| StressError::validation("No stress test outcomes provided"))?;

    let mut worst = first;
    let mut mildest = first;
    let mut total_impact = 0.0;

    for outcome in outcomes {
        total_impact += outcome.report.stressed_net_impact;

        if outcome.report.value_at_risk > worst.report.value_at_risk {
            worst = outcome;
        }
        if outcome.report.value_at_risk < mildest.report.value_at_risk {
            mildest = outcome;
        }
    }

    Ok(StressTestSummary {
        worst_scenario: worst.scenario_name.clone(),
        max_value_at_risk: worst.report.value_at_risk,
        mildest_scenario: mildest.scenario_name.clone(),
        min_value_at_risk: mildest.report.value_at_risk,
        average_net_impact: total_impact / outcomes.len() as f64,
        scenarios_run: outcomes.len(),
    })
}

/// Funding gap estimate: 3 days per point of total shock plus half a day
/// per month of horizon
pub fn liquidity_gap_days(scenario: &Scenario) -> f64 {
    scenario.total_shock_magnitude() * 3.0 + scenario.horizon_months as f64 * 0.5
}

fn headline_metrics(
    report: &RiskReport,
    liquidity_gap_days: f64,
    baselines: &MetricBaselines,
) -> Vec<RiskMetric> {
    vec![
        RiskMetric::new(
            format!("Expected_Loss ({}m)", report.horizon_months),
            report.expected_loss,
            "USD Million",
            baselines.expected_loss,
        ),
        RiskMetric::new(
            format!("VaR {}%", (report.confidence * 1e4).round() / 100.0),
            report.value_at_risk,
            "USD Million",
            baselines.value_at_risk,
        ),
        RiskMetric::new(
            "Liquidity Gap".to_string(),
            liquidity_gap_days,
            "Days",
            baselines.liquidity_gap_days,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exposure::{ExposureProfile, StaticExposureModel};
    use crate::scenario::factor;
    use std::collections::BTreeMap;

    fn fast_config() -> StressConfig {
        StressConfig::default().with_trials(2_000).with_seed(42)
    }

    #[test]
    fn test_runner_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StressTestRunner>();
        assert_send_sync::<MonteCarloEngine>();
        assert_send_sync::<RiskAggregator>();
    }

    #[test]
    fn test_liquidity_gap() {
        let scenario = Scenario::new(-4.0, -35.0, 0.0, 12);
        // 39 * 3 + 12 * 0.5
        assert!((liquidity_gap_days(&scenario) - 123.0).abs() < 1e-12);
    }

    #[test]
    fn test_run_populates_outcome() {
        let runner = StressTestRunner::from_config(fast_config()).unwrap();
        let scenario = ScenarioLibrary::severe_global_recession();
        let outcome = runner.run(&scenario).unwrap();

        assert!(outcome.scenario_id.starts_with("SCN-"));
        assert_eq!(outcome.scenario_name, "Severe Global Recession");
        assert!(outcome.description.contains("Mixed_Portfolio"));
        assert!((outcome.stress.get(factor::UNEMPLOYMENT) - 0.04).abs() < 1e-12);
        assert_eq!(outcome.metrics[0].metric_name, "Expected_Loss (12m)");
        assert_eq!(outcome.metrics[1].metric_name, "VaR 99%");
        assert_eq!(outcome.metrics[2].unit, "Days");
        assert_eq!(outcome.metrics[2].baseline_value, 60.0);
        assert_eq!(outcome.report.trials, 2_000);
    }

    #[test]
    fn test_evaluate_matches_run() {
        let runner = StressTestRunner::from_config(fast_config()).unwrap();
        let scenario = Scenario::new(-2.0, -10.0, 100.0, 6);

        let report = runner.evaluate(&scenario).unwrap();
        let outcome = runner.run(&scenario).unwrap();
        assert_eq!(report, outcome.report);
    }

    #[test]
    fn test_invalid_scenario_fails_fast() {
        let runner = StressTestRunner::from_config(fast_config()).unwrap();
        let err = runner.run(&Scenario::new(-4.0, -35.0, 0.0, 0)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_custom_model_without_primary_factors() {
        let mut segments = BTreeMap::new();
        segments.insert("stocks".to_string(), vec![100.0]);
        let profile = ExposureProfile::new(vec![factor::EQUITY.to_string()], segments).unwrap();
        let model = StaticExposureModel::new(profile).unwrap();
        let runner = StressTestRunner::with_model(fast_config(), Box::new(model)).unwrap();

        // Unshocked gdp and rates have no betas to apply
        let report = runner.evaluate(&Scenario::new(0.0, -20.0, 0.0, 12)).unwrap();
        assert_eq!(report.factor_contributions.len(), 1);
        assert!(report.stressed_net_impact < 0.0);

        // A real gdp shock cannot be dropped silently
        let err = runner.run(&Scenario::new(-2.0, -20.0, 0.0, 12)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_correlation_dimension_mismatch() {
        let config = fast_config().with_correlation(vec![vec![1.0, 0.2], vec![0.2, 1.0]]);
        let runner = StressTestRunner::from_config(config).unwrap();
        assert!(runner.evaluate(&Scenario::new(-1.0, -1.0, 0.0, 3)).is_err());
    }

    #[test]
    fn test_summarize() {
        let runner = StressTestRunner::from_config(fast_config()).unwrap();
        let outcomes = runner.run_all(&ScenarioLibrary::presets()).unwrap();
        assert_eq!(outcomes.len(), 4);

        let summary = summarize(&outcomes).unwrap();
        assert_eq!(summary.scenarios_run, 4);
        assert!(summary.max_value_at_risk >= summary.min_value_at_risk);
        assert_eq!(summary.worst_scenario, "Equity Crash with Recession");

        assert!(summarize(&[]).is_err());
    }
}
