//! # ag-stress: Macro Stress-Test Risk Simulation Core
//!
//! Turns a macroeconomic stress scenario into simulated portfolio loss
//! distributions and headline risk metrics.
//!
//! ## Core Components
//!
//! - **ShockMapper**: Validates a scenario and maps it to per-factor shifts
//! - **SensitivityModel**: Supplies portfolio betas (mock or static profile)
//! - **CorrelationMatrix**: PSD-checked factor correlation with a factorization
//! - **MonteCarloEngine**: Seeded, parallel path simulation
//! - **RiskAggregator**: Expected loss, VaR, expected shortfall, attribution
//! - **StressTestRunner**: End-to-end orchestration from YAML/JSON config
//!
//! ## Example Usage
//!
//! ```rust
//! use ag_stress::{Scenario, StressConfig, StressTestRunner};
//!
//! let yaml = r#"
//! trials: 2000
//! confidence: 0.99
//! seed: 42
//! "#;
//!
//! let config = StressConfig::from_yaml(yaml).unwrap();
//! let runner = StressTestRunner::from_config(config).unwrap();
//!
//! // GDP -4%, equities -35%, rates unchanged, 12 month horizon
//! let scenario = Scenario::new(-4.0, -35.0, 0.0, 12);
//! let report = runner.evaluate(&scenario).unwrap();
//!
//! assert!(report.value_at_risk >= report.expected_loss);
//! assert!(report.stressed_net_impact < 0.0);
//! ```

mod aggregate;
mod config;
mod correlation;
mod engine;
mod error;
mod exposure;
mod runner;
mod scenario;
mod shock;

pub use aggregate::{quantile_sorted, ContributionBasis, RiskAggregator, RiskReport};
pub use config::{ExposureSource, MetricBaselines, StressConfig};
pub use correlation::{CorrelationMatrix, Factorization};
pub use engine::{FactorDynamics, MonteCarloEngine, SimulatedDistribution, SimulationPath};
pub use error::{Result, StressError};
pub use exposure::{ExposureProfile, MockLinearModel, SensitivityModel, StaticExposureModel};
pub use runner::{
    liquidity_gap_days, summarize, RiskMetric, StressTestOutcome, StressTestRunner,
    StressTestSummary,
};
pub use scenario::{factor, FactorShock, Scenario, ScenarioLibrary, ShockUnit};
pub use shock::{
    ShockMapper, StressVector, MAX_HORIZON_MONTHS, MAX_PCT_SHOCK, MAX_RATE_SHIFT_BPS,
};
