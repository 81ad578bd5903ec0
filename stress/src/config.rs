//! Stress run configuration
//!
//! Loaded from YAML or JSON. Every field has a default, so an empty
//! document yields a usable configuration.

use crate::correlation::CorrelationMatrix;
use crate::engine::FactorDynamics;
use crate::error::{Result, StressError};
use crate::exposure::{ExposureProfile, MockLinearModel, SensitivityModel, StaticExposureModel};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where portfolio sensitivities come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExposureSource {
    /// Built-in mock model
    BuiltinMock {
        /// Beta amplification in severe regimes (0 = linear)
        #[serde(default)]
        regime_amplification: f64,
    },

    /// Profile given directly in the configuration
    Inline { profile: ExposureProfile },
}

impl Default for ExposureSource {
    fn default() -> Self {
        ExposureSource::BuiltinMock {
            regime_amplification: 0.0,
        }
    }
}

/// Reference values reported next to each headline metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricBaselines {
    /// Expected loss in an unstressed year (USD million)
    pub expected_loss: f64,

    /// VaR in an unstressed year (USD million)
    pub value_at_risk: f64,

    /// Liquidity gap in normal conditions (days)
    pub liquidity_gap_days: f64,
}

impl Default for MetricBaselines {
    fn default() -> Self {
        Self {
            expected_loss: 15.0,
            value_at_risk: 30.0,
            liquidity_gap_days: 60.0,
        }
    }
}

/// Configuration for a stress test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    /// Number of Monte Carlo trials
    pub trials: usize,

    /// VaR confidence level, in (0, 1)
    pub confidence: f64,

    /// Seed for reproducible runs (None = fresh entropy per run)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Factor correlation matrix in profile factor order (None = identity)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_matrix: Option<Vec<Vec<f64>>>,

    /// Sensitivity source
    pub exposure_profile_source: ExposureSource,

    /// Per-factor volatility and drift
    pub factor_dynamics: FactorDynamics,

    /// Run trials on the rayon pool
    pub parallel: bool,

    /// Number of trial paths kept in the report
    pub sample_paths: usize,

    /// Reference values for reported metrics
    pub baselines: MetricBaselines,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            trials: 10_000,
            confidence: 0.99,
            seed: None,
            correlation_matrix: None,
            exposure_profile_source: ExposureSource::default(),
            factor_dynamics: FactorDynamics::default(),
            parallel: true,
            sample_paths: 20,
            baselines: MetricBaselines::default(),
        }
    }
}

impl StressConfig {
    /// Load configuration from YAML string
    ///
    /// # Example
    ///
    /// ```
    /// use ag_stress::StressConfig;
    ///
    /// let yaml = r#"
    /// trials: 5000
    /// confidence: 0.95
    /// seed: 42
    /// "#;
    ///
    /// let config = StressConfig::from_yaml(yaml).unwrap();
    /// assert_eq!(config.trials, 5000);
    /// assert_eq!(config.seed, Some(42));
    /// ```
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: StressConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: StressConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            other => Err(StressError::Config(format!(
                "Unsupported config file extension: {:?}",
                other
            ))),
        }
    }

    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_correlation(mut self, rows: Vec<Vec<f64>>) -> Self {
        self.correlation_matrix = Some(rows);
        self
    }

    pub fn with_exposure_source(mut self, source: ExposureSource) -> Self {
        self.exposure_profile_source = source;
        self
    }

    /// Check values that can be checked without a scenario
    ///
    /// Correlation PSD-ness is checked when the matrix is built.
    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(StressError::validation("trials must be positive"));
        }

        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(StressError::validation(format!(
                "Invalid confidence level: {} (must be between 0 and 1)",
                self.confidence
            )));
        }

        if let ExposureSource::BuiltinMock {
            regime_amplification,
        } = &self.exposure_profile_source
        {
            if !regime_amplification.is_finite() || *regime_amplification < 0.0 {
                return Err(StressError::Config(format!(
                    "regime_amplification must be finite and non-negative, got {}",
                    regime_amplification
                )));
            }
        }

        self.factor_dynamics.validate()
    }

    /// Instantiate the configured sensitivity model
    pub fn sensitivity_model(&self) -> Result<Box<dyn SensitivityModel>> {
        match &self.exposure_profile_source {
            ExposureSource::BuiltinMock {
                regime_amplification,
            } => Ok(Box::new(MockLinearModel::with_regime_amplification(
                *regime_amplification,
            ))),
            ExposureSource::Inline { profile } => {
                Ok(Box::new(StaticExposureModel::new(profile.clone())?))
            }
        }
    }

    /// Correlation matrix over `num_factors` factors
    pub fn correlation(&self, num_factors: usize) -> Result<CorrelationMatrix> {
        match &self.correlation_matrix {
            Some(rows) => CorrelationMatrix::new(rows.clone()),
            None => Ok(CorrelationMatrix::identity(num_factors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StressConfig::default();
        assert_eq!(config.trials, 10_000);
        assert_eq!(config.confidence, 0.99);
        assert!(config.seed.is_none());
        assert!(config.parallel);
        assert_eq!(config.exposure_profile_source, ExposureSource::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config = StressConfig::from_yaml("{}").unwrap();
        assert_eq!(config, StressConfig::default());
    }

    #[test]
    fn test_inline_profile_yaml() {
        let yaml = r#"
trials: 2000
seed: 7
correlation_matrix:
  - [1.0, 0.3]
  - [0.3, 1.0]
exposure_profile_source:
  type: inline
  profile:
    factors: [gdp, equity]
    segments:
      loans: [500.0, 10.0]
      stocks: [50.0, 300.0]
"#;

        let config = StressConfig::from_yaml(yaml).unwrap();
        let model = config.sensitivity_model().unwrap();
        assert_eq!(model.name(), "static");

        let profile = model.sensitivities().unwrap();
        assert_eq!(profile.factors(), &["gdp".to_string(), "equity".to_string()]);
        assert_eq!(config.correlation(2).unwrap().get(0, 1), 0.3);
    }

    #[test]
    fn test_builtin_source_json() {
        let json = r#"{
  "confidence": 0.95,
  "exposure_profile_source": { "type": "builtin_mock", "regime_amplification": 0.25 }
}"#;

        let config = StressConfig::from_json(json).unwrap();
        assert_eq!(config.confidence, 0.95);
        assert_eq!(config.sensitivity_model().unwrap().name(), "mock_linear");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(StressConfig::from_yaml("trials: 0").is_err());
        assert!(StressConfig::from_yaml("confidence: 1.0").is_err());
        assert!(StressConfig::from_yaml("confidence: 0.0").is_err());
        assert!(StressConfig::from_yaml(
            "exposure_profile_source: { type: builtin_mock, regime_amplification: -1.0 }"
        )
        .is_err());
        assert!(StressConfig::from_yaml("trials: many").is_err());
    }

    #[test]
    fn test_identity_correlation_default() {
        let corr = StressConfig::default().correlation(8).unwrap();
        assert_eq!(corr.dim(), 8);
        assert_eq!(corr.get(3, 3), 1.0);
        assert_eq!(corr.get(3, 4), 0.0);
    }

    #[test]
    fn test_serialization_yaml() {
        let config = StressConfig::default().with_seed(42).with_trials(500);
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("seed: 42"));
        assert!(yaml.contains("builtin_mock"));

        let parsed = StressConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, config);
    }
}
