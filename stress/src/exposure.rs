//! Portfolio exposure models
//!
//! An [`ExposureProfile`] holds the sensitivity (beta) of each portfolio
//! segment to each macro factor, in USD million of PnL per unit fractional
//! factor move. Profiles come from a [`SensitivityModel`]; the built-in
//! [`MockLinearModel`] stands in for a trained predictive model.

use crate::error::{Result, StressError};
use crate::scenario::{factor, Scenario};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Segment sensitivities to macro factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureProfile {
    /// Factor dimensions, in beta-vector order
    factors: Vec<String>,

    /// Betas per segment, one entry per factor
    segments: BTreeMap<String, Vec<f64>>,
}

impl ExposureProfile {
    /// Create a validated profile
    pub fn new(factors: Vec<String>, segments: BTreeMap<String, Vec<f64>>) -> Result<Self> {
        let profile = Self { factors, segments };
        profile.validate()?;
        Ok(profile)
    }

    /// Check shape and finiteness
    ///
    /// Deserialized profiles must be validated before use.
    pub fn validate(&self) -> Result<()> {
        if self.factors.is_empty() {
            return Err(StressError::validation("Exposure profile has no factors"));
        }

        if self.segments.is_empty() {
            return Err(StressError::validation("Exposure profile has no segments"));
        }

        for (i, name) in self.factors.iter().enumerate() {
            if self.factors[..i].contains(name) {
                return Err(StressError::validation(format!(
                    "Duplicate factor '{}' in exposure profile",
                    name
                )));
            }
        }

        for (segment, betas) in &self.segments {
            if betas.len() != self.factors.len() {
                return Err(StressError::validation(format!(
                    "Segment '{}' has {} betas, expected {}",
                    segment,
                    betas.len(),
                    self.factors.len()
                )));
            }

            if betas.iter().any(|b| !b.is_finite()) {
                return Err(StressError::validation(format!(
                    "Segment '{}' has non-finite betas",
                    segment
                )));
            }
        }

        Ok(())
    }

    pub fn factors(&self) -> &[String] {
        &self.factors
    }

    pub fn num_factors(&self) -> usize {
        self.factors.len()
    }

    pub fn segments(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.segments.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Betas for one segment
    pub fn betas(&self, segment: &str) -> Option<&[f64]> {
        self.segments.get(segment).map(Vec::as_slice)
    }

    /// Position of a factor in beta vectors
    pub fn factor_index(&self, factor: &str) -> Option<usize> {
        self.factors.iter().position(|f| f == factor)
    }

    /// Portfolio-level beta per factor (sum across segments)
    pub fn portfolio_betas(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.factors.len()];
        for betas in self.segments.values() {
            for (t, b) in total.iter_mut().zip(betas) {
                *t += b;
            }
        }
        total
    }

    /// Copy with every beta multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            factors: self.factors.clone(),
            segments: self
                .segments
                .iter()
                .map(|(k, v)| (k.clone(), v.iter().map(|b| b * factor).collect()))
                .collect(),
        }
    }
}

/// Source of portfolio sensitivities
///
/// Anything that can produce an [`ExposureProfile`] can drive the
/// simulation. Implementations must be deterministic: equal configuration
/// yields equal profiles.
pub trait SensitivityModel: Send + Sync {
    /// Model name for logging
    fn name(&self) -> &str;

    /// Baseline sensitivities
    fn sensitivities(&self) -> Result<ExposureProfile>;

    /// Sensitivities for a given scenario
    ///
    /// Regime-dependent models override this; the default ignores the
    /// scenario.
    fn sensitivities_for(&self, _scenario: &Scenario) -> Result<ExposureProfile> {
        self.sensitivities()
    }
}

/// Built-in mock of a trained sensitivity model
///
/// Linear betas for a mixed portfolio. With a non-zero regime
/// amplification, betas grow with scenario severity, mimicking the
/// non-linear response of a fitted model in stressed regimes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockLinearModel {
    regime_amplification: f64,
}

impl MockLinearModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scale betas by `1 + amplification * severity` in `sensitivities_for`
    ///
    /// Severity is the scenario's total shock magnitude divided by 100,
    /// capped at 1.
    pub fn with_regime_amplification(amplification: f64) -> Self {
        Self {
            regime_amplification: amplification,
        }
    }

    fn segment_rows() -> [(&'static str, [f64; 8]); 5] {
        // gdp, equity, rates, unemployment, inflation, housing, commodities, fx_vol
        [
            ("commodities_book", [80.0, 20.0, 0.0, 0.0, 120.0, 0.0, 300.0, -40.0]),
            (
                "corporate_credit",
                [600.0, 80.0, -900.0, -400.0, -100.0, 0.0, 0.0, -5.0],
            ),
            ("equities", [150.0, 400.0, -50.0, -20.0, -30.0, 0.0, 20.0, -10.0]),
            (
                "government_bonds",
                [-100.0, 0.0, -1500.0, 50.0, -400.0, 0.0, 0.0, 0.0],
            ),
            ("real_estate", [200.0, 30.0, -600.0, -150.0, 50.0, 500.0, 0.0, 0.0]),
        ]
    }
}

impl SensitivityModel for MockLinearModel {
    fn name(&self) -> &str {
        "mock_linear"
    }

    fn sensitivities(&self) -> Result<ExposureProfile> {
        let factors = factor::RECOGNIZED.iter().map(|f| f.to_string()).collect();
        let segments = Self::segment_rows()
            .iter()
            .map(|(name, betas)| (name.to_string(), betas.to_vec()))
            .collect();
        ExposureProfile::new(factors, segments)
    }

    fn sensitivities_for(&self, scenario: &Scenario) -> Result<ExposureProfile> {
        let base = self.sensitivities()?;
        if self.regime_amplification == 0.0 {
            return Ok(base);
        }

        let severity = (scenario.total_shock_magnitude() / 100.0).min(1.0);
        Ok(base.scaled(1.0 + self.regime_amplification * severity))
    }
}

/// Sensitivity model backed by a configured profile
#[derive(Debug, Clone, PartialEq)]
pub struct StaticExposureModel {
    profile: ExposureProfile,
}

impl StaticExposureModel {
    pub fn new(profile: ExposureProfile) -> Result<Self> {
        profile.validate()?;
        Ok(Self { profile })
    }
}

impl SensitivityModel for StaticExposureModel {
    fn name(&self) -> &str {
        "static"
    }

    fn sensitivities(&self) -> Result<ExposureProfile> {
        Ok(self.profile.clone())
    }
}
