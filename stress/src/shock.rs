//! Shock mapping
//!
//! Converts a [`Scenario`] expressed in narrative units (percent, basis
//! points) into a [`StressVector`] of fractional per-factor deviations from
//! baseline. Pure and deterministic.

use crate::error::{Result, StressError};
use crate::scenario::{factor, Scenario};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Longest supported scenario horizon (30 years)
pub const MAX_HORIZON_MONTHS: u32 = 360;

/// Bound on percentage inputs, in percent
pub const MAX_PCT_SHOCK: f64 = 100.0;

/// Bound on rate shifts, in basis points
pub const MAX_RATE_SHIFT_BPS: f64 = 10_000.0;

/// Per-factor stressed deviation from baseline
///
/// Values are fractions: a 4% GDP contraction is stored as `gdp = -0.04`.
/// Factors not present are treated as unstressed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StressVector {
    shifts: BTreeMap<String, f64>,
}

impl StressVector {
    /// Empty vector (zero stress on every factor)
    pub fn zero() -> Self {
        Self::default()
    }

    /// Build from explicit factor shifts
    pub fn from_shifts<I, S>(shifts: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            shifts: shifts.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Stress for a factor, zero if unmapped
    pub fn get(&self, factor: &str) -> f64 {
        self.shifts.get(factor).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, factor: &str) -> bool {
        self.shifts.contains_key(factor)
    }

    pub fn factors(&self) -> impl Iterator<Item = &str> {
        self.shifts.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.shifts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.shifts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty()
    }

    /// True when every mapped shift is zero
    pub fn is_zero(&self) -> bool {
        self.shifts.values().all(|v| *v == 0.0)
    }

    /// Lay the vector out along `factors`, defaulting unmapped factors to zero
    ///
    /// Zero shifts on factors outside `factors` are dropped; a non-zero
    /// shift on such a factor is an error.
    pub fn aligned_to(&self, factors: &[String]) -> Result<Vec<f64>> {
        if let Some((unknown, _)) = self
            .shifts
            .iter()
            .find(|(k, v)| **v != 0.0 && !factors.contains(*k))
        {
            return Err(StressError::validation(format!(
                "Stressed factor '{}' is not a dimension of the exposure profile",
                unknown
            )));
        }

        Ok(factors.iter().map(|f| self.get(f)).collect())
    }
}

/// Maps scenarios onto stress vectors
#[derive(Debug, Clone)]
pub struct ShockMapper {
    max_horizon_months: u32,
}

impl Default for ShockMapper {
    fn default() -> Self {
        Self {
            max_horizon_months: MAX_HORIZON_MONTHS,
        }
    }
}

impl ShockMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the longest accepted horizon
    pub fn with_max_horizon(max_horizon_months: u32) -> Self {
        Self { max_horizon_months }
    }

    /// Convert a scenario into a per-factor stress vector
    ///
    /// # Example
    ///
    /// ```
    /// use ag_stress::{Scenario, ShockMapper};
    ///
    /// let scenario = Scenario::new(-4.0, -35.0, 50.0, 12);
    /// let stress = ShockMapper::new().map(&scenario).unwrap();
    ///
    /// assert!((stress.get("gdp") + 0.04).abs() < 1e-12);
    /// assert!((stress.get("equity") + 0.35).abs() < 1e-12);
    /// assert!((stress.get("rates") - 0.005).abs() < 1e-12);
    /// ```
    pub fn map(&self, scenario: &Scenario) -> Result<StressVector> {
        self.validate(scenario)?;

        let mut shifts = BTreeMap::new();
        shifts.insert(factor::GDP.to_string(), scenario.gdp_shock_pct / 100.0);
        shifts.insert(
            factor::EQUITY.to_string(),
            scenario.equity_drawdown_pct / 100.0,
        );
        shifts.insert(factor::RATES.to_string(), scenario.rate_shift_bps / 10_000.0);

        for shock in &scenario.additional_shocks {
            let shift = shock.shock_value / shock.unit.scale();
            if shifts.insert(shock.factor.clone(), shift).is_some() {
                return Err(StressError::validation(format!(
                    "Factor '{}' is shocked more than once",
                    shock.factor
                )));
            }
        }

        Ok(StressVector { shifts })
    }

    fn validate(&self, scenario: &Scenario) -> Result<()> {
        if scenario.horizon_months == 0 {
            return Err(StressError::validation("horizon_months must be positive"));
        }

        if scenario.horizon_months > self.max_horizon_months {
            return Err(StressError::validation(format!(
                "horizon_months {} exceeds supported maximum {}",
                scenario.horizon_months, self.max_horizon_months
            )));
        }

        check_pct("gdp_shock_pct", scenario.gdp_shock_pct)?;
        check_pct("equity_drawdown_pct", scenario.equity_drawdown_pct)?;

        if !scenario.rate_shift_bps.is_finite()
            || scenario.rate_shift_bps.abs() > MAX_RATE_SHIFT_BPS
        {
            return Err(StressError::validation(format!(
                "rate_shift_bps {} outside [-{}, {}]",
                scenario.rate_shift_bps, MAX_RATE_SHIFT_BPS, MAX_RATE_SHIFT_BPS
            )));
        }

        for shock in &scenario.additional_shocks {
            if !factor::is_recognized(&shock.factor) {
                return Err(StressError::validation(format!(
                    "Unrecognized macro factor '{}'",
                    shock.factor
                )));
            }

            let shift = shock.shock_value / shock.unit.scale();
            if !shift.is_finite() || shift.abs() > 1.0 {
                return Err(StressError::validation(format!(
                    "Shock to '{}' ({} {:?}) outside [-100%, +100%]",
                    shock.factor, shock.shock_value, shock.unit
                )));
            }
        }

        Ok(())
    }
}

fn check_pct(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value.abs() > MAX_PCT_SHOCK {
        return Err(StressError::validation(format!(
            "{} {} outside [-{}, {}]",
            field, value, MAX_PCT_SHOCK, MAX_PCT_SHOCK
        )));
    }
    Ok(())
}
