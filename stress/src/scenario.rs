//! Macro stress scenarios
//!
//! A [`Scenario`] is the typed output of the scenario interpreter: three
//! primary macro shocks (GDP, equity drawdown, rate shift), a horizon, and
//! optionally shocks to secondary factors. The [`ScenarioLibrary`] carries
//! the named presets used for demos and regression tests.

use crate::error::{Result, StressError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Macro factor names recognized by the shock mapper
pub mod factor {
    pub const GDP: &str = "gdp";
    pub const EQUITY: &str = "equity";
    pub const RATES: &str = "rates";
    pub const UNEMPLOYMENT: &str = "unemployment";
    pub const INFLATION: &str = "inflation";
    pub const HOUSING: &str = "housing";
    pub const COMMODITIES: &str = "commodities";
    pub const FX_VOL: &str = "fx_vol";

    /// All recognized factors, primary factors first
    pub const RECOGNIZED: [&str; 8] = [
        GDP,
        EQUITY,
        RATES,
        UNEMPLOYMENT,
        INFLATION,
        HOUSING,
        COMMODITIES,
        FX_VOL,
    ];

    /// Check whether a factor name is recognized
    pub fn is_recognized(name: &str) -> bool {
        RECOGNIZED.contains(&name)
    }
}

/// Unit of a secondary factor shock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShockUnit {
    /// Change in percentage points (e.g. unemployment +4.0)
    PctPoints,
    /// Relative change in percent (e.g. housing prices -10.0)
    RelativeChange,
    /// Change in basis points
    BasisPoints,
}

impl ShockUnit {
    /// Divisor converting a shock in this unit into a fractional deviation
    pub fn scale(&self) -> f64 {
        match self {
            ShockUnit::PctPoints | ShockUnit::RelativeChange => 100.0,
            ShockUnit::BasisPoints => 10_000.0,
        }
    }
}

/// Shock to a secondary macro factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorShock {
    /// Factor name (see [`factor::RECOGNIZED`])
    pub factor: String,

    /// Shock magnitude in `unit`
    pub shock_value: f64,

    /// Unit of `shock_value`
    pub unit: ShockUnit,
}

impl FactorShock {
    pub fn new(factor: &str, shock_value: f64, unit: ShockUnit) -> Self {
        Self {
            factor: factor.to_string(),
            shock_value,
            unit,
        }
    }

    /// Shock expressed in percentage points, used for severity measures
    pub fn magnitude_pct(&self) -> f64 {
        (self.shock_value * 100.0 / self.unit.scale()).abs()
    }
}

/// Structured macro stress scenario
///
/// Produced by the external scenario interpreter. Shock magnitudes are in
/// the units a narrative uses: percent for GDP and equity, basis points for
/// rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name (e.g. "Severe Global Recession")
    #[serde(default = "default_scenario_name")]
    pub name: String,

    /// Free-text narrative from the interpreter
    #[serde(default)]
    pub narrative: String,

    /// Portfolio segment the scenario is run against
    #[serde(default = "default_portfolio_segment")]
    pub portfolio_segment: String,

    /// Real GDP shock in percent (e.g. -4.0 for a 4% contraction)
    pub gdp_shock_pct: f64,

    /// Equity index drawdown in percent (e.g. -35.0)
    pub equity_drawdown_pct: f64,

    /// Parallel rate shift in basis points
    pub rate_shift_bps: f64,

    /// Scenario horizon in months
    pub horizon_months: u32,

    /// Shocks to secondary factors
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_shocks: Vec<FactorShock>,
}

fn default_scenario_name() -> String {
    "Custom Scenario".to_string()
}

fn default_portfolio_segment() -> String {
    "Mixed_Portfolio".to_string()
}

impl Scenario {
    /// Create a scenario from the three primary shocks and a horizon
    pub fn new(
        gdp_shock_pct: f64,
        equity_drawdown_pct: f64,
        rate_shift_bps: f64,
        horizon_months: u32,
    ) -> Self {
        Self {
            name: default_scenario_name(),
            narrative: String::new(),
            portfolio_segment: default_portfolio_segment(),
            gdp_shock_pct,
            equity_drawdown_pct,
            rate_shift_bps,
            horizon_months,
            additional_shocks: Vec::new(),
        }
    }

    /// Scenario with every shock at zero
    pub fn unstressed(horizon_months: u32) -> Self {
        Self::new(0.0, 0.0, 0.0, horizon_months).with_name("Unstressed Baseline")
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_narrative(mut self, narrative: &str) -> Self {
        self.narrative = narrative.to_string();
        self
    }

    pub fn with_portfolio_segment(mut self, segment: &str) -> Self {
        self.portfolio_segment = segment.to_string();
        self
    }

    /// Add a secondary factor shock
    pub fn with_shock(mut self, shock: FactorShock) -> Self {
        self.additional_shocks.push(shock);
        self
    }

    /// Parse a scenario from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a scenario from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a scenario from a `.json`, `.yaml` or `.yml` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&contents),
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            other => Err(StressError::Config(format!(
                "Unsupported scenario file extension: {:?}",
                other
            ))),
        }
    }

    /// Sum of absolute shock sizes in percentage points
    ///
    /// Rate shifts count as percentage points (100 bps = 1.0).
    pub fn total_shock_magnitude(&self) -> f64 {
        let primary = self.gdp_shock_pct.abs()
            + self.equity_drawdown_pct.abs()
            + (self.rate_shift_bps / 100.0).abs();
        primary
            + self
                .additional_shocks
                .iter()
                .map(FactorShock::magnitude_pct)
                .sum::<f64>()
    }

    /// Whether every shock in the scenario is zero
    pub fn is_unstressed(&self) -> bool {
        self.gdp_shock_pct == 0.0
            && self.equity_drawdown_pct == 0.0
            && self.rate_shift_bps == 0.0
            && self.additional_shocks.iter().all(|s| s.shock_value == 0.0)
    }
}

/// Collection of named scenarios
#[derive(Debug, Clone, Default)]
pub struct ScenarioLibrary {
    scenarios: Vec<Scenario>,
}

impl ScenarioLibrary {
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        Self { scenarios }
    }

    /// Library with the built-in presets
    pub fn presets() -> Self {
        Self {
            scenarios: vec![
                Self::severe_global_recession(),
                Self::stagflation_crisis(),
                Self::mild_market_correction(),
                Self::equity_crash_with_recession(),
            ],
        }
    }

    /// Synchronized global downturn: credit and market risk together
    pub fn severe_global_recession() -> Scenario {
        Scenario::new(-3.5, -30.0, 0.0, 12)
            .with_name("Severe Global Recession")
            .with_narrative(
                "A sharp, synchronized global downturn triggered by high inflation and \
                 aggressive central bank tightening, with a surge in defaults and volatility.",
            )
            .with_shock(FactorShock::new(factor::UNEMPLOYMENT, 4.0, ShockUnit::PctPoints))
    }

    /// High inflation with stagnant growth and aggressive hikes
    pub fn stagflation_crisis() -> Scenario {
        Scenario::new(0.0, 0.0, 300.0, 12)
            .with_name("Stagflation Crisis")
            .with_narrative(
                "Prolonged high inflation with stagnant growth forces central banks to hike \
                 rates, pressuring fixed income and debt servicing costs.",
            )
            .with_shock(FactorShock::new(factor::INFLATION, 5.0, ShockUnit::PctPoints))
            .with_shock(FactorShock::new(factor::HOUSING, -10.0, ShockUnit::RelativeChange))
    }

    /// Mild correction concentrated in commodity-linked exposures
    pub fn mild_market_correction() -> Scenario {
        Scenario::new(0.0, 0.0, 0.0, 12)
            .with_name("Mild Market Correction")
            .with_narrative(
                "A mild correction driven by supply chain normalization, primarily \
                 affecting commodity-linked portfolios.",
            )
            .with_shock(FactorShock::new(
                factor::COMMODITIES,
                -15.0,
                ShockUnit::RelativeChange,
            ))
            .with_shock(FactorShock::new(factor::FX_VOL, 0.5, ShockUnit::PctPoints))
    }

    /// Reference scenario: 4% GDP contraction with a 35% equity drawdown
    pub fn equity_crash_with_recession() -> Scenario {
        Scenario::new(-4.0, -35.0, 0.0, 12)
            .with_name("Equity Crash with Recession")
            .with_narrative("Equity markets fall 35% as GDP contracts 4% over one year.")
    }

    /// Add custom scenario
    pub fn add_scenario(&mut self, scenario: Scenario) {
        self.scenarios.push(scenario);
    }

    /// Look up a scenario by name (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Get all scenarios
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_from_json_defaults() {
        let json = r#"{
            "gdp_shock_pct": -4.0,
            "equity_drawdown_pct": -35.0,
            "rate_shift_bps": 0.0,
            "horizon_months": 12
        }"#;

        let scenario = Scenario::from_json(json).unwrap();
        assert_eq!(scenario.gdp_shock_pct, -4.0);
        assert_eq!(scenario.horizon_months, 12);
        assert_eq!(scenario.name, "Custom Scenario");
        assert_eq!(scenario.portfolio_segment, "Mixed_Portfolio");
        assert!(scenario.additional_shocks.is_empty());
    }

    #[test]
    fn test_scenario_from_yaml_with_shocks() {
        let yaml = r#"
name: Severe Global Recession
gdp_shock_pct: -3.5
equity_drawdown_pct: -30.0
rate_shift_bps: 0.0
horizon_months: 24
additional_shocks:
  - factor: unemployment
    shock_value: 4.0
    unit: pct_points
"#;

        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.name, "Severe Global Recession");
        assert_eq!(scenario.horizon_months, 24);
        assert_eq!(scenario.additional_shocks.len(), 1);
        assert_eq!(scenario.additional_shocks[0].unit, ShockUnit::PctPoints);
    }

    #[test]
    fn test_negative_horizon_rejected_by_parser() {
        let json = r#"{
            "gdp_shock_pct": 0.0,
            "equity_drawdown_pct": 0.0,
            "rate_shift_bps": 0.0,
            "horizon_months": -3
        }"#;

        assert!(Scenario::from_json(json).is_err());
    }

    #[test]
    fn test_total_shock_magnitude() {
        let scenario = Scenario::new(-4.0, -35.0, 150.0, 12)
            .with_shock(FactorShock::new(factor::HOUSING, -10.0, ShockUnit::RelativeChange))
            .with_shock(FactorShock::new(factor::INFLATION, 50.0, ShockUnit::BasisPoints));

        // 4 + 35 + 1.5 + 10 + 0.5
        assert!((scenario.total_shock_magnitude() - 51.0).abs() < 1e-12);
    }

    #[test]
    fn test_unstressed() {
        assert!(Scenario::unstressed(6).is_unstressed());
        assert!(!ScenarioLibrary::mild_market_correction().is_unstressed());
    }

    #[test]
    fn test_presets() {
        let library = ScenarioLibrary::presets();
        assert_eq!(library.scenarios().len(), 4);

        let stagflation = library.get("stagflation crisis").unwrap();
        assert_eq!(stagflation.rate_shift_bps, 300.0);
        assert_eq!(stagflation.additional_shocks.len(), 2);

        for scenario in library.scenarios() {
            for shock in &scenario.additional_shocks {
                assert!(factor::is_recognized(&shock.factor));
            }
        }
    }

    #[test]
    fn test_custom_scenario() {
        let mut library = ScenarioLibrary::default();
        library.add_scenario(Scenario::new(-1.0, -5.0, 25.0, 3).with_name("Soft Landing"));

        assert!(library.get("Soft Landing").is_some());
        assert!(library.get("Hard Landing").is_none());
    }
}
