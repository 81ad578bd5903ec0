//! Monte Carlo PnL simulation
//!
//! Each trial draws a horizon-length sequence of correlated factor returns
//! `r = μ + diag(σ) B z`, with `z ~ N(0, I)` and `B Bᵀ` the factor
//! correlation matrix, and applies the exposure betas to obtain per-period
//! portfolio PnL.
//!
//! The scenario shock is spread evenly over the horizon: each period has
//! the same stressed mean `μ_f = drift_f + stress_f / horizon`, so the
//! expected cumulative factor move equals the scenario shock.
//!
//! Every trial owns a `ChaCha8Rng` seeded from the call's base seed and the
//! trial index. Results are identical whether trials run sequentially or in
//! parallel, and nothing is shared between concurrent calls.

use crate::correlation::CorrelationMatrix;
use crate::error::{Result, StressError};
use crate::exposure::ExposureProfile;
use crate::scenario::factor;
use crate::shock::StressVector;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Baseline per-period behavior of each macro factor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorDynamics {
    /// Per-period (monthly) volatility by factor
    #[serde(default)]
    pub volatilities: BTreeMap<String, f64>,

    /// Per-period baseline drift by factor (zero when absent)
    #[serde(default)]
    pub drifts: BTreeMap<String, f64>,

    /// Volatility for factors without an explicit entry
    #[serde(default = "default_volatility")]
    pub default_volatility: f64,
}

fn default_volatility() -> f64 {
    0.01
}

impl Default for FactorDynamics {
    fn default() -> Self {
        let volatilities = [
            (factor::GDP, 0.004),
            (factor::EQUITY, 0.045),
            (factor::RATES, 0.0025),
            (factor::UNEMPLOYMENT, 0.003),
            (factor::INFLATION, 0.002),
            (factor::HOUSING, 0.012),
            (factor::COMMODITIES, 0.06),
            (factor::FX_VOL, 0.01),
        ]
        .iter()
        .map(|(name, vol)| (name.to_string(), *vol))
        .collect();

        Self {
            volatilities,
            drifts: BTreeMap::new(),
            default_volatility: default_volatility(),
        }
    }
}

impl FactorDynamics {
    /// Same volatility for every factor, no drift
    pub fn uniform(volatility: f64) -> Self {
        Self {
            volatilities: BTreeMap::new(),
            drifts: BTreeMap::new(),
            default_volatility: volatility,
        }
    }

    pub fn with_volatility(mut self, factor: &str, volatility: f64) -> Self {
        self.volatilities.insert(factor.to_string(), volatility);
        self
    }

    pub fn with_drift(mut self, factor: &str, drift: f64) -> Self {
        self.drifts.insert(factor.to_string(), drift);
        self
    }

    pub fn volatility(&self, factor: &str) -> f64 {
        self.volatilities
            .get(factor)
            .copied()
            .unwrap_or(self.default_volatility)
    }

    pub fn drift(&self, factor: &str) -> f64 {
        self.drifts.get(factor).copied().unwrap_or(0.0)
    }

    pub fn validate(&self) -> Result<()> {
        let vols = self
            .volatilities
            .iter()
            .map(|(name, vol)| (name.as_str(), *vol))
            .chain(std::iter::once(("default", self.default_volatility)));
        for (name, vol) in vols {
            if !vol.is_finite() || vol < 0.0 {
                return Err(StressError::validation(format!(
                    "Volatility for '{}' must be finite and non-negative, got {}",
                    name, vol
                )));
            }
        }

        if let Some((name, drift)) = self.drifts.iter().find(|(_, d)| !d.is_finite()) {
            return Err(StressError::validation(format!(
                "Drift for '{}' must be finite, got {}",
                name, drift
            )));
        }

        Ok(())
    }
}

/// One Monte Carlo trial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationPath {
    /// Portfolio PnL in each period
    pub pnl: Vec<f64>,

    /// Horizon PnL attributed to each factor, in profile factor order
    pub factor_pnl: Vec<f64>,
}

impl SimulationPath {
    pub fn new(pnl: Vec<f64>, factor_pnl: Vec<f64>) -> Self {
        Self { pnl, factor_pnl }
    }

    /// Total PnL over the horizon
    pub fn total(&self) -> f64 {
        self.pnl.iter().sum()
    }

    /// Running PnL at the end of each period
    pub fn cumulative(&self) -> Vec<f64> {
        self.pnl
            .iter()
            .scan(0.0, |acc, p| {
                *acc += p;
                Some(*acc)
            })
            .collect()
    }

    pub fn horizon(&self) -> usize {
        self.pnl.len()
    }

    fn is_finite(&self) -> bool {
        self.pnl.iter().chain(&self.factor_pnl).all(|v| v.is_finite())
    }
}

/// Output of one `simulate` call: trials in index order plus the context
/// needed to aggregate them
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedDistribution {
    factors: Vec<String>,
    horizon: usize,
    paths: Vec<SimulationPath>,
    baseline_pnl: f64,
}

impl SimulatedDistribution {
    /// Assemble a distribution from externally produced paths
    ///
    /// `baseline_pnl` is the expected horizon PnL with zero stress.
    pub fn from_paths(
        factors: Vec<String>,
        horizon: usize,
        paths: Vec<SimulationPath>,
        baseline_pnl: f64,
    ) -> Self {
        Self {
            factors,
            horizon,
            paths,
            baseline_pnl,
        }
    }

    pub fn factors(&self) -> &[String] {
        &self.factors
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn paths(&self) -> &[SimulationPath] {
        &self.paths
    }

    pub fn trials(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn baseline_pnl(&self) -> f64 {
        self.baseline_pnl
    }

    /// Horizon PnL of each trial
    pub fn totals(&self) -> Vec<f64> {
        self.paths.iter().map(SimulationPath::total).collect()
    }

    pub fn into_paths(self) -> Vec<SimulationPath> {
        self.paths
    }
}

/// Per-call simulation inputs laid out along the profile's factors
struct TrialPlan<'a> {
    betas: Vec<f64>,
    means: Vec<f64>,
    vols: Vec<f64>,
    correlation: &'a CorrelationMatrix,
    horizon: usize,
    base_seed: u64,
}

impl TrialPlan<'_> {
    fn run(&self, trial: usize) -> Result<SimulationPath> {
        let n = self.betas.len();
        let mut rng = ChaCha8Rng::seed_from_u64(trial_seed(self.base_seed, trial));
        let mut independent = vec![0.0; n];
        let mut correlated = vec![0.0; n];
        let mut pnl = Vec::with_capacity(self.horizon);
        let mut factor_pnl = vec![0.0; n];

        for _ in 0..self.horizon {
            for z in independent.iter_mut() {
                *z = rng.sample(StandardNormal);
            }
            self.correlation.correlate(&independent, &mut correlated);

            let mut period_pnl = 0.0;
            for f in 0..n {
                let factor_return = self.means[f] + self.vols[f] * correlated[f];
                let contribution = self.betas[f] * factor_return;
                factor_pnl[f] += contribution;
                period_pnl += contribution;
            }
            pnl.push(period_pnl);
        }

        let path = SimulationPath::new(pnl, factor_pnl);
        if !path.is_finite() {
            return Err(StressError::instability(format!(
                "Trial {} produced non-finite PnL",
                trial
            )));
        }
        Ok(path)
    }
}

/// Seed for one trial, derived with a SplitMix64 finalizer
fn trial_seed(base_seed: u64, trial: usize) -> u64 {
    let mut z = base_seed.wrapping_add((trial as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Monte Carlo engine
#[derive(Debug, Clone)]
pub struct MonteCarloEngine {
    dynamics: FactorDynamics,
    parallel: bool,
}

impl Default for MonteCarloEngine {
    fn default() -> Self {
        Self::new(FactorDynamics::default())
    }
}

impl MonteCarloEngine {
    /// Create an engine that runs trials in parallel
    pub fn new(dynamics: FactorDynamics) -> Self {
        Self {
            dynamics,
            parallel: true,
        }
    }

    /// Toggle parallel trial execution (results are identical either way)
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn dynamics(&self) -> &FactorDynamics {
        &self.dynamics
    }

    /// Expected horizon PnL with a zero stress vector
    pub fn baseline_pnl(&self, exposures: &ExposureProfile, horizon: u32) -> f64 {
        let drift_pnl: f64 = exposures
            .factors()
            .iter()
            .zip(exposures.portfolio_betas())
            .map(|(f, beta)| beta * self.dynamics.drift(f))
            .sum();
        drift_pnl * horizon as f64
    }

    /// Simulate `trials` PnL paths over `horizon` periods
    ///
    /// With `seed = Some(_)` the output is bit-reproducible. Without a
    /// seed, a fresh base seed is drawn from OS entropy for this call.
    pub fn simulate(
        &self,
        stress: &StressVector,
        exposures: &ExposureProfile,
        trials: usize,
        horizon: u32,
        correlation: &CorrelationMatrix,
        seed: Option<u64>,
    ) -> Result<SimulatedDistribution> {
        if trials == 0 {
            return Err(StressError::validation("trials must be positive"));
        }

        if horizon == 0 {
            return Err(StressError::validation("horizon must be positive"));
        }

        exposures.validate()?;
        self.dynamics.validate()?;

        let factors = exposures.factors();
        if correlation.dim() != factors.len() {
            return Err(StressError::validation(format!(
                "Correlation matrix is {}x{}, exposure profile has {} factors",
                correlation.dim(),
                correlation.dim(),
                factors.len()
            )));
        }

        let shifts = stress.aligned_to(factors)?;
        let periods = horizon as f64;

        // PnL is linear in betas, so summing segments first is exact
        let plan = TrialPlan {
            betas: exposures.portfolio_betas(),
            means: factors
                .iter()
                .zip(&shifts)
                .map(|(f, s)| self.dynamics.drift(f) + s / periods)
                .collect(),
            vols: factors.iter().map(|f| self.dynamics.volatility(f)).collect(),
            correlation,
            horizon: horizon as usize,
            base_seed: seed.unwrap_or_else(|| ChaCha8Rng::from_entropy().gen()),
        };

        debug!(
            trials,
            horizon,
            factors = factors.len(),
            factorization = ?correlation.factorization(),
            parallel = self.parallel,
            seeded = seed.is_some(),
            "Starting Monte Carlo simulation"
        );

        let paths = if self.parallel {
            (0..trials)
                .into_par_iter()
                .map(|trial| plan.run(trial))
                .collect::<Result<Vec<_>>>()?
        } else {
            (0..trials)
                .map(|trial| plan.run(trial))
                .collect::<Result<Vec<_>>>()?
        };

        Ok(SimulatedDistribution {
            factors: factors.to_vec(),
            horizon: horizon as usize,
            paths,
            baseline_pnl: self.baseline_pnl(exposures, horizon),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exposure::{MockLinearModel, SensitivityModel};

    fn single_factor_profile(beta: f64) -> ExposureProfile {
        let mut segments = BTreeMap::new();
        segments.insert("book".to_string(), vec![beta]);
        ExposureProfile::new(vec!["equity".to_string()], segments).unwrap()
    }

    #[test]
    fn test_path_helpers() {
        let path = SimulationPath::new(vec![1.0, -3.0, 0.5], vec![-1.5]);
        assert_eq!(path.total(), -1.5);
        assert_eq!(path.cumulative(), vec![1.0, -2.0, -1.5]);
        assert_eq!(path.horizon(), 3);
    }

    #[test]
    fn test_shape_and_order() {
        let profile = MockLinearModel::new().sensitivities().unwrap();
        let corr = CorrelationMatrix::identity(profile.num_factors());
        let stress = StressVector::from_shifts([("equity", -0.2)]);

        let dist = MonteCarloEngine::default()
            .simulate(&stress, &profile, 50, 6, &corr, Some(7))
            .unwrap();

        assert_eq!(dist.trials(), 50);
        assert_eq!(dist.horizon(), 6);
        assert_eq!(dist.factors(), profile.factors());
        for path in dist.paths() {
            assert_eq!(path.pnl.len(), 6);
            assert_eq!(path.factor_pnl.len(), profile.num_factors());
            let by_factor: f64 = path.factor_pnl.iter().sum();
            assert!((by_factor - path.total()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let profile = MockLinearModel::new().sensitivities().unwrap();
        let corr = CorrelationMatrix::identity(profile.num_factors());
        let stress = StressVector::from_shifts([("gdp", -0.04), ("equity", -0.35)]);
        let engine = MonteCarloEngine::default();

        let first = engine.simulate(&stress, &profile, 200, 12, &corr, Some(42)).unwrap();
        let second = engine.simulate(&stress, &profile, 200, 12, &corr, Some(42)).unwrap();
        assert_eq!(first, second);

        let other = engine.simulate(&stress, &profile, 200, 12, &corr, Some(43)).unwrap();
        assert_ne!(first, other);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let profile = MockLinearModel::new().sensitivities().unwrap();
        let corr = CorrelationMatrix::identity(profile.num_factors());
        let stress = StressVector::from_shifts([("rates", 0.01)]);

        let parallel = MonteCarloEngine::default()
            .simulate(&stress, &profile, 300, 4, &corr, Some(11))
            .unwrap();
        let sequential = MonteCarloEngine::default()
            .with_parallel(false)
            .simulate(&stress, &profile, 300, 4, &corr, Some(11))
            .unwrap();

        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_trial_prefix_is_stable() {
        let profile = single_factor_profile(100.0);
        let corr = CorrelationMatrix::identity(1);
        let stress = StressVector::zero();
        let engine = MonteCarloEngine::new(FactorDynamics::uniform(0.05));

        let short = engine.simulate(&stress, &profile, 10, 3, &corr, Some(5)).unwrap();
        let long = engine.simulate(&stress, &profile, 20, 3, &corr, Some(5)).unwrap();
        assert_eq!(short.paths(), &long.paths()[..10]);
    }

    #[test]
    fn test_unseeded_runs_differ() {
        let profile = single_factor_profile(100.0);
        let corr = CorrelationMatrix::identity(1);
        let engine = MonteCarloEngine::default();

        let a = engine.simulate(&StressVector::zero(), &profile, 20, 3, &corr, None).unwrap();
        let b = engine.simulate(&StressVector::zero(), &profile, 20, 3, &corr, None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_zero_volatility_is_deterministic_drift() {
        let profile = single_factor_profile(200.0);
        let corr = CorrelationMatrix::identity(1);
        let engine = MonteCarloEngine::new(FactorDynamics::uniform(0.0));
        let stress = StressVector::from_shifts([("equity", -0.3)]);

        let dist = engine.simulate(&stress, &profile, 5, 10, &corr, None).unwrap();
        for path in dist.paths() {
            // -0.3 spread over 10 periods, times beta 200
            for p in &path.pnl {
                assert!((p + 6.0).abs() < 1e-9);
            }
            assert!((path.total() + 60.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_baseline_pnl_uses_drift() {
        let profile = single_factor_profile(50.0);
        let engine = MonteCarloEngine::new(FactorDynamics::uniform(0.0).with_drift("equity", 0.01));
        assert!((engine.baseline_pnl(&profile, 12) - 6.0).abs() < 1e-12);
        assert_eq!(MonteCarloEngine::default().baseline_pnl(&profile, 12), 0.0);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let profile = single_factor_profile(1.0);
        let corr = CorrelationMatrix::identity(1);
        let engine = MonteCarloEngine::default();
        let stress = StressVector::zero();

        let err = engine.simulate(&stress, &profile, 0, 12, &corr, Some(1)).unwrap_err();
        assert!(err.is_validation());

        let err = engine.simulate(&stress, &profile, 10, 0, &corr, Some(1)).unwrap_err();
        assert!(err.is_validation());

        let wrong_dim = CorrelationMatrix::identity(2);
        let err = engine.simulate(&stress, &profile, 10, 12, &wrong_dim, Some(1)).unwrap_err();
        assert!(err.is_validation());

        let outside = StressVector::from_shifts([("gdp", -0.01)]);
        let err = engine.simulate(&outside, &profile, 10, 12, &corr, Some(1)).unwrap_err();
        assert!(err.is_validation());

        let bad_vol = MonteCarloEngine::new(FactorDynamics::uniform(-0.1));
        assert!(bad_vol.simulate(&stress, &profile, 10, 12, &corr, Some(1)).is_err());
    }

    #[test]
    fn test_overflow_reported_as_instability() {
        let mut segments = BTreeMap::new();
        segments.insert("a".to_string(), vec![1.5e308]);
        segments.insert("b".to_string(), vec![1.5e308]);
        let profile = ExposureProfile::new(vec!["equity".to_string()], segments).unwrap();
        let corr = CorrelationMatrix::identity(1);
        let stress = StressVector::from_shifts([("equity", -0.5)]);

        let err = MonteCarloEngine::default()
            .simulate(&stress, &profile, 10, 2, &corr, Some(3))
            .unwrap_err();
        assert!(matches!(err, StressError::NumericInstability(_)));
    }

    #[test]
    fn test_trial_seeds_are_distinct() {
        let seeds: std::collections::HashSet<u64> = (0..1000).map(|i| trial_seed(42, i)).collect();
        assert_eq!(seeds.len(), 1000);
        assert_eq!(trial_seed(42, 3), trial_seed(42, 3));
    }
}
