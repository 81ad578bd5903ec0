//! Risk metric aggregation
//!
//! Reduces a [`SimulatedDistribution`] to a [`RiskReport`]:
//! - Expected Loss: `max(0, -mean(total PnL))`
//! - VaR: `max(0, -Q(1 - confidence))` where `Q` interpolates linearly
//!   between order statistics (`h = (n - 1) p`)
//! - Expected shortfall: mean loss of the trials at or below the VaR quantile
//! - Parametric VaR: normal approximation `-(μ + z σ)` of the same totals
//! - Stressed net impact: mean total PnL minus the unstressed baseline
//! - Factor contributions: share of the mean factor PnL magnitudes

use crate::engine::SimulatedDistribution;
use crate::error::{Result, StressError};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::collections::BTreeMap;
use tracing::warn;

/// How factor contributions were computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionBasis {
    /// |mean factor PnL| over the sum of magnitudes
    MeanImpact,
    /// Euler shares of total PnL variance, used when mean impact vanishes
    ///
    /// A factor that hedges the rest of the book has a negative share; the
    /// shares still sum to 1.
    Variance,
}

/// Risk metrics for one scenario evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// Mean loss magnitude (non-negative)
    pub expected_loss: f64,

    /// Loss at the confidence quantile (non-negative)
    pub value_at_risk: f64,

    /// Confidence level used for VaR and expected shortfall
    pub confidence: f64,

    /// Mean loss beyond the VaR quantile
    pub expected_shortfall: f64,

    /// VaR under a normal approximation of the simulated totals
    pub parametric_var: f64,

    /// Mean total PnL minus the unstressed baseline
    pub stressed_net_impact: f64,

    /// Mean horizon PnL across trials
    pub mean_total_pnl: f64,

    /// Expected horizon PnL with zero stress
    pub baseline_pnl: f64,

    /// Share of impact per factor, summing to 1 (non-negative under
    /// `MeanImpact`, signed under `Variance`)
    pub factor_contributions: BTreeMap<String, f64>,

    /// Basis of `factor_contributions`
    pub contribution_basis: ContributionBasis,

    /// Cumulative PnL of the first sampled trials
    pub pnl_paths: Vec<Vec<f64>>,

    /// Cumulative mean PnL per period
    pub mean_path: Vec<f64>,

    /// Number of trials aggregated
    pub trials: usize,

    /// Horizon in periods (months)
    pub horizon_months: usize,
}

impl RiskReport {
    /// Largest factor share
    pub fn dominant_factor(&self) -> Option<(&str, f64)> {
        self.factor_contributions
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, v)| (k.as_str(), *v))
    }

    /// Contribution share for a factor, zero if absent
    pub fn contribution(&self, factor: &str) -> f64 {
        self.factor_contributions.get(factor).copied().unwrap_or(0.0)
    }
}

/// Quantile of sorted data with linear interpolation between order statistics
///
/// `sorted` must be ascending.
///
/// # Panics
///
/// Panics if `sorted` is empty or `p` is outside [0, 1].
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    assert!(!sorted.is_empty(), "quantile of an empty sample");
    assert!((0.0..=1.0).contains(&p), "quantile level {} outside [0, 1]", p);

    let h = (sorted.len() - 1) as f64 * p;
    let lower = h.floor() as usize;
    let upper = (lower + 1).min(sorted.len() - 1);
    sorted[lower] + (h - lower as f64) * (sorted[upper] - sorted[lower])
}

/// Risk metric aggregator
#[derive(Debug, Clone)]
pub struct RiskAggregator {
    sample_paths: usize,
}

impl Default for RiskAggregator {
    fn default() -> Self {
        Self { sample_paths: 20 }
    }
}

impl RiskAggregator {
    /// Create an aggregator keeping `sample_paths` trials for visualization
    pub fn new(sample_paths: usize) -> Self {
        Self { sample_paths }
    }

    /// Aggregate a simulated distribution at `confidence`
    pub fn aggregate(&self, dist: &SimulatedDistribution, confidence: f64) -> Result<RiskReport> {
        if dist.is_empty() {
            return Err(StressError::validation("No simulation paths to aggregate"));
        }

        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(StressError::validation(format!(
                "Invalid confidence level: {} (must be between 0 and 1)",
                confidence
            )));
        }

        Self::validate_shape(dist)?;

        let totals = dist.totals();
        let n = totals.len() as f64;
        let mean_total_pnl = totals.iter().sum::<f64>() / n;

        let mut sorted = totals.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let tail_quantile = quantile_sorted(&sorted, 1.0 - confidence);

        let tail: Vec<f64> = sorted
            .iter()
            .copied()
            .take_while(|t| *t <= tail_quantile)
            .collect();
        let tail_mean = if tail.is_empty() {
            sorted[0]
        } else {
            tail.iter().sum::<f64>() / tail.len() as f64
        };

        let std_dev = if totals.len() > 1 {
            (totals
                .iter()
                .map(|t| (t - mean_total_pnl).powi(2))
                .sum::<f64>()
                / (n - 1.0))
                .sqrt()
        } else {
            0.0
        };

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| StressError::instability(e.to_string()))?;
        let z_score = normal.inverse_cdf(1.0 - confidence);

        let (factor_contributions, contribution_basis) =
            Self::factor_contributions(dist, &totals, mean_total_pnl)?;

        let report = RiskReport {
            expected_loss: (-mean_total_pnl).max(0.0),
            value_at_risk: (-tail_quantile).max(0.0),
            confidence,
            expected_shortfall: (-tail_mean).max(0.0),
            parametric_var: (-(mean_total_pnl + z_score * std_dev)).max(0.0),
            stressed_net_impact: mean_total_pnl - dist.baseline_pnl(),
            mean_total_pnl,
            baseline_pnl: dist.baseline_pnl(),
            factor_contributions,
            contribution_basis,
            pnl_paths: dist
                .paths()
                .iter()
                .take(self.sample_paths)
                .map(|p| p.cumulative())
                .collect(),
            mean_path: Self::mean_path(dist),
            trials: dist.trials(),
            horizon_months: dist.horizon(),
        };

        let scalars = [
            report.expected_loss,
            report.value_at_risk,
            report.expected_shortfall,
            report.parametric_var,
            report.stressed_net_impact,
        ];
        if scalars.iter().any(|v| !v.is_finite()) {
            return Err(StressError::instability(
                "Risk metrics are not finite".to_string(),
            ));
        }

        Ok(report)
    }

    fn validate_shape(dist: &SimulatedDistribution) -> Result<()> {
        if dist.factors().is_empty() {
            return Err(StressError::validation("Distribution has no factors"));
        }

        for (i, path) in dist.paths().iter().enumerate() {
            if path.pnl.len() != dist.horizon() || path.factor_pnl.len() != dist.factors().len() {
                return Err(StressError::validation(format!(
                    "Path {} has shape {}x{}, expected {}x{}",
                    i,
                    path.pnl.len(),
                    path.factor_pnl.len(),
                    dist.horizon(),
                    dist.factors().len()
                )));
            }
        }
        Ok(())
    }

    fn mean_path(dist: &SimulatedDistribution) -> Vec<f64> {
        let mut sums = vec![0.0; dist.horizon()];
        for path in dist.paths() {
            for (s, p) in sums.iter_mut().zip(&path.pnl) {
                *s += p;
            }
        }

        let n = dist.trials() as f64;
        sums.iter()
            .scan(0.0, |acc, s| {
                *acc += s / n;
                Some(*acc)
            })
            .collect()
    }

    fn factor_contributions(
        dist: &SimulatedDistribution,
        totals: &[f64],
        mean_total: f64,
    ) -> Result<(BTreeMap<String, f64>, ContributionBasis)> {
        let n = dist.trials() as f64;
        let k = dist.factors().len();

        let mut factor_means = vec![0.0; k];
        for path in dist.paths() {
            for (m, v) in factor_means.iter_mut().zip(&path.factor_pnl) {
                *m += v / n;
            }
        }

        let total_impact: f64 = factor_means.iter().map(|m| m.abs()).sum();
        if total_impact.is_finite() && total_impact > 0.0 {
            let shares = dist
                .factors()
                .iter()
                .zip(&factor_means)
                .map(|(f, m)| (f.clone(), m.abs() / total_impact))
                .collect();
            return Ok((shares, ContributionBasis::MeanImpact));
        }

        // Euler decomposition: sum_f cov(X_f, T) = var(T) since T = sum_f X_f
        let mut covariances = vec![0.0; k];
        let mut variance = 0.0;
        for (path, total) in dist.paths().iter().zip(totals) {
            let dt = total - mean_total;
            variance += dt * dt;
            for ((c, v), m) in covariances.iter_mut().zip(&path.factor_pnl).zip(&factor_means) {
                *c += (v - m) * dt;
            }
        }

        if !(variance.is_finite() && variance > 0.0) {
            return Err(StressError::instability(
                "Portfolio PnL has neither mean impact nor variance to attribute",
            ));
        }

        warn!("Mean factor impact vanished; attributing contributions by variance");
        let shares = dist
            .factors()
            .iter()
            .zip(&covariances)
            .map(|(f, c)| (f.clone(), c / variance))
            .collect();
        Ok((shares, ContributionBasis::Variance))
    }
}
