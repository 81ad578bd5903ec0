//! Factor correlation structure
//!
//! Validates a correlation matrix (symmetric, unit diagonal, positive
//! semi-definite) and factors it as `C = B Bᵀ` so independent normals can be
//! turned into correlated factor shocks.

use crate::error::{Result, StressError};
use nalgebra::{DMatrix, DVector, SymmetricEigen};

/// Symmetry and unit-diagonal tolerance
const STRUCTURE_TOLERANCE: f64 = 1e-9;

/// Smallest eigenvalue accepted as non-negative
const PSD_TOLERANCE: f64 = 1e-10;

/// Smallest eigenvalue treated as strictly positive definite
const PD_THRESHOLD: f64 = 1e-12;

/// How the correlation matrix was factored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factorization {
    /// Lower-triangular Cholesky factor (positive definite)
    Cholesky,
    /// Eigenvector square root (semi-definite)
    Eigen,
}

/// Validated correlation matrix with its square-root factor
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    matrix: DMatrix<f64>,
    factor: DMatrix<f64>,
    factorization: Factorization,
}

impl CorrelationMatrix {
    /// Independence assumption across `n` factors
    pub fn identity(n: usize) -> Self {
        Self {
            matrix: DMatrix::identity(n, n),
            factor: DMatrix::identity(n, n),
            factorization: Factorization::Cholesky,
        }
    }

    /// Validate and factor a row-major correlation matrix
    ///
    /// # Example
    ///
    /// ```
    /// use ag_stress::CorrelationMatrix;
    ///
    /// let ok = CorrelationMatrix::new(vec![vec![1.0, 0.5], vec![0.5, 1.0]]);
    /// assert!(ok.is_ok());
    ///
    /// // Not positive semi-definite
    /// let bad = CorrelationMatrix::new(vec![
    ///     vec![1.0, 0.9, -0.9],
    ///     vec![0.9, 1.0, 0.9],
    ///     vec![-0.9, 0.9, 1.0],
    /// ]);
    /// assert!(bad.is_err());
    /// ```
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n = rows.len();
        if n == 0 {
            return Err(StressError::validation("Correlation matrix is empty"));
        }

        if rows.iter().any(|row| row.len() != n) {
            return Err(StressError::validation(format!(
                "Correlation matrix must be square ({} rows)",
                n
            )));
        }

        let matrix = DMatrix::from_fn(n, n, |i, j| rows[i][j]);
        Self::validate_structure(&matrix)?;

        let eigen = SymmetricEigen::new(matrix.clone());
        let min_eigenvalue = eigen.eigenvalues.min();
        if min_eigenvalue < -PSD_TOLERANCE {
            return Err(StressError::validation(format!(
                "Correlation matrix is not positive semi-definite (min eigenvalue {:.3e})",
                min_eigenvalue
            )));
        }

        let cholesky = if min_eigenvalue > PD_THRESHOLD {
            matrix.clone().cholesky()
        } else {
            None
        };

        let (factor, factorization) = match cholesky {
            Some(chol) => (chol.l(), Factorization::Cholesky),
            None => {
                let roots = DVector::from_iterator(
                    n,
                    eigen.eigenvalues.iter().map(|l| l.max(0.0).sqrt()),
                );
                (
                    &eigen.eigenvectors * DMatrix::from_diagonal(&roots),
                    Factorization::Eigen,
                )
            }
        };

        Ok(Self {
            matrix,
            factor,
            factorization,
        })
    }

    fn validate_structure(matrix: &DMatrix<f64>) -> Result<()> {
        let n = matrix.nrows();
        for i in 0..n {
            if (matrix[(i, i)] - 1.0).abs() > STRUCTURE_TOLERANCE {
                return Err(StressError::validation(format!(
                    "Correlation diagonal entry ({}, {}) is {}, expected 1",
                    i,
                    i,
                    matrix[(i, i)]
                )));
            }

            for j in 0..n {
                let value = matrix[(i, j)];
                if !value.is_finite() || value.abs() > 1.0 + STRUCTURE_TOLERANCE {
                    return Err(StressError::validation(format!(
                        "Correlation entry ({}, {}) = {} outside [-1, 1]",
                        i, j, value
                    )));
                }

                if (value - matrix[(j, i)]).abs() > STRUCTURE_TOLERANCE {
                    return Err(StressError::validation(format!(
                        "Correlation matrix is not symmetric at ({}, {})",
                        i, j
                    )));
                }
            }
        }
        Ok(())
    }

    /// Number of factors
    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix[(i, j)]
    }

    pub fn factorization(&self) -> Factorization {
        self.factorization
    }

    /// Square-root factor `B` with `B Bᵀ = C`
    pub fn factor(&self) -> &DMatrix<f64> {
        &self.factor
    }

    /// Map independent standard normals to correlated ones
    pub fn correlate(&self, independent: &[f64], out: &mut [f64]) {
        let n = self.dim();
        for (i, slot) in out.iter_mut().enumerate().take(n) {
            let mut sum = 0.0;
            for (j, z) in independent.iter().enumerate().take(n) {
                sum += self.factor[(i, j)] * z;
            }
            *slot = sum;
        }
    }

    /// Row-major copy of the matrix
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        (0..self.dim())
            .map(|i| (0..self.dim()).map(|j| self.matrix[(i, j)]).collect())
            .collect()
    }
}
