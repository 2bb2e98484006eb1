//! Universe covariance matrix
//!
//! Built once from the full return panel with the unbiased (n-1) estimator.
//! Every portfolio lookup afterwards is a sub-matrix selection; returns are
//! never revisited inside the Monte Carlo loop.

use crate::error::{Result, RiskError};
use crate::returns::ReturnPanel;
use nalgebra::{DMatrix, DVector};
use tracing::info;

/// Tolerance for the symmetry check on caller-supplied matrices
const SYMMETRY_TOLERANCE: f64 = 1e-12;

/// Symmetric sample covariance matrix indexed by universe position
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceMatrix {
    matrix: DMatrix<f64>,
}

impl CovarianceMatrix {
    /// Sample covariance of every pair of return columns
    ///
    /// Entry (i, j) = Σ_t (r_ti - mean_i)(r_tj - mean_j) / (n - 1)
    pub fn from_returns(returns: &ReturnPanel) -> Result<Self> {
        let n = returns.num_periods();
        if n < 2 {
            return Err(RiskError::InsufficientData(format!(
                "Need at least 2 return observations for covariance, got {}",
                n
            )));
        }

        let mut centered = returns.returns().clone_owned();
        for mut column in centered.column_iter_mut() {
            let mean = column.mean();
            column.add_scalar_mut(-mean);
        }

        let raw = centered.tr_mul(&centered) / (n - 1) as f64;
        // Force exact symmetry; the product can differ in the last ulp.
        let matrix = (&raw + raw.transpose()) * 0.5;

        if let Some((index, _)) = matrix.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            let (i, j) = (index % matrix.nrows(), index / matrix.nrows());
            return Err(RiskError::NumericalInstability(format!(
                "Non-finite covariance between {} and {}",
                returns.symbols()[i],
                returns.symbols()[j]
            )));
        }

        info!(
            assets = matrix.nrows(),
            observations = n,
            "Built universe covariance matrix"
        );

        Ok(Self { matrix })
    }

    /// Wrap an existing covariance matrix after checking shape and symmetry
    pub fn from_matrix(matrix: DMatrix<f64>) -> Result<Self> {
        if !matrix.is_square() || matrix.nrows() == 0 {
            return Err(RiskError::InvalidParameter(format!(
                "Covariance matrix must be square and non-empty, got {}x{}",
                matrix.nrows(),
                matrix.ncols()
            )));
        }

        let n = matrix.nrows();
        for i in 0..n {
            for j in (i + 1)..n {
                if (matrix[(i, j)] - matrix[(j, i)]).abs() > SYMMETRY_TOLERANCE {
                    return Err(RiskError::InvalidParameter(format!(
                        "Covariance matrix is not symmetric at ({}, {})",
                        i, j
                    )));
                }
            }
        }

        if matrix.iter().any(|v| !v.is_finite()) {
            return Err(RiskError::NumericalInstability(
                "Covariance matrix contains non-finite entries".to_string(),
            ));
        }

        Ok(Self { matrix })
    }

    /// Number of assets
    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.matrix.get((i, j)).copied()
    }

    /// Return variance of asset `i`
    pub fn variance(&self, i: usize) -> Option<f64> {
        self.get(i, i)
    }

    /// Per-asset return volatility (square root of the diagonal)
    pub fn volatilities(&self) -> DVector<f64> {
        self.matrix.diagonal().map(|v| v.max(0.0).sqrt())
    }

    /// Rows and columns `indices`, in that order
    ///
    /// Callers guarantee every index is below `dim()`.
    pub fn submatrix(&self, indices: &[usize]) -> DMatrix<f64> {
        let k = indices.len();
        DMatrix::from_fn(k, k, |i, j| self.matrix[(indices[i], indices[j])])
    }
}
