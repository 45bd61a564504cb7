//! Generalized forecast-error variance decomposition
//!
//! θ_ij(H) = σ_jj⁻¹ Σ_{h<H} (e_i' Ψ_h Σ e_j)² / Σ_{h<H} (e_i' Ψ_h Σ Ψ_h' e_i)
//!
//! where Ψ_h are the moving-average coefficients of the VAR. The shares do
//! not depend on the ordering of the markets, and each row is normalized
//! to sum to one afterwards.

use super::table::ConnectednessTable;
use crate::error::{ConnectednessError, Result};
use crate::var::CoefficientSet;
use ndarray::Array2;
use tracing::trace;

/// Default forecast horizon in days
pub const DEFAULT_HORIZON: usize = 10;

/// Moving-average matrices Ψ_0..Ψ_{horizon-1}.
///
/// Ψ_0 = I and Ψ_s = Σ_{l=1..min(s,p)} A_l Ψ_{s-l}.
pub fn ma_coefficients(coefficients: &CoefficientSet, horizon: usize) -> Vec<Array2<f64>> {
    let n = coefficients.n_markets();
    let lags = coefficients.matrices();
    let mut psi: Vec<Array2<f64>> = Vec::with_capacity(horizon);

    for s in 0..horizon {
        if s == 0 {
            psi.push(Array2::eye(n));
            continue;
        }
        let mut next = Array2::<f64>::zeros((n, n));
        for (l, a) in lags.iter().enumerate().take(s) {
            next = next + a.dot(&psi[s - l - 1]);
        }
        psi.push(next);
    }

    psi
}

/// Computes connectedness tables from fitted VAR models
#[derive(Debug, Clone, Copy)]
pub struct ConnectednessDecomposer {
    horizon: usize,
}

impl Default for ConnectednessDecomposer {
    fn default() -> Self {
        Self {
            horizon: DEFAULT_HORIZON,
        }
    }
}

impl ConnectednessDecomposer {
    pub fn new(horizon: usize) -> Result<Self> {
        if horizon == 0 {
            return Err(ConnectednessError::InvalidParameter(
                "forecast horizon must be at least 1".to_string(),
            ));
        }
        Ok(Self { horizon })
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Unnormalized generalized shares θ_ij
    pub fn raw_shares(&self, coefficients: &CoefficientSet, sigma: &Array2<f64>) -> Result<Array2<f64>> {
        let n = coefficients.n_markets();
        if sigma.dim() != (n, n) {
            return Err(ConnectednessError::InvalidParameter(format!(
                "residual covariance is {:?} for {} markets",
                sigma.dim(),
                n
            )));
        }
        if sigma.iter().any(|v| !v.is_finite()) {
            return Err(ConnectednessError::unstable("residual covariance"));
        }
        for j in 0..n {
            if sigma[[j, j]] <= 0.0 {
                return Err(ConnectednessError::unstable(format!(
                    "variance decomposition (market {} has zero residual variance)",
                    j
                )));
            }
        }

        let psi = ma_coefficients(coefficients, self.horizon);
        let mut numerator = Array2::<f64>::zeros((n, n));
        let mut denominator = vec![0.0; n];

        for p in &psi {
            let p_sigma = p.dot(sigma);
            numerator = numerator + p_sigma.mapv(|v| v * v);
            let fev = p_sigma.dot(&p.t());
            for (i, d) in denominator.iter_mut().enumerate() {
                *d += fev[[i, i]];
            }
        }

        let mut theta = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            if !(denominator[i].is_finite() && denominator[i] > 0.0) {
                return Err(ConnectednessError::unstable("forecast-error variance"));
            }
            for j in 0..n {
                theta[[i, j]] = numerator[[i, j]] / (sigma[[j, j]] * denominator[i]);
            }
        }

        if theta.iter().any(|v| !v.is_finite()) {
            return Err(ConnectednessError::unstable("variance decomposition"));
        }
        Ok(theta)
    }

    /// Row-normalized connectedness table for one fitted model
    pub fn decompose(
        &self,
        coefficients: &CoefficientSet,
        sigma: &Array2<f64>,
        markets: &[String],
    ) -> Result<ConnectednessTable> {
        if markets.len() != coefficients.n_markets() {
            return Err(ConnectednessError::InvalidParameter(format!(
                "{} market names for a {}-market model",
                markets.len(),
                coefficients.n_markets()
            )));
        }

        let mut theta = self.raw_shares(coefficients, sigma)?;
        for mut row in theta.rows_mut() {
            let sum = row.sum();
            if !(sum.is_finite() && sum > 0.0) {
                return Err(ConnectednessError::unstable("row normalization"));
            }
            row /= sum;
        }
        trace!(horizon = self.horizon, "Decomposition complete");

        ConnectednessTable::from_shares(markets.to_vec(), theta, self.horizon)
    }
}
