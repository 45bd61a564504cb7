//! Vector autoregression estimated by ordinary least squares
//!
//! y_t = c + A_1·y_{t-1} + ... + A_p·y_{t-p} + e_t
//!
//! All equations share the design matrix [1, y_{t-1}', ..., y_{t-p}'], so
//! the whole system is solved from one set of normal equations.

use super::linalg::{log_determinant_spd, solve_spd, LinalgError};
use crate::error::{ConnectednessError, Result};
use ndarray::{s, Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Autoregressive coefficients of one fitted VAR(p)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientSet {
    /// A_1..A_p; entry [i, j] of A_l is the effect of market j at lag l on market i
    lags: Vec<Array2<f64>>,
    /// Constant term per equation
    intercept: Array1<f64>,
}

impl CoefficientSet {
    pub fn new(lags: Vec<Array2<f64>>, intercept: Array1<f64>) -> Result<Self> {
        let n = intercept.len();
        if lags.is_empty() {
            return Err(ConnectednessError::InvalidParameter(
                "a coefficient set needs at least one lag".to_string(),
            ));
        }
        if lags.iter().any(|a| a.dim() != (n, n)) {
            return Err(ConnectednessError::InvalidParameter(format!(
                "every lag matrix must be {}x{}",
                n, n
            )));
        }
        Ok(Self { lags, intercept })
    }

    /// Coefficient set without a constant term
    pub fn without_intercept(lags: Vec<Array2<f64>>) -> Result<Self> {
        let n = lags.first().map(|a| a.nrows()).unwrap_or(0);
        Self::new(lags, Array1::zeros(n))
    }

    pub fn lag_order(&self) -> usize {
        self.lags.len()
    }

    pub fn n_markets(&self) -> usize {
        self.intercept.len()
    }

    /// Coefficient matrix of lag `l` (1-based)
    pub fn lag(&self, l: usize) -> Option<&Array2<f64>> {
        l.checked_sub(1).and_then(|i| self.lags.get(i))
    }

    pub fn matrices(&self) -> &[Array2<f64>] {
        &self.lags
    }

    pub fn intercept(&self) -> &Array1<f64> {
        &self.intercept
    }
}

/// Result of one VAR fit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarFit {
    pub coefficients: CoefficientSet,
    /// Residual covariance, degrees-of-freedom adjusted
    pub sigma: Array2<f64>,
    /// In-sample R² per equation
    pub r_squared: Array1<f64>,
    /// Effective observations (window rows minus lag order)
    pub n_obs: usize,
    /// Residual degrees of freedom per equation
    pub dof: usize,
    pub aic: f64,
    pub bic: f64,
}

impl VarFit {
    /// Mean R² across equations
    pub fn mean_r_squared(&self) -> f64 {
        self.r_squared.mean().unwrap_or(0.0)
    }
}

/// VAR(p) estimator
#[derive(Debug, Clone, Copy)]
pub struct VarModel {
    lag_order: usize,
}

impl VarModel {
    pub fn new(lag_order: usize) -> Result<Self> {
        if lag_order == 0 {
            return Err(ConnectednessError::InvalidParameter(
                "lag order must be at least 1".to_string(),
            ));
        }
        Ok(Self { lag_order })
    }

    pub fn lag_order(&self) -> usize {
        self.lag_order
    }

    /// Number of regressors per equation (constant + N·p lags)
    pub fn n_regressors(&self, n_markets: usize) -> usize {
        1 + n_markets * self.lag_order
    }

    /// Design matrix [1, y_{t-1}', ..., y_{t-p}'] and response y_t
    fn design(&self, data: &ArrayView2<f64>) -> (Array2<f64>, Array2<f64>) {
        let p = self.lag_order;
        let (rows, n) = data.dim();
        let t_eff = rows - p;

        let mut x = Array2::<f64>::zeros((t_eff, self.n_regressors(n)));
        x.column_mut(0).fill(1.0);
        for l in 1..=p {
            let lagged = data.slice(s![p - l..rows - l, ..]);
            x.slice_mut(s![.., 1 + (l - 1) * n..1 + l * n]).assign(&lagged);
        }
        let y = data.slice(s![p.., ..]).to_owned();

        (x, y)
    }

    /// Fit the VAR on consecutive rows of a date × market matrix.
    ///
    /// Too few observations or collinear regressors give `DegenerateFit`;
    /// non-finite estimates give `NumericInstability`.
    pub fn fit(&self, data: ArrayView2<f64>) -> Result<VarFit> {
        let p = self.lag_order;
        let (rows, n) = data.dim();
        if n == 0 {
            return Err(ConnectednessError::InvalidParameter(
                "panel has no markets".to_string(),
            ));
        }

        let k = self.n_regressors(n);
        if rows <= p || rows - p <= k {
            return Err(ConnectednessError::degenerate(format!(
                "{} rows leave {} observations for {} regressors per equation",
                rows,
                rows.saturating_sub(p),
                k
            )));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(ConnectednessError::unstable("VAR input"));
        }

        let (x, y) = self.design(&data);
        let t_eff = x.nrows();

        let xtx = x.t().dot(&x);
        let xty = x.t().dot(&y);
        let beta = solve_spd(&xtx, &xty).map_err(|e| match e {
            LinalgError::NotPositiveDefinite { pivot } => ConnectednessError::degenerate(format!(
                "design matrix is rank deficient at regressor {}",
                pivot
            )),
            _ => ConnectednessError::unstable("VAR normal equations"),
        })?;

        let residuals = &y - &x.dot(&beta);
        let sse = residuals.t().dot(&residuals);
        let dof = t_eff - k;
        let sigma = &sse / dof as f64;
        if sigma.iter().any(|v| !v.is_finite()) {
            return Err(ConnectednessError::unstable("residual covariance"));
        }

        let intercept = beta.row(0).to_owned();
        let lags: Vec<Array2<f64>> = (1..=p)
            .map(|l| beta.slice(s![1 + (l - 1) * n..1 + l * n, ..]).t().to_owned())
            .collect();

        let y_mean = y.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(n));
        let r_squared = Array1::from_iter((0..n).map(|i| {
            let sst: f64 = y.column(i).iter().map(|v| (v - y_mean[i]).powi(2)).sum();
            let ssr = sse[[i, i]];
            if sst > 0.0 {
                1.0 - ssr / sst
            } else {
                0.0
            }
        }));

        // Information criteria use the ML covariance
        let sigma_ml = &sse / t_eff as f64;
        let log_det = log_determinant_spd(&sigma_ml)
            .map_err(|_| ConnectednessError::unstable("residual covariance determinant"))?;
        let n_params = (k * n) as f64;
        let t = t_eff as f64;
        let aic = log_det + 2.0 * n_params / t;
        let bic = log_det + t.ln() * n_params / t;

        Ok(VarFit {
            coefficients: CoefficientSet::new(lags, intercept)?,
            sigma,
            r_squared,
            n_obs: t_eff,
            dof,
            aic,
            bic,
        })
    }
}
