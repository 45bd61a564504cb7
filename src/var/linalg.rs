//! Dense linear algebra for the VAR normal equations
//!
//! Cholesky factorisation with a relative pivot tolerance, so exactly or
//! nearly collinear regressors are reported instead of producing huge
//! coefficients.

use ndarray::{Array1, Array2};
use thiserror::Error;

/// Pivot tolerance relative to the largest diagonal entry
pub const PIVOT_TOLERANCE: f64 = 1e-10;

/// Errors from the factorisation routines
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LinalgError {
    #[error("Matrix is not positive definite (pivot {pivot})")]
    NotPositiveDefinite { pivot: usize },

    #[error("Matrix is not square: {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("Matrix contains non-finite values")]
    NonFinite,
}

/// Lower-triangular Cholesky factor L with A = L·Lᵀ
pub fn cholesky(a: &Array2<f64>) -> Result<Array2<f64>, LinalgError> {
    let (rows, cols) = a.dim();
    if rows != cols {
        return Err(LinalgError::NotSquare { rows, cols });
    }
    if a.iter().any(|v| !v.is_finite()) {
        return Err(LinalgError::NonFinite);
    }

    let n = rows;
    let scale = (0..n).map(|i| a[[i, i]].abs()).fold(0.0, f64::max);
    let tol = PIVOT_TOLERANCE * scale.max(f64::MIN_POSITIVE);
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= tol {
                    return Err(LinalgError::NotPositiveDefinite { pivot: i });
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    Ok(l)
}

/// Solve L·Lᵀ·x = b given the Cholesky factor L
pub fn cholesky_solve(l: &Array2<f64>, b: &Array1<f64>) -> Array1<f64> {
    let n = l.nrows();

    // Forward substitution: L·z = b
    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * z[j];
        }
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: Lᵀ·x = z
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (z[i] - sum) / l[[i, i]];
    }

    x
}

/// Solve A·X = B column by column for symmetric positive definite A
pub fn solve_spd(a: &Array2<f64>, b: &Array2<f64>) -> Result<Array2<f64>, LinalgError> {
    let l = cholesky(a)?;
    let mut x = Array2::<f64>::zeros((a.ncols(), b.ncols()));
    for (k, col) in b.columns().into_iter().enumerate() {
        let solved = cholesky_solve(&l, &col.to_owned());
        x.column_mut(k).assign(&solved);
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(LinalgError::NonFinite);
    }
    Ok(x)
}

/// ln det(A) for symmetric positive definite A
pub fn log_determinant_spd(a: &Array2<f64>) -> Result<f64, LinalgError> {
    let l = cholesky(a)?;
    Ok(2.0 * l.diag().iter().map(|d| d.ln()).sum::<f64>())
}
