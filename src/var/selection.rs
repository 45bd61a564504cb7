//! Lag order selection by information criterion

use super::model::VarModel;
use crate::error::{ConnectednessError, Result};
use ndarray::{s, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Information criterion used to rank candidate lag orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InformationCriterion {
    #[default]
    Aic,
    Bic,
}

impl std::fmt::Display for InformationCriterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aic => write!(f, "AIC"),
            Self::Bic => write!(f, "BIC"),
        }
    }
}

impl std::str::FromStr for InformationCriterion {
    type Err = ConnectednessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "aic" => Ok(Self::Aic),
            "bic" => Ok(Self::Bic),
            other => Err(ConnectednessError::InvalidParameter(format!(
                "unknown information criterion '{}'",
                other
            ))),
        }
    }
}

/// Criteria of one candidate lag order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LagScore {
    pub lag_order: usize,
    pub aic: f64,
    pub bic: f64,
}

impl LagScore {
    pub fn value(&self, criterion: InformationCriterion) -> f64 {
        match criterion {
            InformationCriterion::Aic => self.aic,
            InformationCriterion::Bic => self.bic,
        }
    }
}

/// Outcome of a lag search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LagSelectionResult {
    pub criterion: InformationCriterion,
    pub selected: usize,
    /// Scores of every lag order that could be fitted, ascending by lag
    pub scores: Vec<LagScore>,
}

/// Choose the VAR lag order in 1..=`max_lag` minimising `criterion`.
///
/// Every candidate is fitted on the same effective sample (the rows after
/// the first `max_lag`), so the criteria are comparable. Lags whose fit is
/// degenerate are skipped; if none can be fitted the last error is returned.
pub fn select_lag_order(
    data: ArrayView2<f64>,
    max_lag: usize,
    criterion: InformationCriterion,
) -> Result<LagSelectionResult> {
    if max_lag == 0 {
        return Err(ConnectednessError::InvalidParameter(
            "max lag must be at least 1".to_string(),
        ));
    }
    if data.nrows() <= max_lag {
        return Err(ConnectednessError::InsufficientWindow {
            reason: format!("{} rows cannot support {} lags", data.nrows(), max_lag),
        });
    }

    let mut scores = Vec::with_capacity(max_lag);
    let mut last_error = None;

    for p in 1..=max_lag {
        let sample = data.slice(s![max_lag - p.., ..]);
        match VarModel::new(p)?.fit(sample) {
            Ok(fit) => {
                debug!(lag = p, aic = fit.aic, bic = fit.bic, "Lag candidate");
                scores.push(LagScore {
                    lag_order: p,
                    aic: fit.aic,
                    bic: fit.bic,
                });
            }
            Err(e) if e.is_per_window() => {
                warn!(lag = p, error = %e, "Skipping lag order");
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    let best = scores
        .iter()
        .filter(|s| s.value(criterion).is_finite())
        .min_by(|a, b| a.value(criterion).total_cmp(&b.value(criterion)))
        .map(|s| s.lag_order);

    match best {
        Some(selected) => {
            info!(selected, %criterion, candidates = scores.len(), "Lag order selected");
            Ok(LagSelectionResult {
                criterion,
                selected,
                scores,
            })
        }
        None => Err(last_error.unwrap_or_else(|| {
            ConnectednessError::degenerate("no lag order produced a finite criterion")
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::simulate_var;
    use ndarray::array;

    #[test]
    fn test_selects_true_order() {
        let c = array![0.0, 0.0];
        let a1 = array![[0.3, 0.1], [0.0, 0.2]];
        let a2 = array![[0.4, 0.0], [0.1, 0.4]];
        let data = simulate_var(&c, &[a1, a2], 1.0, 3000, 200, 11);

        let result = select_lag_order(data.view(), 5, InformationCriterion::Bic).unwrap();
        assert_eq!(result.selected, 2);
        assert_eq!(result.scores.len(), 5);
        assert_eq!(result.criterion, InformationCriterion::Bic);
    }

    #[test]
    fn test_white_noise_picks_one() {
        let data = simulate_var(&array![0.0, 0.0, 0.0], &[ndarray::Array2::zeros((3, 3))], 1.0, 2000, 10, 3);
        let result = select_lag_order(data.view(), 4, InformationCriterion::Bic).unwrap();
        assert_eq!(result.selected, 1);
    }

    #[test]
    fn test_degenerate_lags_skipped() {
        // 12 rows, 2 markets: lag 4 leaves 8 obs for 9 regressors
        let data = simulate_var(&array![0.0, 0.0], &[ndarray::Array2::eye(2) * 0.5], 1.0, 12, 10, 5);
        let result = select_lag_order(data.view(), 4, InformationCriterion::Aic).unwrap();
        assert!(result.scores.iter().all(|s| s.lag_order < 4));
        assert!(result.selected < 4);
    }

    #[test]
    fn test_invalid_arguments() {
        let data = simulate_var(&array![0.0], &[array![[0.5]]], 1.0, 3, 0, 1);
        assert!(select_lag_order(data.view(), 0, InformationCriterion::Aic).is_err());
        assert!(matches!(
            select_lag_order(data.view(), 3, InformationCriterion::Aic),
            Err(ConnectednessError::InsufficientWindow { .. })
        ));
    }

    #[test]
    fn test_criterion_parsing() {
        assert_eq!("AIC".parse::<InformationCriterion>().unwrap(), InformationCriterion::Aic);
        assert_eq!("bic".parse::<InformationCriterion>().unwrap(), InformationCriterion::Bic);
        assert!("hqic".parse::<InformationCriterion>().is_err());
        let json = serde_json::to_string(&InformationCriterion::Bic).unwrap();
        assert_eq!(json, "\"bic\"");
    }
}
