//! Connectedness table and derived spillover measures

use crate::error::{ConnectednessError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Tolerance for the row-sum invariant
pub const ROW_SUM_TOLERANCE: f64 = 1e-9;

/// Normalized variance-decomposition table for one fitted model
///
/// Row i, column j is the share of market i's forecast-error variance due to
/// shocks in market j. Rows sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectednessTable {
    markets: Vec<String>,
    horizon: usize,
    shares: Array2<f64>,
    /// Diagonal shares
    pub own: Array1<f64>,
    /// Off-diagonal row sums: spillover received by each market
    pub from_others: Array1<f64>,
    /// Off-diagonal column sums: spillover transmitted by each market
    pub to_others: Array1<f64>,
    /// to − from
    pub net: Array1<f64>,
    /// Sum of off-diagonal shares divided by N, in [0, 1]
    pub total: f64,
}

impl ConnectednessTable {
    /// Build the table and its aggregates from row-normalized shares
    pub fn from_shares(markets: Vec<String>, shares: Array2<f64>, horizon: usize) -> Result<Self> {
        let n = markets.len();
        if shares.dim() != (n, n) {
            return Err(ConnectednessError::InvalidParameter(format!(
                "share matrix is {:?} but there are {} markets",
                shares.dim(),
                n
            )));
        }
        if n == 0 {
            return Err(ConnectednessError::InvalidParameter(
                "connectedness table needs at least one market".to_string(),
            ));
        }
        if shares.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(ConnectednessError::unstable("connectedness shares"));
        }
        for (i, row) in shares.rows().into_iter().enumerate() {
            let sum = row.sum();
            if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(ConnectednessError::InvalidParameter(format!(
                    "row {} of the share matrix sums to {}",
                    i, sum
                )));
            }
        }

        let own = shares.diag().to_owned();
        let from_others = shares.sum_axis(Axis(1)) - &own;
        let to_others = shares.sum_axis(Axis(0)) - &own;
        let net = &to_others - &from_others;
        let total = from_others.sum() / n as f64;

        Ok(Self {
            markets,
            horizon,
            shares,
            own,
            from_others,
            to_others,
            net,
            total,
        })
    }

    pub fn markets(&self) -> &[String] {
        &self.markets
    }

    pub fn n_markets(&self) -> usize {
        self.markets.len()
    }

    /// Forecast horizon the table was computed at
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn shares(&self) -> &Array2<f64> {
        &self.shares
    }

    /// Share of `to`'s forecast-error variance due to shocks in `from`
    pub fn share(&self, to: &str, from: &str) -> Option<f64> {
        let i = self.markets.iter().position(|m| m == to)?;
        let j = self.markets.iter().position(|m| m == from)?;
        Some(self.shares[[i, j]])
    }

    /// Pairwise net spillover: entry [i, j] is what i sends to j minus what it receives
    pub fn pairwise_net(&self) -> Array2<f64> {
        &self.shares.t() - &self.shares
    }

    /// Spillover transmitted by each market including its own share
    pub fn to_including_own(&self) -> Array1<f64> {
        &self.to_others + &self.own
    }

    pub fn total_percent(&self) -> f64 {
        self.total * 100.0
    }

    /// Percentage table in the usual spillover-table layout
    pub fn summary(&self) -> String {
        let width = self
            .markets
            .iter()
            .map(|m| m.len())
            .max()
            .unwrap_or(0)
            .max(8)
            + 2;

        let mut out = String::new();
        out.push_str(&format!("{:<width$}", "", width = width));
        for m in &self.markets {
            out.push_str(&format!("{:>width$}", m, width = width));
        }
        out.push_str(&format!("{:>width$}\n", "From", width = width));

        for (i, m) in self.markets.iter().enumerate() {
            out.push_str(&format!("{:<width$}", m, width = width));
            for j in 0..self.n_markets() {
                out.push_str(&format!("{:>width$.1}", self.shares[[i, j]] * 100.0, width = width));
            }
            out.push_str(&format!("{:>width$.1}\n", self.from_others[i] * 100.0, width = width));
        }

        let rows: [(&str, &Array1<f64>); 3] = [
            ("To", &self.to_others),
            ("Incl. own", &self.to_including_own()),
            ("Net", &self.net),
        ];
        for (label, values) in rows {
            out.push_str(&format!("{:<width$}", label, width = width));
            for v in values.iter() {
                out.push_str(&format!("{:>width$.1}", v * 100.0, width = width));
            }
            if label == "To" {
                out.push_str(&format!("{:>width$.1}", self.total_percent(), width = width));
            }
            out.push('\n');
        }

        out
    }
}
