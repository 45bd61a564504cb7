//! Aligned volatility panel: dates × markets

use crate::error::{ConnectednessError, Result};
use chrono::NaiveDate;
use ndarray::{s, Array2, ArrayView1, ArrayView2};
use serde::Serialize;

/// Volatility matrix on a common date axis.
///
/// Rows are dates in ascending order, columns are markets in configured
/// order. Every cell holds a finite value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedPanel {
    dates: Vec<NaiveDate>,
    markets: Vec<String>,
    values: Array2<f64>,
}

impl AlignedPanel {
    /// Build a panel, checking shape, ordering and finiteness
    pub fn new(dates: Vec<NaiveDate>, markets: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if values.nrows() != dates.len() || values.ncols() != markets.len() {
            return Err(ConnectednessError::InvalidParameter(format!(
                "panel shape {:?} does not match {} dates x {} markets",
                values.dim(),
                dates.len(),
                markets.len()
            )));
        }
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConnectednessError::InvalidParameter(
                "panel dates must be strictly ascending".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ConnectednessError::unstable("panel construction"));
        }

        Ok(Self {
            dates,
            markets,
            values,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn n_markets(&self) -> usize {
        self.markets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn markets(&self) -> &[String] {
        &self.markets
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Column position of a market
    pub fn market_index(&self, market: &str) -> Option<usize> {
        self.markets.iter().position(|m| m == market)
    }

    /// Volatility column of one market
    pub fn column(&self, market: &str) -> Option<ArrayView1<'_, f64>> {
        self.market_index(market).map(|j| self.values.column(j))
    }

    /// `len` consecutive rows starting at `start`, or `None` past the last row
    pub fn rows(&self, start: usize, len: usize) -> Option<ArrayView2<'_, f64>> {
        let end = start.checked_add(len)?;
        (end <= self.n_rows()).then(|| self.values.slice(s![start..end, ..]))
    }

    /// Render the panel as a text table
    pub fn display(&self, max_rows: usize) -> String {
        let mut s = format!("{:<12}", "Date");
        for m in &self.markets {
            s.push_str(&format!("{:>12}", m));
        }
        s.push('\n');

        for (i, date) in self.dates.iter().enumerate().take(max_rows) {
            s.push_str(&format!("{:<12}", date.format("%Y-%m-%d")));
            for v in self.values.row(i) {
                s.push_str(&format!("{:>12.6}", v));
            }
            s.push('\n');
        }
        if self.n_rows() > max_rows {
            s.push_str(&format!("... {} more rows\n", self.n_rows() - max_rows));
        }

        s
    }
}
