//! Calendar alignment of per-market volatility series
//!
//! Every calendar day in [start, end] forms the base axis; a day survives
//! only if every market has a defined volatility on it. The result is the
//! same as one set intersection across markets, so market order never
//! changes which dates are kept.

use super::panel::AlignedPanel;
use crate::data::VolatilitySeries;
use crate::error::{ConnectednessError, Result};
use chrono::{Duration, NaiveDate};
use ndarray::Array2;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Every calendar date in [start, end], inclusive
pub fn calendar_axis(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let days = (end - start).num_days();
    (0..=days.max(-1)).map(|n| start + Duration::days(n)).collect()
}

/// Aligns volatility series onto a common daily axis
#[derive(Debug, Clone, Copy)]
pub struct CalendarAligner {
    start: NaiveDate,
    end: NaiveDate,
}

impl CalendarAligner {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ConnectednessError::InvalidParameter(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inner-join all series on date within [start, end].
    ///
    /// Fails with `AlignmentEmpty` when no date is shared by every market.
    pub fn align(&self, series: &[VolatilitySeries]) -> Result<AlignedPanel> {
        if series.is_empty() {
            return Err(ConnectednessError::InvalidParameter(
                "at least one market is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for s in series {
            if !seen.insert(s.market.as_str()) {
                return Err(ConnectednessError::InvalidParameter(format!(
                    "duplicate market name: {}",
                    s.market
                )));
            }
        }

        let lookups: Vec<HashMap<NaiveDate, f64>> = series
            .iter()
            .map(|s| {
                let map: HashMap<NaiveDate, f64> = s
                    .defined()
                    .filter(|(d, v)| *d >= self.start && *d <= self.end && v.is_finite())
                    .collect();
                debug!(market = %s.market, in_range = map.len(), "Volatility dates in range");
                map
            })
            .collect();

        let dates: Vec<NaiveDate> = calendar_axis(self.start, self.end)
            .into_iter()
            .filter(|d| lookups.iter().all(|m| m.contains_key(d)))
            .collect();

        if dates.is_empty() {
            return Err(ConnectednessError::AlignmentEmpty {
                start: self.start,
                end: self.end,
            });
        }

        let mut values = Array2::<f64>::zeros((dates.len(), series.len()));
        for (j, lookup) in lookups.iter().enumerate() {
            for (i, d) in dates.iter().enumerate() {
                values[[i, j]] = lookup[d];
            }
        }

        let markets = series.iter().map(|s| s.market.clone()).collect();
        let panel = AlignedPanel::new(dates, markets, values)?;

        info!(
            rows = panel.n_rows(),
            markets = panel.n_markets(),
            first = ?panel.first_date(),
            last = ?panel.last_date(),
            "Aligned volatility panel"
        );

        Ok(panel)
    }
}
