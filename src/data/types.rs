//! Core data types for market data
//!
//! - RawBar: one CSV row, fields may be missing
//! - PriceBar: a complete daily OHLC bar
//! - VolatilitySeries: per-market volatility aligned with its bar dates

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLC row as read from a price table, before gap filling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
}

impl RawBar {
    /// Check that every price field is present
    pub fn is_complete(&self) -> bool {
        self.open.is_some() && self.high.is_some() && self.low.is_some() && self.close.is_some()
    }

    /// Convert into a PriceBar if all fields are present
    pub fn to_bar(&self) -> Option<PriceBar> {
        Some(PriceBar {
            date: self.date,
            open: self.open?,
            high: self.high?,
            low: self.low?,
            close: self.close?,
        })
    }
}

impl From<PriceBar> for RawBar {
    fn from(bar: PriceBar) -> Self {
        Self {
            date: bar.date,
            open: Some(bar.open),
            high: Some(bar.high),
            low: Some(bar.low),
            close: Some(bar.close),
        }
    }
}

/// Daily OHLC price bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Trading date
    pub date: NaiveDate,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
        }
    }

    /// Positive prices with high above and low below both open and close.
    ///
    /// A relative slack of 1e-12 absorbs rounding in interpolated bars.
    pub fn is_consistent(&self) -> bool {
        const SLACK: f64 = 1e-12;
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite() && *p > 0.0)
            && self.high >= self.open.max(self.close) * (1.0 - SLACK)
            && self.low <= self.open.min(self.close) * (1.0 + SLACK)
    }

    /// ln(close / open)
    pub fn log_close_open(&self) -> f64 {
        (self.close / self.open).ln()
    }

    /// ln(high / open)
    pub fn log_high_open(&self) -> f64 {
        (self.high / self.open).ln()
    }

    /// ln(low / open)
    pub fn log_low_open(&self) -> f64 {
        (self.low / self.open).ln()
    }

    /// Overnight log return against the previous session's close
    pub fn log_overnight(&self, prev_close: f64) -> f64 {
        (self.open / prev_close).ln()
    }

    /// Multiply all four prices by the same factor
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            date: self.date,
            open: self.open * factor,
            high: self.high * factor,
            low: self.low * factor,
            close: self.close * factor,
        }
    }
}

/// Volatility values for one market, one entry per input bar date.
///
/// `None` marks an undefined value (insufficient rolling history).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilitySeries {
    pub market: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<Option<f64>>,
}

impl VolatilitySeries {
    pub fn new(market: impl Into<String>, dates: Vec<NaiveDate>, values: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(dates.len(), values.len());
        Self {
            market: market.into(),
            dates,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Iterate over (date, value) pairs that carry a defined value
    pub fn defined(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates
            .iter()
            .zip(self.values.iter())
            .filter_map(|(&d, v)| v.map(|x| (d, x)))
    }

    /// Number of undefined entries
    pub fn undefined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    /// Most recent defined value
    pub fn last_value(&self) -> Option<f64> {
        self.values.iter().rev().find_map(|v| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
    }

    #[test]
    fn test_raw_bar_conversion() {
        let raw = RawBar {
            date: date(2),
            open: Some(100.0),
            high: Some(105.0),
            low: None,
            close: Some(101.0),
        };
        assert!(!raw.is_complete());
        assert!(raw.to_bar().is_none());

        let bar = PriceBar::new(date(2), 100.0, 105.0, 95.0, 101.0);
        let raw: RawBar = bar.into();
        assert_eq!(raw.to_bar(), Some(bar));
    }

    #[test]
    fn test_consistency() {
        assert!(PriceBar::new(date(2), 100.0, 105.0, 95.0, 101.0).is_consistent());
        assert!(PriceBar::new(date(2), 50.0, 50.0, 50.0, 50.0).is_consistent());
        // High below the open
        assert!(!PriceBar::new(date(2), 100.0, 99.0, 95.0, 98.0).is_consistent());
        // Low above the close
        assert!(!PriceBar::new(date(2), 100.0, 105.0, 99.0, 98.0).is_consistent());
        assert!(!PriceBar::new(date(2), 0.0, 1.0, 0.0, 0.5).is_consistent());
        assert!(!PriceBar::new(date(2), f64::NAN, 1.0, 0.5, 0.5).is_consistent());
    }

    #[test]
    fn test_log_ratios() {
        let bar = PriceBar::new(date(3), 100.0, 110.0, 90.0, 100.0);
        assert!(bar.log_close_open().abs() < 1e-12);
        assert!((bar.log_high_open() - 1.1f64.ln()).abs() < 1e-12);
        assert!((bar.log_low_open() - 0.9f64.ln()).abs() < 1e-12);
        assert!((bar.log_overnight(100.0)).abs() < 1e-12);
    }

    #[test]
    fn test_volatility_series_defined() {
        let series = VolatilitySeries::new(
            "US",
            vec![date(2), date(3), date(6)],
            vec![None, Some(0.01), Some(0.02)],
        );
        assert_eq!(series.len(), 3);
        assert_eq!(series.undefined_count(), 1);
        assert_eq!(series.defined().count(), 2);
        assert_eq!(series.last_value(), Some(0.02));
    }
}
