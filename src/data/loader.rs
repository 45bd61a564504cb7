//! Data loading utilities
//!
//! Reads daily OHLC price tables from CSV files. Columns are matched by
//! header name, so Yahoo-style exports (`Date,Open,High,Low,Close,Adj Close,Volume`)
//! load as-is.

use super::interpolate::interpolate_bars;
use super::types::{PriceBar, RawBar};
use crate::error::{ConnectednessError, Result};
use chrono::NaiveDate;
use csv::{Reader, StringRecord};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

/// Date format of the price tables
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| ConnectednessError::InvalidParameter(format!("bad date '{}': {}", s, e)))
}

/// Column positions of the required fields
struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
}

impl Columns {
    fn from_headers(market: &str, headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| {
                    ConnectednessError::missing(market, format!("column '{}' not found", name))
                })
        };

        Ok(Self {
            date: find("Date")?,
            open: find("Open")?,
            high: find("High")?,
            low: find("Low")?,
            close: find("Close")?,
        })
    }
}

/// Parse a price cell; `null`, `NaN` and empty cells are missing
fn parse_price(cell: Option<&str>) -> Option<f64> {
    let cell = cell?.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("null") || cell.eq_ignore_ascii_case("nan") {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0)
}

/// Data loader for CSV price tables
pub struct DataLoader;

impl DataLoader {
    /// Read raw rows from any CSV source, sorted ascending by date.
    ///
    /// Duplicate dates keep the last row seen.
    pub fn read_raw<R: Read>(market: &str, source: R) -> Result<Vec<RawBar>> {
        let mut reader = Reader::from_reader(source);
        let columns = Columns::from_headers(market, reader.headers()?)?;

        let mut rows: BTreeMap<NaiveDate, RawBar> = BTreeMap::new();
        let mut duplicates = 0usize;

        for result in reader.records() {
            let record = result?;
            let date = match record.get(columns.date) {
                Some(d) => parse_date(d)?,
                None => continue,
            };

            let bar = RawBar {
                date,
                open: parse_price(record.get(columns.open)),
                high: parse_price(record.get(columns.high)),
                low: parse_price(record.get(columns.low)),
                close: parse_price(record.get(columns.close)),
            };

            if rows.insert(date, bar).is_some() {
                duplicates += 1;
            }
        }

        if duplicates > 0 {
            warn!(market, duplicates, "Duplicate dates in price table, keeping last");
        }

        Ok(rows.into_values().collect())
    }

    /// Load raw rows from a CSV file
    pub fn load_raw<P: AsRef<Path>>(market: &str, path: P) -> Result<Vec<RawBar>> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            ConnectednessError::missing(market, format!("cannot open {}: {}", path.display(), e))
        })?;
        Self::read_raw(market, file)
    }

    /// Load a market's price table and fill interior gaps.
    ///
    /// A missing file or an empty table is `MissingData`.
    pub fn load_bars<P: AsRef<Path>>(market: &str, path: P) -> Result<Vec<PriceBar>> {
        let raw = Self::load_raw(market, &path)?;
        let bars = interpolate_bars(market, &raw)?;

        info!(
            market,
            bars = bars.len(),
            path = %path.as_ref().display(),
            "Loaded price table"
        );

        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = "\
Date,Open,High,Low,Close,Adj Close,Volume
2020-01-03,101,103,100,102,102,1000
2020-01-02,100,102,99,101,101,1000
2020-01-06,null,null,null,null,null,null
2020-01-07,103,105,102,104,104,1000
";

    #[test]
    fn test_read_raw_sorts_and_marks_missing() {
        let rows = DataLoader::read_raw("US", SAMPLE.as_bytes()).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2020, 1, 2).unwrap());
        assert!(!rows[2].is_complete());
    }

    #[test]
    fn test_load_bars_interpolates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("us.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let bars = DataLoader::load_bars("US", &path).unwrap();
        assert_eq!(bars.len(), 4);
        assert!((bars[2].close - 103.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_file() {
        let err = DataLoader::load_bars("UK", "/nonexistent/uk.csv").unwrap_err();
        assert!(matches!(err, ConnectednessError::MissingData { .. }));
    }

    #[test]
    fn test_missing_column() {
        let csv = "Date,Open,High,Close\n2020-01-02,1,2,1\n";
        let err = DataLoader::read_raw("JP", csv.as_bytes()).unwrap_err();
        assert!(matches!(err, ConnectednessError::MissingData { .. }));
    }

    #[test]
    fn test_empty_table() {
        let csv = "Date,Open,High,Low,Close\n";
        let raw = DataLoader::read_raw("TW", csv.as_bytes()).unwrap();
        assert!(raw.is_empty());
        assert!(interpolate_bars("TW", &raw).is_err());
    }
}
