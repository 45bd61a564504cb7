//! Gap filling for price tables
//!
//! Missing OHLC fields are filled by linear interpolation on row position,
//! only between two observed values. Bars that are still incomplete at the
//! edges of the table are dropped, as are bars whose prices contradict each
//! other (high below open or close, low above them, non-positive prices).

use super::types::{PriceBar, RawBar};
use crate::error::{ConnectednessError, Result};
use tracing::{debug, warn};

/// Fill interior gaps in a single column, leaving edge gaps as `None`.
///
/// Returns the number of filled entries.
pub fn interpolate_column(values: &mut [Option<f64>]) -> usize {
    let mut filled = 0;
    let mut last_seen: Option<usize> = None;

    for i in 0..values.len() {
        if values[i].is_none() {
            continue;
        }
        if let Some(prev) = last_seen {
            let gap = i - prev;
            if gap > 1 {
                let (a, b) = (values[prev].unwrap_or_default(), values[i].unwrap_or_default());
                for k in 1..gap {
                    let t = k as f64 / gap as f64;
                    values[prev + k] = Some(a + (b - a) * t);
                    filled += 1;
                }
            }
        }
        last_seen = Some(i);
    }

    filled
}

/// Turn raw rows into complete bars.
///
/// Fails with `MissingData` when no complete bar survives.
pub fn interpolate_bars(market: &str, raw: &[RawBar]) -> Result<Vec<PriceBar>> {
    if raw.is_empty() {
        return Err(ConnectednessError::missing(market, "price table is empty"));
    }

    let mut open: Vec<Option<f64>> = raw.iter().map(|r| r.open).collect();
    let mut high: Vec<Option<f64>> = raw.iter().map(|r| r.high).collect();
    let mut low: Vec<Option<f64>> = raw.iter().map(|r| r.low).collect();
    let mut close: Vec<Option<f64>> = raw.iter().map(|r| r.close).collect();

    let filled = interpolate_column(&mut open)
        + interpolate_column(&mut high)
        + interpolate_column(&mut low)
        + interpolate_column(&mut close);

    let bars: Vec<PriceBar> = raw
        .iter()
        .enumerate()
        .filter_map(|(i, r)| {
            Some(PriceBar {
                date: r.date,
                open: open[i]?,
                high: high[i]?,
                low: low[i]?,
                close: close[i]?,
            })
        })
        .collect();

    let complete = bars.len();
    let bars: Vec<PriceBar> = bars.into_iter().filter(PriceBar::is_consistent).collect();
    let inconsistent = complete - bars.len();
    if inconsistent > 0 {
        warn!(market, inconsistent, "Dropping bars with inconsistent OHLC prices");
    }

    let dropped = raw.len() - complete;
    if filled > 0 || dropped > 0 {
        debug!(market, filled, dropped, "Interpolated price gaps");
    }

    if bars.is_empty() {
        return Err(ConnectednessError::missing(
            market,
            "no complete and consistent OHLC bar after gap filling",
        ));
    }

    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate};

    fn raw(d: u32, close: Option<f64>) -> RawBar {
        RawBar {
            date: NaiveDate::from_ymd_opt(2021, 3, d).unwrap(),
            open: Some(10.0),
            high: Some(12.0),
            low: Some(9.0),
            close,
        }
    }

    #[test]
    fn test_interior_gap_is_linear() {
        let mut col = vec![Some(1.0), None, None, Some(4.0)];
        assert_eq!(interpolate_column(&mut col), 2);
        assert_eq!(col, vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_edges_not_extrapolated() {
        let mut col = vec![None, Some(2.0), None, Some(4.0), None];
        interpolate_column(&mut col);
        assert_eq!(col, vec![None, Some(2.0), Some(3.0), Some(4.0), None]);
    }

    #[test]
    fn test_interpolate_bars_drops_edges() {
        let rows = vec![
            raw(1, None),
            raw(2, Some(10.0)),
            raw(3, None),
            raw(4, Some(11.0)),
            raw(5, None),
        ];
        let bars = interpolate_bars("US", &rows).unwrap();
        assert_eq!(bars.len(), 3);
        assert!((bars[1].close - 10.5).abs() < 1e-12);
        assert_eq!(bars[0].date.day0(), 1);
    }

    #[test]
    fn test_inconsistent_bar_dropped() {
        let mut rows = vec![raw(1, Some(10.5)), raw(2, Some(11.0)), raw(3, Some(10.0))];
        // High below the open
        rows[1].high = Some(9.5);
        let bars = interpolate_bars("UK", &rows).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].date, rows[2].date);
        assert!(bars.iter().all(PriceBar::is_consistent));

        let err = interpolate_bars("UK", &rows[1..2]).unwrap_err();
        assert!(matches!(err, ConnectednessError::MissingData { .. }));
    }

    #[test]
    fn test_empty_table_is_missing_data() {
        let err = interpolate_bars("HK", &[]).unwrap_err();
        assert!(matches!(err, ConnectednessError::MissingData { .. }));

        let err = interpolate_bars("HK", &[raw(1, None)]).unwrap_err();
        assert!(matches!(err, ConnectednessError::MissingData { .. }));
    }
}
