//! Yang-Zhang volatility estimator
//!
//! Combines overnight, open-to-close and Rogers-Satchell variances:
//!
//! σ² = Vo + k·Vt + (1 − k)·Vrs,  k = 0.34 / (1 + (n + 1)/(n − 1))
//!
//! Variances are population variances over the last `n` observations. The
//! first bar has no previous close, so its overnight return is undefined and
//! the first window's overnight variance uses the `n − 1` returns available.

use crate::data::{PriceBar, VolatilitySeries};
use crate::error::{ConnectednessError, Result};
use tracing::{debug, warn};

/// Default averaging window
pub const DEFAULT_WINDOW: usize = 2;

/// Yang-Zhang rolling volatility
#[derive(Debug, Clone, Copy)]
pub struct YangZhangEstimator {
    /// Averaging window `n`
    window: usize,
    /// Drop undefined values from the output
    clean: bool,
}

impl Default for YangZhangEstimator {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            clean: false,
        }
    }
}

impl YangZhangEstimator {
    /// Create an estimator with averaging window `n`.
    ///
    /// `n = 1` leaves the weighting constant undefined and is rejected.
    pub fn new(window: usize) -> Result<Self> {
        if window < 2 {
            return Err(ConnectednessError::InvalidParameter(format!(
                "volatility window must be at least 2, got {}",
                window
            )));
        }
        Ok(Self {
            window,
            clean: false,
        })
    }

    /// Drop undefined leading values instead of keeping them as markers
    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Weighting constant between open-to-close and Rogers-Satchell terms
    pub fn k_parameter(n: usize) -> f64 {
        let n = n as f64;
        0.34 / (1.0 + (n + 1.0) / (n - 1.0))
    }

    /// Volatility per bar, aligned one-to-one with the input.
    ///
    /// The first `n − 1` entries are `None`. Bars that fail
    /// [`PriceBar::is_consistent`] can make the variance negative, leaving
    /// later entries `None` as well; the loader drops such bars.
    pub fn estimate(&self, bars: &[PriceBar]) -> Vec<Option<f64>> {
        let n = self.window;
        let len = bars.len();
        let k = Self::k_parameter(n);

        let overnight: Vec<Option<f64>> = (0..len)
            .map(|t| (t > 0).then(|| bars[t].log_overnight(bars[t - 1].close)))
            .collect();
        let open_close: Vec<f64> = bars.iter().map(PriceBar::log_close_open).collect();
        let rogers_satchell: Vec<f64> = bars
            .iter()
            .map(|b| {
                let (h_o, l_o, c_o) = (b.log_high_open(), b.log_low_open(), b.log_close_open());
                h_o * (h_o - c_o) + l_o * (l_o - c_o)
            })
            .collect();

        let mut result = vec![None; len.min(n - 1)];
        let mut rejected = 0usize;

        for t in (n - 1)..len {
            let start = t + 1 - n;

            let on_window: Vec<f64> = overnight[start..=t].iter().flatten().copied().collect();
            let vo = population_variance(&on_window);
            let vt = population_variance(&open_close[start..=t]);
            let rs = rogers_satchell[start..=t].iter().sum::<f64>() / n as f64;

            let variance = vo + k * vt + (1.0 - k) * rs;
            if variance.is_finite() && variance >= 0.0 {
                result.push(Some(variance.sqrt()));
            } else {
                rejected += 1;
                result.push(None);
            }
        }

        if rejected > 0 {
            warn!(rejected, "Yang-Zhang variance negative or non-finite, values left undefined");
        }

        result
    }

    /// Compute the volatility series of one market.
    ///
    /// With `clean` set, undefined entries are removed; otherwise the
    /// series has one entry per bar.
    pub fn series(&self, market: &str, bars: &[PriceBar]) -> VolatilitySeries {
        let values = self.estimate(bars);
        let dates: Vec<_> = bars.iter().map(|b| b.date).collect();

        let series = if self.clean {
            let (dates, values): (Vec<_>, Vec<_>) = dates
                .into_iter()
                .zip(values)
                .filter(|(_, v)| v.is_some())
                .unzip();
            VolatilitySeries::new(market, dates, values)
        } else {
            VolatilitySeries::new(market, dates, values)
        };

        debug!(
            market,
            bars = bars.len(),
            values = series.len(),
            undefined = series.undefined_count(),
            "Computed Yang-Zhang volatility"
        );

        series
    }
}

/// Population variance (ddof = 0); zero for fewer than two values
fn population_variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n
}

/// Convenience wrapper: Yang-Zhang volatility of one market
pub fn yang_zhang_volatility(
    market: &str,
    bars: &[PriceBar],
    window: usize,
    clean: bool,
) -> Result<VolatilitySeries> {
    Ok(YangZhangEstimator::new(window)?
        .with_clean(clean)
        .series(market, bars))
}
