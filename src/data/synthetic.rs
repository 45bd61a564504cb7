//! Synthetic data generators
//!
//! Used by the demo command and the test suite.

use super::types::PriceBar;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

fn draw(rng: &mut StdRng) -> f64 {
    StandardNormal.sample(rng)
}

/// Weekday calendar starting at `start` (weekends skipped)
pub fn business_days(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut dates = Vec::with_capacity(n);
    let mut day = start;
    while dates.len() < n {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            dates.push(day);
        }
        day += Duration::days(1);
    }
    dates
}

/// Generate daily OHLC bars for several markets that share a common shock.
///
/// `correlation` is the loading of each market on the common factor, and
/// `daily_vol` the standard deviation of daily log returns.
pub fn generate_correlated_bars(
    n_markets: usize,
    n_days: usize,
    start: NaiveDate,
    daily_vol: f64,
    correlation: f64,
    seed: u64,
) -> Vec<Vec<PriceBar>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dates = business_days(start, n_days);
    let idio = (1.0 - correlation * correlation).max(0.0).sqrt();

    let mut prices = vec![100.0; n_markets];
    let mut markets: Vec<Vec<PriceBar>> = vec![Vec::with_capacity(n_days); n_markets];

    for &date in &dates {
        let common = draw(&mut rng);
        // Volatility clusters: the common shock also scales today's range
        let regime = 1.0 + 0.5 * common.abs();

        for m in 0..n_markets {
            let gap = daily_vol * 0.3 * draw(&mut rng);
            let z = correlation * common + idio * draw(&mut rng);
            let ret = daily_vol * regime * z;

            let open = prices[m] * gap.exp();
            let close = open * ret.exp();
            let wick_up = (daily_vol * regime * draw(&mut rng).abs() * 0.5).exp();
            let wick_down = (-daily_vol * regime * draw(&mut rng).abs() * 0.5).exp();
            let high = open.max(close) * wick_up;
            let low = open.min(close) * wick_down;

            markets[m].push(PriceBar::new(date, open, high, low, close));
            prices[m] = close;
        }
    }

    markets
}

/// Simulate a VAR(p) process
///
/// y_t = c + Σ A_l y_{t-l} + e_t with independent Gaussian shocks of
/// standard deviation `noise_std`. The first `burn_in` draws are discarded.
pub fn simulate_var(
    intercept: &Array1<f64>,
    coefficients: &[Array2<f64>],
    noise_std: f64,
    n_obs: usize,
    burn_in: usize,
    seed: u64,
) -> Array2<f64> {
    let n = intercept.len();
    let p = coefficients.len();
    let total = n_obs + burn_in + p;

    let mut rng = StdRng::seed_from_u64(seed);

    let mut y = Array2::<f64>::zeros((total, n));
    for t in p..total {
        let mut row = intercept.clone();
        for (l, a) in coefficients.iter().enumerate() {
            row = row + a.dot(&y.row(t - l - 1));
        }
        for i in 0..n {
            row[i] += noise_std * draw(&mut rng);
        }
        y.row_mut(t).assign(&row);
    }

    y.slice(ndarray::s![burn_in + p.., ..]).to_owned()
}
