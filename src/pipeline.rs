//! End-to-end connectedness run
//!
//! price bars → Yang-Zhang volatility → aligned panel → VAR fits →
//! connectedness tables. Each stage only reads the output of the previous one.

use crate::alignment::{AlignedPanel, CalendarAligner};
use crate::connectedness::{ConnectednessDecomposer, ConnectednessTable};
use crate::data::{DataLoader, PriceBar, VolatilitySeries};
use crate::error::{ConnectednessError, Result};
use crate::utils::{DegeneratePolicy, PipelineConfig};
use crate::var::{
    select_lag_order, LagSelectionResult, RollingConfig, RollingEstimator, VarFit, VarModel,
    WindowFailure, WindowSpan,
};
use crate::volatility::YangZhangEstimator;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Fit and table over the whole aligned panel
#[derive(Debug, Clone, Serialize)]
pub struct FullSampleResult {
    pub fit: VarFit,
    pub table: ConnectednessTable,
}

/// Fit and table of one rolling window
#[derive(Debug, Clone, Serialize)]
pub struct WindowResult {
    pub span: WindowSpan,
    pub fit: VarFit,
    pub table: ConnectednessTable,
}

/// Everything one run produces
#[derive(Debug)]
pub struct PipelineResult {
    pub panel: AlignedPanel,
    /// Lag order used for every fit
    pub lag_order: usize,
    pub lag_selection: Option<LagSelectionResult>,
    pub full_sample: FullSampleResult,
    /// Successful windows in index order
    pub windows: Vec<WindowResult>,
    /// Windows skipped under `DegeneratePolicy::Skip`
    pub failures: Vec<WindowFailure>,
    /// Whether the run was cancelled before all windows were processed
    pub cancelled: bool,
}

impl PipelineResult {
    /// Total connectedness by window end date
    pub fn rolling_index(&self) -> Vec<(NaiveDate, f64)> {
        self.windows
            .iter()
            .map(|w| (w.span.end_date, w.table.total))
            .collect()
    }
}

/// Connectedness pipeline for one configuration
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    cancel: Option<Arc<AtomicBool>>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: None,
        })
    }

    /// Abandon remaining rolling windows once `flag` is raised
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read every configured market's price file
    pub fn load_bars(&self) -> Result<Vec<(String, Vec<PriceBar>)>> {
        self.config
            .market_paths()
            .into_iter()
            .map(|(name, path)| {
                let bars = DataLoader::load_bars(&name, &path)?;
                Ok((name, bars))
            })
            .collect()
    }

    /// Load the configured files and run every stage
    pub fn run(&self) -> Result<PipelineResult> {
        let bars = self.load_bars()?;
        self.run_with_bars(bars)
    }

    /// Yang-Zhang volatility of every market, undefined values dropped
    pub fn volatility(&self, bars: &[(String, Vec<PriceBar>)]) -> Result<Vec<VolatilitySeries>> {
        let estimator = YangZhangEstimator::new(self.config.volatility_window)?.with_clean(true);
        bars.iter()
            .map(|(name, bars)| {
                if bars.is_empty() {
                    return Err(ConnectednessError::missing(name.as_str(), "no price bars"));
                }
                Ok(estimator.series(name, bars))
            })
            .collect()
    }

    /// Align volatility series onto the configured date range
    pub fn align(&self, series: &[VolatilitySeries]) -> Result<AlignedPanel> {
        CalendarAligner::new(self.config.start, self.config.end)?.align(series)
    }

    /// Run from already loaded bars, one entry per market in column order
    pub fn run_with_bars(&self, bars: Vec<(String, Vec<PriceBar>)>) -> Result<PipelineResult> {
        let series = self.volatility(&bars)?;
        let panel = self.align(&series)?;
        self.run_with_panel(panel)
    }

    /// Fit the full sample and every rolling window of an aligned panel
    pub fn run_with_panel(&self, panel: AlignedPanel) -> Result<PipelineResult> {
        if self.config.rolling && panel.n_rows() < self.config.rolling_window {
            return Err(ConnectednessError::InsufficientWindow {
                reason: format!(
                    "panel has {} rows but the rolling window needs {}",
                    panel.n_rows(),
                    self.config.rolling_window
                ),
            });
        }

        let lag_selection = match self.config.lag_selection {
            Some(sel) => Some(select_lag_order(panel.values().view(), sel.max_lag, sel.criterion)?),
            None => None,
        };
        let lag_order = lag_selection
            .as_ref()
            .map(|s| s.selected)
            .unwrap_or(self.config.lag_order);

        let decomposer = ConnectednessDecomposer::new(self.config.horizon)?;
        let fit = VarModel::new(lag_order)?.fit(panel.values().view())?;
        let table = decomposer.decompose(&fit.coefficients, &fit.sigma, panel.markets())?;
        info!(
            lag_order,
            total_pct = table.total_percent(),
            mean_r2 = fit.mean_r_squared(),
            "Full-sample connectedness"
        );
        let full_sample = FullSampleResult { fit, table };

        let (windows, failures) = if self.config.rolling {
            self.run_rolling(&panel, lag_order, &decomposer)?
        } else {
            (Vec::new(), Vec::new())
        };
        let cancelled = self
            .cancel
            .as_ref()
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(false);

        Ok(PipelineResult {
            panel,
            lag_order,
            lag_selection,
            full_sample,
            windows,
            failures,
            cancelled,
        })
    }

    fn run_rolling(
        &self,
        panel: &AlignedPanel,
        lag_order: usize,
        decomposer: &ConnectednessDecomposer,
    ) -> Result<(Vec<WindowResult>, Vec<WindowFailure>)> {
        let estimator = RollingEstimator::new(RollingConfig {
            lag_order,
            window: self.config.rolling_window,
            stride: self.config.stride,
            parallel: self.config.parallel,
        })?;

        let outcomes = estimator.estimate_with(panel, self.cancel.as_deref(), |wf| {
            let table = decomposer.decompose(&wf.fit.coefficients, &wf.fit.sigma, panel.markets())?;
            Ok(WindowResult {
                span: wf.span,
                fit: wf.fit,
                table,
            })
        })?;

        let mut windows = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(w) => windows.push(w),
                Err(failure) => failures.push(failure),
            }
        }

        if let Some(first) = failures.first() {
            match self.config.degenerate_policy {
                DegeneratePolicy::Abort => {
                    warn!(%first, "Aborting run on failed window");
                    return Err(failures.swap_remove(0).error);
                }
                DegeneratePolicy::Skip => {
                    warn!(skipped = failures.len(), first = %first, "Skipped failed windows");
                }
            }
        }

        info!(
            windows = windows.len(),
            failed = failures.len(),
            "Rolling connectedness complete"
        );
        Ok((windows, failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generate_correlated_bars;
    use crate::utils::MarketSource;

    fn config(rolling_window: usize) -> PipelineConfig {
        PipelineConfig {
            markets: vec![
                MarketSource::new("US", "us.csv"),
                MarketSource::new("UK", "uk.csv"),
                MarketSource::new("HK", "hk.csv"),
            ],
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2022, 12, 31).unwrap(),
            rolling_window,
            stride: 20,
            ..Default::default()
        }
    }

    fn bars() -> Vec<(String, Vec<PriceBar>)> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let markets = generate_correlated_bars(3, 400, start, 0.012, 0.6, 17);
        ["US", "UK", "HK"]
            .iter()
            .map(|s| s.to_string())
            .zip(markets)
            .collect()
    }

    #[test]
    fn test_run_with_bars() {
        let result = Pipeline::new(config(100)).unwrap().run_with_bars(bars()).unwrap();

        // One bar per market is consumed by the volatility window
        assert_eq!(result.panel.n_rows(), 399);
        assert_eq!(result.lag_order, 1);
        assert_eq!(result.windows.len(), (399 - 100) / 20 + 1);
        assert!(result.failures.is_empty());
        assert!(!result.cancelled);

        let index = result.rolling_index();
        assert_eq!(index.len(), result.windows.len());
        assert!(index.windows(2).all(|w| w[0].0 < w[1].0));
        assert!(index.iter().all(|(_, t)| (0.0..=1.0).contains(t)));
        assert!((0.0..=1.0).contains(&result.full_sample.table.total));
    }

    #[test]
    fn test_full_sample_only() {
        let cfg = PipelineConfig {
            rolling: false,
            ..config(100)
        };
        let result = Pipeline::new(cfg).unwrap().run_with_bars(bars()).unwrap();
        assert!(result.windows.is_empty());
        assert_eq!(result.full_sample.table.n_markets(), 3);
    }

    #[test]
    fn test_lag_selection_used() {
        let cfg = PipelineConfig {
            lag_selection: Some(crate::utils::LagSelection {
                max_lag: 3,
                criterion: crate::var::InformationCriterion::Bic,
            }),
            ..config(120)
        };
        let result = Pipeline::new(cfg).unwrap().run_with_bars(bars()).unwrap();
        let selection = result.lag_selection.as_ref().unwrap();
        assert_eq!(result.lag_order, selection.selected);
        assert!(result
            .windows
            .iter()
            .all(|w| w.fit.coefficients.lag_order() == result.lag_order));
    }

    #[test]
    fn test_panel_shorter_than_window() {
        let err = Pipeline::new(config(1000))
            .unwrap()
            .run_with_bars(bars())
            .unwrap_err();
        assert!(matches!(err, ConnectednessError::InsufficientWindow { .. }));
    }

    #[test]
    fn test_short_panel_rejected_before_any_fit() {
        // Six rows cannot even support the full-sample fit
        let values = ndarray::Array2::from_shape_fn((6, 3), |(i, j)| 0.01 + 0.001 * ((i * 7 + j * 3) % 5) as f64);
        let dates = crate::data::business_days(NaiveDate::from_ymd_opt(2021, 1, 4).unwrap(), 6);
        let panel = AlignedPanel::new(
            dates,
            vec!["US".into(), "UK".into(), "HK".into()],
            values,
        )
        .unwrap();

        let cfg = PipelineConfig {
            lag_selection: Some(crate::utils::LagSelection {
                max_lag: 2,
                criterion: crate::var::InformationCriterion::Aic,
            }),
            ..config(200)
        };
        let err = Pipeline::new(cfg).unwrap().run_with_panel(panel).unwrap_err();
        assert!(matches!(err, ConnectednessError::InsufficientWindow { .. }));
    }

    #[test]
    fn test_cancelled_before_start() {
        let flag = Arc::new(AtomicBool::new(true));
        let result = Pipeline::new(config(100))
            .unwrap()
            .with_cancellation(flag)
            .run_with_bars(bars())
            .unwrap();
        assert!(result.cancelled);
        assert!(result.windows.is_empty());
    }

    #[test]
    fn test_empty_market_is_missing_data() {
        let mut input = bars();
        input[1].1.clear();
        let err = Pipeline::new(config(100)).unwrap().run_with_bars(input).unwrap_err();
        assert!(matches!(err, ConnectednessError::MissingData { .. }));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let cfg = PipelineConfig {
            stride: 0,
            ..config(100)
        };
        assert!(Pipeline::new(cfg).is_err());
    }
}
