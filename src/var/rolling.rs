//! Rolling-window VAR estimation
//!
//! Windows of `window` consecutive panel rows, advanced by `stride`, are
//! fitted independently. Each window only reads its own slice of the panel,
//! so windows run in parallel and results are collected in index order.

use super::model::{VarFit, VarModel};
use crate::alignment::AlignedPanel;
use crate::error::{ConnectednessError, Result};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Rolling estimation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollingConfig {
    /// VAR lag order p
    pub lag_order: usize,
    /// Rows per window w
    pub window: usize,
    /// Rows between consecutive window starts
    pub stride: usize,
    /// Fit windows on the rayon thread pool
    pub parallel: bool,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            lag_order: 1,
            window: 200,
            stride: 1,
            parallel: true,
        }
    }
}

impl RollingConfig {
    /// Reject settings that can never produce a fit
    pub fn validate(&self) -> Result<()> {
        if self.lag_order == 0 {
            return Err(ConnectednessError::InvalidParameter(
                "lag order must be at least 1".to_string(),
            ));
        }
        if self.stride == 0 {
            return Err(ConnectednessError::InvalidParameter(
                "stride must be at least 1".to_string(),
            ));
        }
        if self.window < self.lag_order + 1 {
            return Err(ConnectednessError::InsufficientWindow {
                reason: format!(
                    "window {} is shorter than lag order + 1 = {}",
                    self.window,
                    self.lag_order + 1
                ),
            });
        }
        Ok(())
    }
}

/// Position of one window in the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpan {
    /// Window number, 0-based
    pub index: usize,
    /// First panel row
    pub start_row: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Fitted model of one window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowFit {
    pub span: WindowSpan,
    pub fit: VarFit,
}

/// A window whose fit or decomposition failed
#[derive(Debug)]
pub struct WindowFailure {
    pub span: WindowSpan,
    pub error: ConnectednessError,
}

impl std::fmt::Display for WindowFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "window {} ({} to {}): {}",
            self.span.index, self.span.start_date, self.span.end_date, self.error
        )
    }
}

/// Per-window result
pub type WindowOutcome<T> = std::result::Result<T, WindowFailure>;

/// Rolling VAR estimator
#[derive(Debug, Clone, Copy)]
pub struct RollingEstimator {
    config: RollingConfig,
    model: VarModel,
}

impl RollingEstimator {
    pub fn new(config: RollingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            model: VarModel::new(config.lag_order)?,
        })
    }

    pub fn config(&self) -> &RollingConfig {
        &self.config
    }

    /// Number of windows that fit in `n_rows` panel rows
    pub fn window_count(&self, n_rows: usize) -> usize {
        if n_rows < self.config.window {
            0
        } else {
            (n_rows - self.config.window) / self.config.stride + 1
        }
    }

    /// Span of every window over the panel.
    ///
    /// Fails with `InsufficientWindow` when the panel is shorter than one window.
    pub fn spans(&self, panel: &AlignedPanel) -> Result<Vec<WindowSpan>> {
        if panel.n_rows() < self.config.window {
            return Err(ConnectednessError::InsufficientWindow {
                reason: format!(
                    "panel has {} rows but the window needs {}",
                    panel.n_rows(),
                    self.config.window
                ),
            });
        }

        let dates = panel.dates();
        Ok((0..self.window_count(panel.n_rows()))
            .map(|index| {
                let start_row = index * self.config.stride;
                WindowSpan {
                    index,
                    start_row,
                    start_date: dates[start_row],
                    end_date: dates[start_row + self.config.window - 1],
                }
            })
            .collect())
    }

    /// Fit the VAR on one window
    pub fn fit_window(&self, panel: &AlignedPanel, span: WindowSpan) -> WindowOutcome<WindowFit> {
        let Some(rows) = panel.rows(span.start_row, self.config.window) else {
            return Err(WindowFailure {
                span,
                error: ConnectednessError::InsufficientWindow {
                    reason: format!(
                        "window at row {} runs past the {} panel rows",
                        span.start_row,
                        panel.n_rows()
                    ),
                },
            });
        };
        match self.model.fit(rows) {
            Ok(fit) => Ok(WindowFit { span, fit }),
            Err(error) => Err(WindowFailure { span, error }),
        }
    }

    /// Fit every window
    pub fn estimate(&self, panel: &AlignedPanel) -> Result<Vec<WindowOutcome<WindowFit>>> {
        self.estimate_with(panel, None, Ok)
    }

    /// Fit every window and pass each fit through `then`.
    ///
    /// When `cancel` is raised, windows not yet started are abandoned and
    /// left out of the result; completed windows are kept.
    pub fn estimate_with<T, F>(
        &self,
        panel: &AlignedPanel,
        cancel: Option<&AtomicBool>,
        then: F,
    ) -> Result<Vec<WindowOutcome<T>>>
    where
        T: Send,
        F: Fn(WindowFit) -> Result<T> + Sync + Send,
    {
        let spans = self.spans(panel)?;
        info!(
            windows = spans.len(),
            window = self.config.window,
            stride = self.config.stride,
            lag_order = self.config.lag_order,
            "Rolling VAR estimation"
        );

        let run = |span: WindowSpan| -> Option<WindowOutcome<T>> {
            if cancel.map(|c| c.load(Ordering::Relaxed)).unwrap_or(false) {
                return None;
            }
            let outcome = self.fit_window(panel, span).and_then(|wf| {
                let span = wf.span;
                then(wf).map_err(|error| WindowFailure { span, error })
            });
            if let Err(failure) = &outcome {
                debug!(%failure, "Window failed");
            }
            Some(outcome)
        };

        let outcomes: Vec<WindowOutcome<T>> = if self.config.parallel {
            spans.into_par_iter().filter_map(run).collect()
        } else {
            spans.into_iter().filter_map(run).collect()
        };

        Ok(outcomes)
    }
}
