//! Error types
//!
//! One error enum for the whole pipeline. Every variant is surfaced to the
//! caller; nothing is retried, since all inputs are static.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors that can occur while computing volatility connectedness
#[derive(Error, Debug)]
pub enum ConnectednessError {
    #[error("Missing data for market {market}: {reason}")]
    MissingData { market: String, reason: String },

    #[error("No overlapping dates across markets between {start} and {end}")]
    AlignmentEmpty { start: NaiveDate, end: NaiveDate },

    #[error("Insufficient window: {reason}")]
    InsufficientWindow { reason: String },

    #[error("Degenerate fit: {reason}")]
    DegenerateFit { reason: String },

    #[error("Non-finite values produced during {stage}")]
    NumericInstability { stage: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config parsing failed: {0}")]
    Config(#[from] serde_json::Error),
}

impl ConnectednessError {
    pub(crate) fn missing(market: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MissingData {
            market: market.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateFit {
            reason: reason.into(),
        }
    }

    pub(crate) fn unstable(stage: impl Into<String>) -> Self {
        Self::NumericInstability {
            stage: stage.into(),
        }
    }

    /// Whether the error concerns a single rolling window rather than the run
    pub fn is_per_window(&self) -> bool {
        matches!(
            self,
            Self::DegenerateFit { .. } | Self::NumericInstability { .. }
        )
    }
}

/// Result type alias for connectedness operations
pub type Result<T> = std::result::Result<T, ConnectednessError>;
