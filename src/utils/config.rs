//! Configuration
//!
//! Run settings for the connectedness pipeline, stored as JSON.

use crate::error::{ConnectednessError, Result};
use crate::var::InformationCriterion;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// One market and the price file it is read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSource {
    /// Market name used as the panel column
    pub name: String,
    /// CSV file name, resolved against `data_dir`
    pub file: String,
}

impl MarketSource {
    pub fn new(name: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
        }
    }
}

/// Automatic lag order search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LagSelection {
    /// Largest lag order tried
    pub max_lag: usize,
    #[serde(default)]
    pub criterion: InformationCriterion,
}

/// What to do when a rolling window cannot be fitted or decomposed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
    /// Stop the run at the first failed window
    Abort,
    /// Record the failure and continue with the next window
    #[default]
    Skip,
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Markets in panel column order
    pub markets: Vec<MarketSource>,
    /// Directory holding the price files
    pub data_dir: PathBuf,
    /// First calendar date (inclusive)
    pub start: NaiveDate,
    /// Last calendar date (inclusive)
    pub end: NaiveDate,
    /// Yang-Zhang averaging window n
    pub volatility_window: usize,
    /// VAR lag order p, used when `lag_selection` is not set
    pub lag_order: usize,
    pub lag_selection: Option<LagSelection>,
    /// Rows per rolling window w
    pub rolling_window: usize,
    /// Rows between rolling window starts
    pub stride: usize,
    /// Forecast horizon h of the variance decomposition
    pub horizon: usize,
    pub degenerate_policy: DegeneratePolicy,
    /// Fit rolling windows in parallel
    pub parallel: bool,
    /// Compute rolling windows; false gives the full-sample table only
    pub rolling: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            markets: vec![
                MarketSource::new("US", "^GSPC.csv"),
                MarketSource::new("UK", "^FTSE.csv"),
                MarketSource::new("Singapore", "^STI.csv"),
                MarketSource::new("HK", "^HSI.csv"),
                MarketSource::new("Taiwan", "^TWII.csv"),
                MarketSource::new("Japan", "^N225.csv"),
                MarketSource::new("China", "000001.SS.csv"),
            ],
            data_dir: PathBuf::from("data"),
            start: NaiveDate::from_ymd_opt(1998, 9, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap_or_default(),
            volatility_window: 2,
            lag_order: 1,
            lag_selection: None,
            rolling_window: 200,
            stride: 1,
            horizon: 10,
            degenerate_policy: DegeneratePolicy::Skip,
            parallel: true,
            rolling: true,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Market names in column order
    pub fn market_names(&self) -> Vec<String> {
        self.markets.iter().map(|m| m.name.clone()).collect()
    }

    /// (name, path) pairs with files resolved against `data_dir`
    pub fn market_paths(&self) -> Vec<(String, PathBuf)> {
        self.markets
            .iter()
            .map(|m| (m.name.clone(), self.data_dir.join(&m.file)))
            .collect()
    }

    /// Largest lag order the run may fit
    pub fn max_lag_order(&self) -> usize {
        self.lag_selection
            .map(|s| s.max_lag)
            .unwrap_or(self.lag_order)
    }

    /// Reject settings that cannot produce a result, before any file is read
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ConnectednessError::InvalidParameter(msg));

        if self.markets.is_empty() {
            return invalid("at least one market is required".to_string());
        }
        let mut seen = HashSet::new();
        for m in &self.markets {
            if m.name.trim().is_empty() {
                return invalid("market names must not be empty".to_string());
            }
            if m.file.trim().is_empty() {
                return invalid(format!("market {} has no price file", m.name));
            }
            if !seen.insert(m.name.as_str()) {
                return invalid(format!("duplicate market name {}", m.name));
            }
        }
        if self.start > self.end {
            return invalid(format!("start {} is after end {}", self.start, self.end));
        }
        if self.volatility_window < 2 {
            return invalid(format!(
                "volatility window must be at least 2, got {}",
                self.volatility_window
            ));
        }
        if self.lag_order == 0 {
            return invalid("lag order must be at least 1".to_string());
        }
        if let Some(selection) = self.lag_selection {
            if selection.max_lag == 0 {
                return invalid("max lag must be at least 1".to_string());
            }
        }
        if self.stride == 0 {
            return invalid("stride must be at least 1".to_string());
        }
        if self.horizon == 0 {
            return invalid("forecast horizon must be at least 1".to_string());
        }
        if self.rolling && self.rolling_window < self.max_lag_order() + 1 {
            return Err(ConnectednessError::InsufficientWindow {
                reason: format!(
                    "rolling window {} is shorter than lag order + 1 = {}",
                    self.rolling_window,
                    self.max_lag_order() + 1
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.markets.len(), 7);
        assert_eq!(config.markets[0].name, "US");
        assert_eq!(config.volatility_window, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_market_paths() {
        let config = PipelineConfig {
            data_dir: PathBuf::from("/tmp/prices"),
            ..Default::default()
        };
        let paths = config.market_paths();
        assert_eq!(paths[1].0, "UK");
        assert_eq!(paths[1].1, PathBuf::from("/tmp/prices/^FTSE.csv"));
    }

    #[test]
    fn test_validation_errors() {
        let mut config = PipelineConfig::default();
        config.markets.push(MarketSource::new("US", "dup.csv"));
        assert!(matches!(config.validate(), Err(ConnectednessError::InvalidParameter(_))));

        let config = PipelineConfig {
            volatility_window: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            lag_order: 5,
            rolling_window: 5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConnectednessError::InsufficientWindow { .. })
        ));

        let config = PipelineConfig {
            lag_selection: Some(LagSelection {
                max_lag: 20,
                criterion: InformationCriterion::Aic,
            }),
            rolling_window: 15,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            horizon: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = PipelineConfig {
            lag_selection: Some(LagSelection {
                max_lag: 4,
                criterion: InformationCriterion::Bic,
            }),
            degenerate_policy: DegeneratePolicy::Abort,
            ..Default::default()
        };
        config.to_file(&path).unwrap();
        let loaded = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "markets": [{"name": "A", "file": "a.csv"}, {"name": "B", "file": "b.csv"}],
            "start": "2010-01-01",
            "degenerate_policy": "abort",
            "lag_selection": {"max_lag": 3}
        }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.markets.len(), 2);
        assert_eq!(config.rolling_window, 200);
        assert_eq!(config.degenerate_policy, DegeneratePolicy::Abort);
        assert_eq!(config.lag_selection.unwrap().criterion, InformationCriterion::Aic);
        assert_eq!(config.start, NaiveDate::from_ymd_opt(2010, 1, 1).unwrap());
    }
}
