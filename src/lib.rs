//! # Volatility Connectedness
//!
//! Rolling Diebold-Yilmaz volatility spillover across equity index markets:
//!
//! - Yang-Zhang range-based volatility from daily OHLC bars
//! - Calendar alignment of all markets into one date × market panel
//! - Rolling-window VAR(p) estimated by OLS, with AIC/BIC lag selection
//! - Generalized forecast-error variance decomposition into a connectedness table
//!
//! ## Modules
//!
//! - `data` - Price bars, CSV loading, gap interpolation and synthetic data
//! - `volatility` - Yang-Zhang estimator
//! - `alignment` - Calendar alignment into an `AlignedPanel`
//! - `var` - VAR estimation, lag selection and rolling windows
//! - `connectedness` - Variance decomposition and spillover measures
//! - `utils` - Run configuration
//!
//! ## Quick start
//!
//! ```no_run
//! use volatility_connectedness::{Pipeline, PipelineConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::from_file("config.json")?;
//!     let result = Pipeline::new(config)?.run()?;
//!
//!     println!("{}", result.full_sample.table.summary());
//!     for (date, total) in result.rolling_index() {
//!         println!("{} {:.2}%", date, total * 100.0);
//!     }
//!     Ok(())
//! }
//! ```

pub mod alignment;
pub mod connectedness;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod utils;
pub mod var;
pub mod volatility;

pub use alignment::{AlignedPanel, CalendarAligner};
pub use connectedness::{ConnectednessDecomposer, ConnectednessTable};
pub use data::{DataLoader, PriceBar, RawBar, VolatilitySeries};
pub use error::{ConnectednessError, Result};
pub use pipeline::{FullSampleResult, Pipeline, PipelineResult, WindowResult};
pub use utils::{DegeneratePolicy, LagSelection, MarketSource, PipelineConfig};
pub use var::{
    select_lag_order, CoefficientSet, InformationCriterion, RollingConfig, RollingEstimator,
    VarFit, VarModel,
};
pub use volatility::{yang_zhang_volatility, YangZhangEstimator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
