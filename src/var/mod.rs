//! Vector autoregression: OLS estimation, lag selection and rolling windows

pub mod linalg;
mod model;
mod rolling;
mod selection;

pub use model::{CoefficientSet, VarFit, VarModel};
pub use rolling::{RollingConfig, RollingEstimator, WindowFailure, WindowFit, WindowOutcome, WindowSpan};
pub use selection::{select_lag_order, InformationCriterion, LagScore, LagSelectionResult};
