//! Utilities
//!
//! Run configuration.

pub mod config;

pub use config::{DegeneratePolicy, LagSelection, MarketSource, PipelineConfig};
