//! Market data: price bars, CSV loading, gap filling and synthetic data

pub mod interpolate;
pub mod loader;
pub mod synthetic;
pub mod types;

pub use interpolate::{interpolate_bars, interpolate_column};
pub use loader::{parse_date, DataLoader, DATE_FORMAT};
pub use synthetic::{business_days, generate_correlated_bars, simulate_var};
pub use types::{PriceBar, RawBar, VolatilitySeries};
