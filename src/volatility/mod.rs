//! Realized volatility estimation from OHLC bars

mod yang_zhang;

pub use yang_zhang::*;
