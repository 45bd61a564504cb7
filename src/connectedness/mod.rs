//! Diebold-Yilmaz connectedness from fitted VAR models

mod gfevd;
mod table;

pub use gfevd::{ma_coefficients, ConnectednessDecomposer, DEFAULT_HORIZON};
pub use table::{ConnectednessTable, ROW_SUM_TOLERANCE};
