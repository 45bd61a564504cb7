//! Calendar alignment of volatility series into a date × market panel

mod aligner;
mod panel;

pub use aligner::{calendar_axis, CalendarAligner};
pub use panel::AlignedPanel;
