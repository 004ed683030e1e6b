//! Real-time candlestick charting with incremental technical indicators.

pub mod chart;
pub mod error;
pub mod logger;
pub mod setting;

pub use chart::{Bar, ChartStyle, ChartView, ChartWidget};
pub use error::{ChartError, Result};
pub use setting::ChartSettings;
