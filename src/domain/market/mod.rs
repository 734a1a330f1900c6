// Daily OHLCV bars and validated price history
pub mod price_series;

// Supported stock and crypto symbols
pub mod universe;

pub use price_series::{Bar, MIN_OBSERVATIONS, PriceSeries, Quote};
