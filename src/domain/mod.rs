// Market data domain (bars, series, supported universe)
pub mod market;

// Feature registry and model identities
pub mod ml;

// Port interfaces
pub mod ports;

// Prediction result record
pub mod prediction;

// Sentiment scoring contract
pub mod sentiment;

// Domain-specific error types
pub mod errors;
