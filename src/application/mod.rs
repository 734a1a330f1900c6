// Indicator engine
pub mod market_data;

// Feature building, scaling and the ensemble members
pub mod ml;

// Pipeline, cache and the async service
pub mod prediction;
