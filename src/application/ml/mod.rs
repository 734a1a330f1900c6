pub mod confidence;
pub mod ensemble;
pub mod evaluation;
pub mod feature_builder;
pub mod gradient_boosting;
pub mod lstm;
pub mod predictor;
pub mod random_forest;
pub mod scaler;
pub mod sequence;
pub mod trainer;
#[cfg(feature = "xgboost")]
pub mod xgboost;
