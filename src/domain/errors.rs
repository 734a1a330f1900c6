use thiserror::Error;

/// Errors produced by the prediction pipeline and its collaborators.
///
/// Every variant carries the offending symbol so a failure can be traced
/// back to the request that caused it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("Data unavailable for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    #[error("No models available for prediction of {symbol}")]
    NoModelsAvailable { symbol: String },

    #[error("Sentiment fetch failed for {symbol}: {reason}")]
    SentimentFetch { symbol: String, reason: String },

    #[error("Training of {model} failed for {symbol}: {reason}")]
    ModelTraining {
        model: String,
        symbol: String,
        reason: String,
    },

    #[error("Invalid symbol: '{symbol}'")]
    InvalidSymbol { symbol: String },

    #[error("Prediction for {symbol} aborted: {reason}")]
    PipelineAborted { symbol: String, reason: String },
}

impl PredictionError {
    pub fn data_unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Self::DataUnavailable { symbol, .. }
            | Self::NoModelsAvailable { symbol }
            | Self::SentimentFetch { symbol, .. }
            | Self::ModelTraining { symbol, .. }
            | Self::InvalidSymbol { symbol }
            | Self::PipelineAborted { symbol, .. } => symbol,
        }
    }

    /// Whether the caller supplied bad input (as opposed to a pipeline failure).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::DataUnavailable { .. } | Self::InvalidSymbol { .. }
        )
    }
}
