//! News sentiment settings.

use std::env;

#[derive(Debug, Clone, PartialEq)]
pub struct SentimentEnvConfig {
    /// Unset disables news sentiment (every symbol scores 0.0)
    pub news_api_key: Option<String>,
    pub news_api_url: String,
    pub page_size: usize,
    pub timeout_secs: u64,
}

impl Default for SentimentEnvConfig {
    fn default() -> Self {
        Self {
            news_api_key: None,
            news_api_url: "https://newsapi.org/v2/everything".to_string(),
            page_size: 10,
            timeout_secs: 5,
        }
    }
}

impl SentimentEnvConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            news_api_key: env::var("NEWS_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            news_api_url: env::var("NEWS_API_URL").unwrap_or(defaults.news_api_url),
            page_size: env::var("NEWS_PAGE_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse::<usize>()
                .unwrap_or(10),
            timeout_secs: env::var("SENTIMENT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse::<u64>()
                .unwrap_or(5),
        }
    }
}
