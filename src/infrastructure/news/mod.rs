pub mod headline_scorer;
pub mod news_api;

pub use headline_scorer::HeadlineScorer;
pub use news_api::NewsApiSentimentProvider;
