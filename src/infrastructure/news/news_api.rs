use super::headline_scorer::HeadlineScorer;
use crate::domain::errors::PredictionError;
use crate::domain::market::universe::news_query_term;
use crate::domain::sentiment::SentimentProvider;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsApiArticle {
    title: Option<String>,
    description: Option<String>,
}

impl NewsApiArticle {
    fn text(&self) -> String {
        format!(
            "{} {}",
            self.title.as_deref().unwrap_or_default(),
            self.description.as_deref().unwrap_or_default()
        )
    }
}

/// News sentiment from NewsAPI headlines, scored locally.
pub struct NewsApiSentimentProvider {
    client: Client,
    url: String,
    api_key: Option<String>,
    page_size: usize,
    scorer: HeadlineScorer,
}

impl NewsApiSentimentProvider {
    pub fn new(url: String, api_key: Option<String>, page_size: usize, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            page_size: page_size.max(1),
            scorer: HeadlineScorer::new(),
        }
    }

    async fn fetch_articles(&self, api_key: &str, query: &str) -> anyhow::Result<Vec<NewsApiArticle>> {
        let page_size = self.page_size.to_string();
        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("q", query),
                ("apiKey", api_key),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
            ])
            .send()
            .await
            .context("Failed to send request to NewsAPI")?;

        if !response.status().is_success() {
            anyhow::bail!("NewsAPI returned status: {}", response.status());
        }

        let body: NewsApiResponse = response
            .json()
            .await
            .context("Failed to parse NewsAPI response")?;
        Ok(body.articles)
    }
}

#[async_trait]
impl SentimentProvider for NewsApiSentimentProvider {
    async fn fetch_sentiment(&self, symbol: &str) -> Result<f64, PredictionError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Ok(0.0);
        };

        let query = news_query_term(symbol);
        let articles = self
            .fetch_articles(api_key, &query)
            .await
            .map_err(|e| PredictionError::SentimentFetch {
                symbol: symbol.to_string(),
                reason: format!("{:#}", e),
            })?;

        let texts: Vec<String> = articles
            .iter()
            .take(self.page_size)
            .map(NewsApiArticle::text)
            .collect();
        debug!("NewsAPI: {} articles for {} ({})", texts.len(), symbol, query);

        let score = self
            .scorer
            .mean_score(texts.iter().map(String::as_str))
            .unwrap_or(0.0);
        info!("News sentiment for {}: {:.3} over {} articles", symbol, score, texts.len());
        Ok(score)
    }

    fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn name(&self) -> &str {
        "newsapi"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(key: Option<&str>) -> NewsApiSentimentProvider {
        NewsApiSentimentProvider::new(
            "http://127.0.0.1:9/v2/everything".to_string(),
            key.map(str::to_string),
            10,
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn test_unconfigured_is_neutral() {
        let p = provider(None);
        assert!(!p.is_available());
        assert_eq!(p.fetch_sentiment("AAPL").await.unwrap(), 0.0);

        assert!(!provider(Some("  ")).is_available());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_sentiment_error() {
        let err = provider(Some("key")).fetch_sentiment("MSFT").await.unwrap_err();
        assert!(matches!(err, PredictionError::SentimentFetch { .. }));
        assert_eq!(err.symbol(), "MSFT");
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"status":"ok","totalResults":2,"articles":[
            {"title":"Apple beats estimates","description":null},
            {"title":null,"description":"Shares plunge"}]}"#;
        let parsed: NewsApiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.articles.len(), 2);
        assert_eq!(parsed.articles[0].text(), "Apple beats estimates ");
        assert_eq!(parsed.articles[1].text(), " Shares plunge");

        let empty: NewsApiResponse = serde_json::from_str(r#"{"status":"error"}"#).unwrap();
        assert!(empty.articles.is_empty());
    }
}
