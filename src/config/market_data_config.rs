//! Market data source settings.

use std::env;

#[derive(Debug, Clone, PartialEq)]
pub struct MarketDataEnvConfig {
    pub yahoo_base_url: String,
    pub history_years: u32,
    pub csv_data_dir: String,
}

impl Default for MarketDataEnvConfig {
    fn default() -> Self {
        Self {
            yahoo_base_url: "https://query1.finance.yahoo.com".to_string(),
            history_years: 5,
            csv_data_dir: "data/prices".to_string(),
        }
    }
}

impl MarketDataEnvConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            yahoo_base_url: env::var("YAHOO_BASE_URL").unwrap_or(defaults.yahoo_base_url),
            history_years: env::var("HISTORY_YEARS")
                .unwrap_or_else(|_| "5".to_string())
                .parse::<u32>()
                .unwrap_or(5),
            csv_data_dir: env::var("CSV_DATA_DIR").unwrap_or(defaults.csv_data_dir),
        }
    }
}
