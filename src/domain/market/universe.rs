//! Symbols the predictor is known to work with.

pub const SUPPORTED_STOCKS: &[&str] = &[
    "AAPL", "MSFT", "GOOG", "GOOGL", "META", "NVDA", "AMD", "INTC", "AMZN", "TSLA", "NFLX", "CRM",
    "ORCL", "ADBE", "PYPL", "SQ", "JPM", "V", "MA", "BAC", "GS", "WFC", "JNJ", "UNH", "PFE",
    "MRNA", "ABBV", "XOM", "CVX", "COP", "KO", "PEP", "MCD", "NKE", "DIS", "SBUX",
];

pub const SUPPORTED_CRYPTO: &[&str] = &[
    "BTC-USD", "ETH-USD", "BNB-USD", "XRP-USD", "SOL-USD", "ADA-USD", "DOGE-USD", "DOT-USD",
    "MATIC-USD", "AVAX-USD",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Stock,
    Crypto,
}

impl AssetKind {
    /// Crypto pairs are quoted against USD with a `-USD` suffix.
    pub fn of(symbol: &str) -> Self {
        if symbol.to_uppercase().ends_with("-USD") {
            AssetKind::Crypto
        } else {
            AssetKind::Stock
        }
    }
}

pub fn is_supported(symbol: &str) -> bool {
    let symbol = symbol.to_uppercase();
    SUPPORTED_STOCKS.contains(&symbol.as_str()) || SUPPORTED_CRYPTO.contains(&symbol.as_str())
}

pub fn total_supported() -> usize {
    SUPPORTED_STOCKS.len() + SUPPORTED_CRYPTO.len()
}

/// Search term used by news sources: `BTC-USD` -> `BTC`, `BRK.B` -> `BRKB`.
pub fn news_query_term(symbol: &str) -> String {
    symbol.replace("-USD", "").replace('.', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_lookup_is_case_insensitive() {
        assert!(is_supported("aapl"));
        assert!(is_supported("eth-usd"));
        assert!(!is_supported("XYZ"));
        assert_eq!(total_supported(), 46);
    }

    #[test]
    fn test_asset_kind() {
        assert_eq!(AssetKind::of("BTC-USD"), AssetKind::Crypto);
        assert_eq!(AssetKind::of("JPM"), AssetKind::Stock);
    }

    #[test]
    fn test_news_query_term() {
        assert_eq!(news_query_term("BTC-USD"), "BTC");
        assert_eq!(news_query_term("BRK.B"), "BRKB");
    }
}
