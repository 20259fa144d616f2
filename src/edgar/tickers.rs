use std::collections::HashMap;

use log::debug;
use serde::Deserialize;
use url::Url;

use crate::core::error::{AnalyzerError, Result};
use crate::edgar::client::EdgarClient;

const TICKER_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// Validated, uppercased ticker symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticker(String);

impl Ticker {
    pub fn new(ticker: impl Into<String>) -> Result<Self> {
        let ticker = ticker.into();
        let uppercase = ticker.to_uppercase();
        if uppercase.is_empty() {
            return Err(AnalyzerError::InvalidTicker("(empty)".to_string()));
        }
        if !uppercase
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(AnalyzerError::InvalidTicker(ticker));
        }
        Ok(Ticker(uppercase))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the SEC's indexed company_tickers.json:
/// `{"0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."}, ...}`
#[derive(Debug, Deserialize)]
struct TickerEntry {
    cik_str: u64,
    ticker: String,
}

/// Resolves a ticker to its zero-padded 10-digit CIK via the SEC's official
/// mapping. The mapping is fetched fresh each run; filings are not cached, so
/// the mapping isn't either.
pub async fn resolve_cik(client: &EdgarClient, ticker: &Ticker) -> Result<String> {
    debug!("Resolving CIK for {}", ticker);
    let url = Url::parse(TICKER_URL)
        .map_err(|e| AnalyzerError::Upstream(format!("invalid ticker index URL: {}", e)))?;
    let entries: HashMap<String, TickerEntry> = client.get_json(&url).await?;

    entries
        .values()
        .find(|entry| entry.ticker.eq_ignore_ascii_case(ticker.as_str()))
        .map(|entry| format!("{:010}", entry.cik_str))
        .ok_or_else(|| AnalyzerError::InvalidTicker(ticker.to_string()))
}
