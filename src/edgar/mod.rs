//! EDGAR archive access: ticker resolution, filing lookup, and rate-limited
//! document download.

pub mod client;
pub mod fetcher;
pub mod locator;
pub mod rate_limit;
pub mod report;
pub mod tickers;

pub use client::EdgarClient;
pub use fetcher::{fetch, ContentType, RawDocument};
pub use locator::{locate, FilingReference};
pub use rate_limit::RateGate;
pub use report::ReportType;
pub use tickers::Ticker;
