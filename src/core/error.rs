use thiserror::Error;

/// Failure kinds surfaced by the summarization pipeline.
///
/// Locator and fetcher errors abort the run; the extractor never fails and
/// the summarizer absorbs per-chunk failures, escalating only on total loss.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("ticker does not resolve to a known SEC registrant: {0}")]
    InvalidTicker(String),

    #[error("no {form} filing found for {ticker}")]
    NotFound { ticker: String, form: String },

    #[error("EDGAR request failed: {0}")]
    Upstream(String),

    #[error("filing download failed: {0}")]
    Download(String),

    #[error("EDGAR throttled the request (status {0})")]
    RateLimited(u16),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("completion service error: {0}")]
    CompletionService(String),
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;

impl AnalyzerError {
    /// Stable kind name reported alongside the message on stderr.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalyzerError::InvalidTicker(_) => "InvalidTickerError",
            AnalyzerError::NotFound { .. } => "NotFoundError",
            AnalyzerError::Upstream(_) => "UpstreamError",
            AnalyzerError::Download(_) => "DownloadError",
            AnalyzerError::RateLimited(_) => "RateLimitError",
            AnalyzerError::Config(_) => "ConfigError",
            AnalyzerError::CompletionService(_) => "CompletionServiceError",
        }
    }
}
