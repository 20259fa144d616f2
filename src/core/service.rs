use std::sync::Arc;

use log::info;

use crate::chunk::chunk_text;
use crate::core::config::AnalyzerConfig;
use crate::core::error::{AnalyzerError, Result};
use crate::edgar::client::EdgarClient;
use crate::edgar::locator;
use crate::edgar::report::ReportType;
use crate::edgar::tickers::Ticker;
use crate::edgar::{fetcher, FilingReference};
use crate::extract;
use crate::llm::{CompletionService, OllamaClient};
use crate::summarize::{Summarizer, SummaryResult};
use crate::utils::retry::RetryPolicy;

/// Wires the pipeline together: locate, fetch, extract, chunk, summarize.
/// Each step depends on the previous step's output, so the flow is strictly
/// sequential; only the summarizer fans out internally.
pub struct Analyzer {
    config: AnalyzerConfig,
    edgar: EdgarClient,
    summarizer: Summarizer,
    fetch_retry: RetryPolicy,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        let service = Arc::new(OllamaClient::new(&config)?);
        Self::with_service(config, service)
    }

    /// Seam for tests and alternative model servers.
    pub fn with_service(
        config: AnalyzerConfig,
        service: Arc<dyn CompletionService>,
    ) -> Result<Self> {
        config.validate()?;
        let edgar = EdgarClient::new(&config)?;
        let summarizer = Summarizer::new(&config, service);
        let fetch_retry = RetryPolicy::new(2, config.request_delay);
        Ok(Analyzer {
            config,
            edgar,
            summarizer,
            fetch_retry,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub async fn analyze(&self, ticker: &Ticker, form: &ReportType) -> Result<SummaryResult> {
        info!("Starting analysis for {} {}", ticker, form);

        let reference: FilingReference = locator::locate(&self.edgar, ticker, form).await?;
        info!(
            "Located {} filed {} ({})",
            reference.form, reference.filed_date, reference.accession_number
        );

        let raw = fetcher::fetch(&self.edgar, &reference, &self.fetch_retry).await?;
        let extracted = extract::extract(&raw);
        info!("Extracted {} sections", extracted.sections.len());
        // The raw body is dropped here; filings are never persisted.

        let text = extracted.full_text();
        if text.trim().is_empty() {
            return Err(AnalyzerError::Download(format!(
                "no visible text extracted from {}",
                reference.document_url
            )));
        }

        let chunks = chunk_text(&text, self.config.chunk_size, self.config.chunk_overlap)?;
        info!(
            "Split {} chars of filing text into {} chunks",
            text.chars().count(),
            chunks.len()
        );

        self.summarizer.summarize(&reference, &chunks).await
    }
}
