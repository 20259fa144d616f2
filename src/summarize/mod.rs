//! Map-reduce summarization over document chunks.
//!
//! Single-chunk documents get one direct request. Larger documents are
//! summarized per chunk (bounded concurrency, order preserved), combined, and
//! reduced again while the combined text exceeds the context budget, then
//! synthesized into one final report. Per-chunk failures degrade to sentinel
//! notes; only total failure aborts the run.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::{info, warn};

use crate::chunk::{chunk_text, Chunk};
use crate::core::config::AnalyzerConfig;
use crate::core::error::{AnalyzerError, Result};
use crate::edgar::locator::FilingReference;
use crate::llm::CompletionService;
use crate::utils::retry::RetryPolicy;

/// Safety valve for the reduction loop: a model that refuses to shorten its
/// input would otherwise cycle forever.
const MAX_REDUCTION_PASSES: usize = 3;

/// Terminal artifact of a run. `chunk_count` includes unavailable chunks so
/// callers can judge completeness.
#[derive(Debug, Clone)]
pub struct SummaryResult {
    pub reference: FilingReference,
    pub text: String,
    pub chunk_count: usize,
    /// Zero-based indices of chunks whose summaries were replaced by
    /// sentinels.
    pub unavailable_chunks: Vec<usize>,
}

impl SummaryResult {
    pub fn is_complete(&self) -> bool {
        self.unavailable_chunks.is_empty()
    }
}

pub struct Summarizer {
    service: Arc<dyn CompletionService>,
    workers: usize,
    max_context: usize,
    chunk_size: usize,
    chunk_overlap: usize,
    retry: RetryPolicy,
}

impl Summarizer {
    pub fn new(config: &AnalyzerConfig, service: Arc<dyn CompletionService>) -> Self {
        Summarizer {
            service,
            workers: config.summary_workers,
            max_context: config.max_context_length,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
            retry: RetryPolicy::new(2, config.request_delay),
        }
    }

    pub async fn summarize(
        &self,
        reference: &FilingReference,
        chunks: &[Chunk],
    ) -> Result<SummaryResult> {
        if chunks.is_empty() {
            return Err(AnalyzerError::Config(
                "nothing to summarize: no chunks provided".to_string(),
            ));
        }

        if chunks.len() == 1 {
            info!("Single-chunk document, summarizing directly");
            let prompt = self.filing_prompt(reference, &chunks[0].text);
            let text = self.complete_with_retry(&prompt).await?;
            return Ok(SummaryResult {
                reference: reference.clone(),
                text,
                chunk_count: 1,
                unavailable_chunks: vec![],
            });
        }

        info!(
            "Map phase: summarizing {} chunks with {} workers",
            chunks.len(),
            self.workers
        );
        let partials = self.map_chunks(reference, chunks).await;
        if partials.iter().all(Option::is_none) {
            return Err(AnalyzerError::CompletionService(format!(
                "all {} excerpt requests failed",
                chunks.len()
            )));
        }

        let unavailable: Vec<usize> = partials
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_none())
            .map(|(i, _)| i)
            .collect();
        let mut combined = combine_partials(&partials);

        // Reduce until the combined summaries fit the context budget.
        let mut passes = 0;
        while combined.chars().count() > self.max_context && passes < MAX_REDUCTION_PASSES {
            passes += 1;
            info!(
                "Combined summaries exceed context budget ({} chars), reduction pass {}",
                combined.chars().count(),
                passes
            );
            let rechunks = chunk_text(&combined, self.chunk_size, self.chunk_overlap)?;
            let reduced = self.map_chunks(reference, &rechunks).await;
            if reduced.iter().all(Option::is_none) {
                return Err(AnalyzerError::CompletionService(format!(
                    "all {} reduction requests failed",
                    rechunks.len()
                )));
            }
            combined = combine_partials(&reduced);
        }
        if combined.chars().count() > self.max_context {
            warn!("Combined summaries still over budget, truncating for synthesis");
            combined = combined.chars().take(self.max_context).collect();
        }

        info!("Reduce phase: synthesizing final report");
        let prompt = self.synthesis_prompt(reference, &combined);
        let mut text = match self.complete_with_retry(&prompt).await {
            Ok(text) => text,
            Err(err) => {
                // Partial completion beats total failure: fall back to the
                // combined excerpt summaries.
                warn!(
                    "Final synthesis failed after retry ({}), returning combined excerpt summaries",
                    err
                );
                combined
            }
        };

        if !unavailable.is_empty() {
            text.push_str("\n\n");
            let notes: Vec<String> = unavailable
                .iter()
                .map(|i| format!("[excerpt {} unavailable]", i + 1))
                .collect();
            text.push_str(&notes.join("\n"));
        }

        Ok(SummaryResult {
            reference: reference.clone(),
            text,
            chunk_count: chunks.len(),
            unavailable_chunks: unavailable,
        })
    }

    /// Summarizes each chunk independently, at most `workers` in flight.
    /// Results come back in chunk order; the collect is the join barrier the
    /// reduce phase waits on. A chunk is `None` after its retry also failed.
    async fn map_chunks(
        &self,
        reference: &FilingReference,
        chunks: &[Chunk],
    ) -> Vec<Option<String>> {
        let jobs = chunks.iter().map(|chunk| {
            let prompt = self.excerpt_prompt(reference, &chunk.text);
            let excerpt = chunk.index + 1;
            async move {
                match self.complete_with_retry(&prompt).await {
                    Ok(text) => Some(text),
                    Err(err) => {
                        warn!("excerpt {} unavailable after retry: {}", excerpt, err);
                        None
                    }
                }
            }
        });
        stream::iter(jobs).buffered(self.workers).collect().await
    }

    async fn complete_with_retry(&self, prompt: &str) -> Result<String> {
        self.retry
            .run(
                || self.service.complete(prompt),
                |err| matches!(err, AnalyzerError::CompletionService(_)),
            )
            .await
    }

    fn filing_prompt(&self, reference: &FilingReference, text: &str) -> String {
        format!(
            "You are a financial analyst. The following is the text of a {} filing for {}. \
             Summarize this filing: cover the key figures, business performance, risk factors, \
             and outlook it describes.\n\nFILING TEXT:\n---\n{}\n---\n\nSUMMARY:",
            reference.form, reference.ticker, text
        )
    }

    fn excerpt_prompt(&self, reference: &FilingReference, text: &str) -> String {
        format!(
            "You are a financial analyst. The following is an independent excerpt from a larger \
             {} filing for {}. Summarize this excerpt, preserving any concrete figures or dates \
             it contains. Do not add introductions or conclusions.\n\nEXCERPT:\n---\n{}\n---\n\n\
             CONCISE SUMMARY OF THIS EXCERPT:",
            reference.form, reference.ticker, text
        )
    }

    fn synthesis_prompt(&self, reference: &FilingReference, combined: &str) -> String {
        format!(
            "You are a lead financial analyst. You have been given summaries of sequential \
             excerpts from a {} filing for {}. Synthesize a coherent overview from these excerpt \
             summaries: connect the key data points and present the company's performance, risks, \
             and outlook as one flowing narrative.\n\nEXCERPT SUMMARIES:\n---\n{}\n---\n\n\
             FINAL REPORT:",
            reference.form, reference.ticker, combined
        )
    }
}

/// Concatenates partial summaries in chunk order, substituting the sentinel
/// note for unavailable ones.
fn combine_partials(partials: &[Option<String>]) -> String {
    partials
        .iter()
        .enumerate()
        .map(|(i, partial)| match partial {
            Some(text) => format!("Summary of excerpt {}:\n{}", i + 1, text),
            None => format!("[excerpt {} unavailable]", i + 1),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;
    use url::Url;

    use crate::edgar::report::ReportType;
    use crate::edgar::tickers::Ticker;

    struct MockService {
        prompts: Mutex<Vec<String>>,
        response: String,
        fail_when_contains: Option<&'static str>,
    }

    impl MockService {
        fn returning(response: &str) -> Self {
            MockService {
                prompts: Mutex::new(vec![]),
                response: response.to_string(),
                fail_when_contains: None,
            }
        }

        fn failing_on(response: &str, marker: &'static str) -> Self {
            MockService {
                prompts: Mutex::new(vec![]),
                response: response.to_string(),
                fail_when_contains: Some(marker),
            }
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionService for MockService {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if let Some(marker) = self.fail_when_contains {
                if prompt.contains(marker) {
                    return Err(AnalyzerError::CompletionService("mock failure".to_string()));
                }
            }
            Ok(self.response.clone())
        }
    }

    fn test_config() -> AnalyzerConfig {
        AnalyzerConfig {
            user_agent: "analyst@example.com".to_string(),
            request_delay: Duration::from_millis(100),
            ollama_url: Url::parse("http://localhost:11434").unwrap(),
            model_name: "llama3".to_string(),
            temperature: 0.3,
            max_context_length: 100_000,
            chunk_size: 2000,
            chunk_overlap: 200,
            request_timeout: Duration::from_secs(5),
            summary_workers: 2,
            output_dir: PathBuf::from("data/summaries"),
        }
    }

    fn test_reference() -> FilingReference {
        FilingReference {
            ticker: Ticker::new("MSFT").unwrap(),
            form: ReportType::Form10K,
            cik: "0000789019".to_string(),
            accession_number: "0000950170-24-087843".to_string(),
            filed_date: NaiveDate::from_ymd_opt(2024, 7, 30).unwrap(),
            document_url: Url::parse(
                "https://www.sec.gov/Archives/edgar/data/789019/000095017024087843/msft.htm",
            )
            .unwrap(),
        }
    }

    fn chunk(index: usize, text: &str) -> Chunk {
        Chunk {
            index,
            text: text.to_string(),
            start: index * 100,
            end: index * 100 + text.chars().count(),
        }
    }

    #[tokio::test]
    async fn single_chunk_issues_one_request_and_returns_it_verbatim() {
        let service = Arc::new(MockService::returning("  the summary, verbatim \n"));
        let summarizer = Summarizer::new(&test_config(), service.clone());
        let chunks = vec![chunk(0, "A short filing body.")];

        let result = summarizer.summarize(&test_reference(), &chunks).await.unwrap();

        assert_eq!(result.text, "  the summary, verbatim \n");
        assert_eq!(result.chunk_count, 1);
        assert!(result.is_complete());
        assert_eq!(service.calls(), 1);
    }

    #[tokio::test]
    async fn failed_chunk_is_replaced_by_sentinel() {
        let service = Arc::new(MockService::failing_on("partial summary", "BRAVO"));
        let summarizer = Summarizer::new(&test_config(), service.clone());
        let chunks = vec![
            chunk(0, "ALPHA revenue discussion"),
            chunk(1, "BRAVO risk discussion"),
            chunk(2, "CHARLIE outlook discussion"),
        ];

        let result = summarizer.summarize(&test_reference(), &chunks).await.unwrap();

        assert_eq!(result.chunk_count, 3);
        assert_eq!(result.unavailable_chunks, vec![1]);
        assert!(!result.text.is_empty());
        assert!(result.text.contains("[excerpt 2 unavailable]"));
        // chunk 1, chunk 2 twice (initial + retry), chunk 3, synthesis.
        assert_eq!(service.calls(), 5);
    }

    #[tokio::test]
    async fn all_chunks_failing_is_fatal() {
        let service = Arc::new(MockService::failing_on("unused", "EXCERPT:"));
        let summarizer = Summarizer::new(&test_config(), service);
        let chunks = vec![chunk(0, "first"), chunk(1, "second"), chunk(2, "third")];

        let result = summarizer.summarize(&test_reference(), &chunks).await;
        assert!(matches!(result, Err(AnalyzerError::CompletionService(_))));
    }

    #[tokio::test]
    async fn single_chunk_failure_after_retry_is_fatal() {
        let service = Arc::new(MockService::failing_on("unused", "FILING TEXT:"));
        let summarizer = Summarizer::new(&test_config(), service.clone());
        let chunks = vec![chunk(0, "only chunk")];

        let result = summarizer.summarize(&test_reference(), &chunks).await;
        assert!(matches!(result, Err(AnalyzerError::CompletionService(_))));
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test]
    async fn synthesis_failure_falls_back_to_combined_partials() {
        let service = Arc::new(MockService::failing_on("PARTIAL", "EXCERPT SUMMARIES:"));
        let summarizer = Summarizer::new(&test_config(), service);
        let chunks = vec![chunk(0, "first half"), chunk(1, "second half")];

        let result = summarizer.summarize(&test_reference(), &chunks).await.unwrap();

        assert!(result.text.contains("PARTIAL"));
        assert!(result.text.contains("Summary of excerpt 1"));
        assert_eq!(result.chunk_count, 2);
    }

    #[tokio::test]
    async fn oversized_combined_text_triggers_reduction_pass() {
        let long_partial = "figures and dates ".repeat(20);
        let service = Arc::new(MockService::returning(&long_partial));
        let mut config = test_config();
        config.max_context_length = 200;
        config.chunk_size = 150;
        config.chunk_overlap = 15;
        let summarizer = Summarizer::new(&config, service.clone());
        let chunks = vec![chunk(0, "first"), chunk(1, "second")];

        let result = summarizer.summarize(&test_reference(), &chunks).await.unwrap();

        assert!(!result.text.is_empty());
        assert_eq!(result.chunk_count, 2);
        // Two map requests, at least one reduction request, one synthesis.
        assert!(service.calls() > 3);
    }

    #[test]
    fn combine_preserves_chunk_order() {
        let partials = vec![
            Some("first".to_string()),
            None,
            Some("third".to_string()),
        ];
        let combined = combine_partials(&partials);
        let first = combined.find("first").unwrap();
        let sentinel = combined.find("[excerpt 2 unavailable]").unwrap();
        let third = combined.find("third").unwrap();
        assert!(first < sentinel && sentinel < third);
    }
}
