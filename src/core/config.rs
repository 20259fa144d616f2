use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use super::error::{AnalyzerError, Result};

/// SEC fair-access policy floor. Requests must not be issued more often.
const MIN_REQUEST_DELAY_MS: u64 = 100;

/// Process-wide configuration, built once at startup and passed by reference
/// into each component. No ambient globals.
#[derive(Clone, Debug)]
pub struct AnalyzerConfig {
    /// Contact identification sent as User-Agent on every EDGAR request.
    pub user_agent: String,
    /// Minimum delay between consecutive EDGAR requests.
    pub request_delay: Duration,
    /// Base URL of the local completion service.
    pub ollama_url: Url,
    pub model_name: String,
    pub temperature: f32,
    /// Context budget of the model, in characters of prompt text.
    pub max_context_length: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Wall-clock timeout applied to every network call.
    pub request_timeout: Duration,
    /// Concurrent in-flight chunk summarization requests.
    pub summary_workers: usize,
    pub output_dir: PathBuf,
}

impl AnalyzerConfig {
    pub fn from_env() -> Result<Self> {
        let user_agent = std::env::var("SEC_USER_AGENT").map_err(|_| {
            AnalyzerError::Config(
                "SEC_USER_AGENT must be set to a contact email; the SEC requires it".to_string(),
            )
        })?;

        let ollama_url: Url = env_or("OLLAMA_URL", "http://localhost:11434")?
            .parse()
            .map_err(|e| AnalyzerError::Config(format!("invalid OLLAMA_URL: {}", e)))?;

        let config = AnalyzerConfig {
            user_agent,
            request_delay: Duration::from_millis(parse_env("SEC_REQUEST_DELAY_MS", 100)?),
            ollama_url,
            model_name: env_or("MODEL_NAME", "llama3")?,
            temperature: parse_env("MODEL_TEMPERATURE", 0.3)?,
            max_context_length: parse_env("MAX_CONTEXT_LENGTH", 4096)?,
            chunk_size: parse_env("CHUNK_SIZE", 2000)?,
            chunk_overlap: parse_env("CHUNK_OVERLAP", 200)?,
            request_timeout: Duration::from_secs(parse_env("REQUEST_TIMEOUT_SECS", 120)?),
            summary_workers: parse_env("SUMMARY_WORKERS", 3)?,
            output_dir: PathBuf::from(env_or("OUTPUT_DIR", "data/summaries")?),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.user_agent.contains('@') {
            return Err(AnalyzerError::Config(
                "SEC_USER_AGENT must contain a contact email address".to_string(),
            ));
        }
        if self.request_delay < Duration::from_millis(MIN_REQUEST_DELAY_MS) {
            return Err(AnalyzerError::Config(format!(
                "SEC_REQUEST_DELAY_MS must be at least {}",
                MIN_REQUEST_DELAY_MS
            )));
        }
        if self.model_name.trim().is_empty() {
            return Err(AnalyzerError::Config("MODEL_NAME cannot be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AnalyzerError::Config(format!(
                "MODEL_TEMPERATURE must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        if self.chunk_size == 0 {
            return Err(AnalyzerError::Config("CHUNK_SIZE must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AnalyzerError::Config(format!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.max_context_length == 0 {
            return Err(AnalyzerError::Config(
                "MAX_CONTEXT_LENGTH must be positive".to_string(),
            ));
        }
        if self.summary_workers == 0 {
            return Err(AnalyzerError::Config(
                "SUMMARY_WORKERS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> Result<String> {
    Ok(std::env::var(key).unwrap_or_else(|_| default.to_string()))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AnalyzerError::Config(format!("invalid {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}
