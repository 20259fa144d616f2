pub mod ollama;

pub use ollama::OllamaClient;

use async_trait::async_trait;

use crate::core::error::Result;

/// One synchronous request/response call to a text-completion service. The
/// summarizer only depends on this seam, so any local model server can sit
/// behind it.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
