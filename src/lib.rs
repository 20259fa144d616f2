pub mod chunk;
pub mod core;
pub mod edgar;
pub mod extract;
pub mod llm;
pub mod summarize;
pub mod utils;

// Re-exports
pub use crate::core::config::AnalyzerConfig;
pub use crate::core::error::AnalyzerError;
pub use crate::core::service::Analyzer;
pub use crate::summarize::SummaryResult;
