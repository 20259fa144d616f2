use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use crate::summarize::SummaryResult;

/// Writes the summary text and a metadata JSON next to it, under
/// `<output_dir>/<ticker>/`. Returns the path of the summary file.
pub fn save_results(output_dir: &Path, result: &SummaryResult) -> Result<PathBuf> {
    let ticker = result.reference.ticker.as_str();
    let dir = output_dir.join(ticker);
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create output directory {:?}", dir))?;

    let summary_path = dir.join(format!("{}_summary.txt", ticker));
    fs::write(&summary_path, &result.text)
        .with_context(|| format!("failed to write summary to {:?}", summary_path))?;

    let metadata = serde_json::json!({
        "ticker": ticker,
        "form": result.reference.form.to_string(),
        "cik": result.reference.cik,
        "accession_number": result.reference.accession_number,
        "filed_date": result.reference.filed_date.to_string(),
        "document_url": result.reference.document_url.to_string(),
        "chunk_count": result.chunk_count,
        "unavailable_chunks": result.unavailable_chunks,
        "generated_at": chrono::Local::now().to_rfc3339(),
    });
    let metadata_path = dir.join(format!("{}_summary_metadata.json", ticker));
    fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)
        .with_context(|| format!("failed to write metadata to {:?}", metadata_path))?;

    info!("Results saved to {:?}", dir);
    Ok(summary_path)
}
