use log::{debug, info};

use crate::core::error::{AnalyzerError, Result};
use crate::edgar::client::EdgarClient;
use crate::edgar::locator::FilingReference;
use crate::utils::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Html,
    Xbrl,
    PlainText,
}

/// A downloaded filing body. Lives only until extraction; never persisted.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub reference: FilingReference,
    pub content_type: ContentType,
    pub body: String,
}

/// Downloads the filing document. A throttling response is retried once after
/// an exponential backoff; anything else fails the run immediately.
pub async fn fetch(
    client: &EdgarClient,
    reference: &FilingReference,
    retry: &RetryPolicy,
) -> Result<RawDocument> {
    info!(
        "Downloading {} {} from {}",
        reference.ticker, reference.accession_number, reference.document_url
    );

    let body = retry
        .run(
            || client.get_document(&reference.document_url),
            |err| matches!(err, AnalyzerError::RateLimited(_)),
        )
        .await?;

    if body.trim().is_empty() {
        return Err(AnalyzerError::Download(format!(
            "empty body from {}",
            reference.document_url
        )));
    }

    let content_type = classify(reference.document_url.path(), &body);
    debug!("Downloaded {} bytes, content type {:?}", body.len(), content_type);

    Ok(RawDocument {
        reference: reference.clone(),
        content_type,
        body,
    })
}

/// Classifies a document by URL extension, falling back to sniffing the body.
fn classify(path: &str, body: &str) -> ContentType {
    let path = path.to_ascii_lowercase();
    let head = body.trim_start();
    if path.ends_with(".xml") || head.starts_with("<?xml") {
        ContentType::Xbrl
    } else if path.ends_with(".htm") || path.ends_with(".html") || head.starts_with('<') {
        ContentType::Html
    } else {
        ContentType::PlainText
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension() {
        assert_eq!(classify("/a/b/filing.htm", "whatever"), ContentType::Html);
        assert_eq!(classify("/a/b/filing.xml", "<xbrl/>"), ContentType::Xbrl);
        assert_eq!(classify("/a/b/filing.txt", "plain words"), ContentType::PlainText);
    }

    #[test]
    fn sniffs_markup_in_text_files() {
        assert_eq!(
            classify("/a/b/filing.txt", "<html><body>hi</body></html>"),
            ContentType::Html
        );
        assert_eq!(
            classify("/a/b/filing.txt", "<?xml version=\"1.0\"?><xbrl/>"),
            ContentType::Xbrl
        );
    }
}
