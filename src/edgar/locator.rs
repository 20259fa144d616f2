use chrono::NaiveDate;
use log::info;
use serde::Deserialize;
use url::Url;

use crate::core::error::{AnalyzerError, Result};
use crate::edgar::client::EdgarClient;
use crate::edgar::report::ReportType;
use crate::edgar::tickers::{self, Ticker};

pub const EDGAR_DATA_URL: &str = "https://data.sec.gov";
pub const EDGAR_ARCHIVES_URL: &str = "https://www.sec.gov/Archives/edgar/data";

/// Uniquely identifies one archived filing document. Immutable once resolved.
#[derive(Debug, Clone)]
pub struct FilingReference {
    pub ticker: Ticker,
    pub form: ReportType,
    pub cik: String,
    pub accession_number: String,
    pub filed_date: NaiveDate,
    pub document_url: Url,
}

#[derive(Debug, Deserialize)]
struct Submissions {
    filings: FilingsData,
}

#[derive(Debug, Deserialize)]
struct FilingsData {
    recent: RecentFilings,
}

/// EDGAR's submissions endpoint is column-oriented: parallel arrays indexed
/// by filing.
#[derive(Debug, Deserialize)]
pub(crate) struct RecentFilings {
    #[serde(rename = "accessionNumber")]
    pub accession_number: Vec<String>,
    #[serde(rename = "filingDate")]
    pub filing_date: Vec<NaiveDate>,
    #[serde(rename = "form")]
    pub form: Vec<ReportType>,
    #[serde(rename = "primaryDocument")]
    pub primary_document: Vec<String>,
}

/// Resolves a ticker and form type to the most recently filed matching
/// document.
pub async fn locate(
    client: &EdgarClient,
    ticker: &Ticker,
    form: &ReportType,
) -> Result<FilingReference> {
    let cik = tickers::resolve_cik(client, ticker).await?;
    let url = Url::parse(&format!("{}/submissions/CIK{}.json", EDGAR_DATA_URL, cik))
        .map_err(|e| AnalyzerError::Upstream(format!("invalid submissions URL: {}", e)))?;
    info!("Fetching filing index for {} (CIK {})", ticker, cik);

    let submissions: Submissions = client.get_json(&url).await?;
    let recent = &submissions.filings.recent;

    let index = select_latest(recent, form)?.ok_or_else(|| AnalyzerError::NotFound {
        ticker: ticker.to_string(),
        form: form.to_string(),
    })?;

    let accession_number = recent.accession_number[index].clone();
    let document_url = document_url(&cik, &accession_number, &recent.primary_document[index])?;

    Ok(FilingReference {
        ticker: ticker.clone(),
        form: form.clone(),
        cik,
        accession_number,
        filed_date: recent.filing_date[index],
        document_url,
    })
}

/// Picks the most recent filing of the requested form. Ties on filing date go
/// to the highest accession number, EDGAR's native ordering.
fn select_latest(recent: &RecentFilings, form: &ReportType) -> Result<Option<usize>> {
    let rows = recent.form.len();
    if recent.accession_number.len() != rows
        || recent.filing_date.len() != rows
        || recent.primary_document.len() != rows
    {
        return Err(AnalyzerError::Upstream(
            "malformed submissions index: filing columns have mismatched lengths".to_string(),
        ));
    }

    Ok((0..rows)
        .filter(|&i| recent.form[i] == *form)
        .max_by_key(|&i| (recent.filing_date[i], recent.accession_number[i].as_str())))
}

/// Builds the Archives URL for a filing's primary document. Filings without a
/// primary document fall back to the complete submission text file.
fn document_url(cik: &str, accession_number: &str, primary_document: &str) -> Result<Url> {
    let cik_short = cik.trim_start_matches('0');
    let raw = if primary_document.is_empty() {
        format!("{}/{}/{}.txt", EDGAR_ARCHIVES_URL, cik_short, accession_number)
    } else {
        format!(
            "{}/{}/{}/{}",
            EDGAR_ARCHIVES_URL,
            cik_short,
            accession_number.replace('-', ""),
            primary_document
        )
    };
    Url::parse(&raw)
        .map_err(|e| AnalyzerError::Upstream(format!("invalid document URL {}: {}", raw, e)))
}
