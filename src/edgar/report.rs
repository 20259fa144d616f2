use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use strum::{EnumIter, IntoEnumIterator};

/// SEC form types this tool knows how to summarize. Anything else is carried
/// through as `Other` so index rows never fail to deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(try_from = "String")]
pub enum ReportType {
    Form10K,
    Form10Q,
    Form8K,
    Form20F,
    Form6K,
    FormS1,
    FormDEF14A,
    Other(String),
}

impl TryFrom<String> for ReportType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ReportType::from_str(&s)
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportType::Form10K => write!(f, "10-K"),
            ReportType::Form10Q => write!(f, "10-Q"),
            ReportType::Form8K => write!(f, "8-K"),
            ReportType::Form20F => write!(f, "20-F"),
            ReportType::Form6K => write!(f, "6-K"),
            ReportType::FormS1 => write!(f, "S-1"),
            ReportType::FormDEF14A => write!(f, "DEF 14A"),
            ReportType::Other(s) => write!(f, "{}", s),
        }
    }
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<ReportType, String> {
        match s.trim().to_uppercase().as_str() {
            "10-K" => Ok(ReportType::Form10K),
            "10-Q" => Ok(ReportType::Form10Q),
            "8-K" => Ok(ReportType::Form8K),
            "20-F" => Ok(ReportType::Form20F),
            "6-K" => Ok(ReportType::Form6K),
            "S-1" => Ok(ReportType::FormS1),
            "DEF 14A" => Ok(ReportType::FormDEF14A),
            other => Ok(ReportType::Other(other.to_string())),
        }
    }
}

static REPORT_TYPES: Lazy<String> = Lazy::new(|| {
    ReportType::iter()
        .filter(|t| !matches!(t, ReportType::Other(_)))
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
});

impl ReportType {
    pub fn list_types() -> &'static str {
        &REPORT_TYPES
    }
}
