/// Boundary to the external search/download tool
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure categories reported by the search tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchErrorKind {
    NoResults,
    DownloadError,
    ExtractorError,
    UnsupportedError,
    GeoRestricted,
    UnexpectedError,
    FileNotFound,
}

impl SearchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchErrorKind::NoResults => "no_results",
            SearchErrorKind::DownloadError => "download_error",
            SearchErrorKind::ExtractorError => "extractor_error",
            SearchErrorKind::UnsupportedError => "unsupported_error",
            SearchErrorKind::GeoRestricted => "geo_restricted",
            SearchErrorKind::UnexpectedError => "unexpected_error",
            SearchErrorKind::FileNotFound => "file_not_found",
        }
    }
}

impl fmt::Display for SearchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{error}: {details}")]
pub struct SearchFailure {
    pub error: SearchErrorKind,
    pub details: String,
}

impl SearchFailure {
    pub fn new(error: SearchErrorKind, details: impl Into<String>) -> Self {
        Self {
            error,
            details: details.into(),
        }
    }
}

/// A video returned for a keyword search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoCandidate {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub duration_secs: Option<f64>,
    #[serde(default)]
    pub url: Option<String>,
}

#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Search for up to `max_results` videos matching `query`
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<VideoCandidate>, SearchFailure>;
}
