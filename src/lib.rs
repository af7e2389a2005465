/// Shorts Autopilot - keyword engine and state files
///
/// Scores search keywords by how well they find publishable short-form
/// videos, picks the next keywords to try, and keeps the JSON state that
/// drives those decisions (score ledger, correlation cache, run metrics).

pub mod analytics;
pub mod config;
pub mod dates;
pub mod keywords;
pub mod logging;
pub mod session;
pub mod source;
pub mod store;

// Re-export main types for easy access
pub use crate::config::{Config, ConfigBuilder};
pub use crate::keywords::{KeywordOutcome, KeywordScorer, KeywordSelector, ScoreLedger};
pub use crate::session::{KeywordSession, RunSummary};
pub use crate::source::{SearchErrorKind, SearchFailure, VideoCandidate, VideoSource};
pub use crate::store::{CacheFile, CleanupReport, CorrelationEntry, LoadOutcome, StoreError};
