//! Keyword list, score ledger and selection

pub mod ledger;
pub mod list;
pub mod selector;

pub use ledger::{KeywordOutcome, KeywordScorer, ScoreLedger};
pub use list::{extract_keywords_from_text, load_keywords, merge_keywords, save_keywords};
pub use selector::{KeywordSelector, RankedKeyword};

/// Lowest score a keyword can hold
pub const MIN_KEYWORD_SCORE: f64 = 0.0;
/// Highest score a keyword can hold
pub const MAX_KEYWORD_SCORE: f64 = 100.0;
/// Score of a keyword that has never been searched
pub const DEFAULT_KEYWORD_SCORE: f64 = 50.0;
pub const SCORE_DECAY_FACTOR: f64 = 0.9;
pub const SCORE_BOOST_FACTOR: f64 = 1.2;
pub const NORMALIZATION_FACTOR: f64 = 0.8;
