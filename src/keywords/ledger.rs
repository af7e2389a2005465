//! Keyword score ledger: decay, boost and normalization of effectiveness scores

use crate::config::ScoringConfig;
use crate::dates;
use crate::store::{Document, Shape};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Persistent mapping of keyword to effectiveness score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreLedger {
    #[serde(default, with = "dates::lenient")]
    pub last_updated: Option<NaiveDateTime>,

    /// Sorted so the file diff stays stable between runs
    pub scores: BTreeMap<String, f64>,
}

impl Document for ScoreLedger {
    const SHAPE: Shape = Shape::Object;
}

impl Default for ScoreLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreLedger {
    pub fn new() -> Self {
        Self {
            last_updated: Some(dates::now()),
            scores: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Stored score, without the default applied
    pub fn get(&self, keyword: &str) -> Option<f64> {
        self.scores.get(keyword).copied()
    }

    /// Refresh `last_updated`; done right before every save
    pub fn touch(&mut self) {
        self.last_updated = Some(dates::now());
    }
}

/// What happened when a keyword was searched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordOutcome {
    Success { downloads: u64, views: u64 },
    Failure,
}

impl KeywordOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, KeywordOutcome::Success { .. })
    }
}

/// Applies the scoring rules to a [`ScoreLedger`]
#[derive(Debug, Clone, Default)]
pub struct KeywordScorer {
    config: ScoringConfig,
}

impl KeywordScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    fn clamp(&self, score: f64) -> f64 {
        score.clamp(self.config.min_score, self.config.max_score)
    }

    /// Score for `keyword`, or the default for unseen keywords
    pub fn score(&self, ledger: &ScoreLedger, keyword: &str) -> f64 {
        ledger.get(keyword).unwrap_or(self.config.default_score)
    }

    /// Multiplier for an outcome
    fn adjustment(&self, outcome: KeywordOutcome) -> f64 {
        match outcome {
            KeywordOutcome::Success { downloads, views } => {
                let download_boost =
                    (downloads as f64 * self.config.download_boost_step).min(self.config.download_boost_cap);
                let view_boost = (views as f64 / 10_000.0 * self.config.view_boost_step)
                    .min(self.config.view_boost_cap);
                self.config.boost_factor + download_boost + view_boost
            }
            KeywordOutcome::Failure => 1.0 / self.config.boost_factor,
        }
    }

    /// Score a success falls back to when the boost did not raise it
    fn success_floor(&self, original: f64) -> f64 {
        let lifted = self.clamp(original * self.config.success_floor_multiplier);
        if lifted > original {
            lifted
        } else {
            // Multiplying a score sitting on the lower bound cannot move it
            self.clamp(original + 1.0)
        }
    }

    /// Apply one outcome for `keyword` and decay every other keyword.
    ///
    /// Returns the keyword's new score. A success always raises the score
    /// unless it is already at the upper bound; a failure never raises it.
    pub fn update(&self, ledger: &mut ScoreLedger, keyword: &str, outcome: KeywordOutcome) -> f64 {
        let original = self.score(ledger, keyword);
        let mut new_score = self.clamp(original * self.adjustment(outcome));

        for (other, score) in ledger.scores.iter_mut() {
            if other != keyword {
                *score = self.clamp(*score * self.config.decay_factor);
            }
        }

        if outcome.is_success() && new_score <= original {
            new_score = self.success_floor(original);
        }

        ledger.scores.insert(keyword.to_string(), new_score);
        debug!(keyword, original, new_score, success = outcome.is_success(), "Updated keyword score");
        new_score
    }

    pub fn record_success(&self, ledger: &mut ScoreLedger, keyword: &str, downloads: u64, views: u64) -> f64 {
        self.update(ledger, keyword, KeywordOutcome::Success { downloads, views })
    }

    pub fn record_failure(&self, ledger: &mut ScoreLedger, keyword: &str) -> f64 {
        self.update(ledger, keyword, KeywordOutcome::Failure)
    }

    /// Rescale scores into the bounds, then pull them toward the default.
    ///
    /// Relative order is preserved. Equal (or no) scores come back unchanged.
    pub fn normalize(&self, scores: &BTreeMap<String, f64>) -> BTreeMap<String, f64> {
        let Some(min_score) = scores.values().copied().reduce(f64::min) else {
            return BTreeMap::new();
        };
        let max_score = scores.values().copied().fold(min_score, f64::max);

        if max_score == min_score {
            return scores.clone();
        }
        let range = max_score - min_score;

        let span = self.config.max_score - self.config.min_score;
        let default = self.config.default_score;

        scores
            .iter()
            .map(|(keyword, score)| {
                let scaled = self.config.min_score + (score - min_score) / range * span;
                let pulled = default + (scaled - default) * self.config.normalization_factor;
                (keyword.clone(), self.clamp(pulled))
            })
            .collect()
    }

    /// Normalize the ledger's scores in place
    pub fn normalize_ledger(&self, ledger: &mut ScoreLedger) {
        ledger.scores = self.normalize(&ledger.scores);
    }

    /// Bring a loaded ledger back inside the bounds.
    ///
    /// Out-of-range values are clamped and non-finite ones dropped. Returns
    /// how many entries were touched.
    pub fn sanitize(&self, ledger: &mut ScoreLedger) -> usize {
        let before = ledger.scores.len();
        ledger.scores.retain(|_, score| score.is_finite());
        let mut fixed = before - ledger.scores.len();

        for score in ledger.scores.values_mut() {
            let clamped = self.clamp(*score);
            if clamped != *score {
                *score = clamped;
                fixed += 1;
            }
        }

        if fixed > 0 {
            warn!("Repaired {} out-of-range keyword scores", fixed);
        }
        fixed
    }
}
