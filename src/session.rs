//! One keyword-driven discovery run: select, search, score, persist

use crate::config::Config;
use crate::keywords::{self, KeywordOutcome, KeywordScorer, KeywordSelector, ScoreLedger};
use crate::source::{SearchErrorKind, VideoSource};
use crate::store::CacheFile;
use rand::Rng;
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

/// Result of searching a single keyword
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordResult {
    pub keyword: String,
    pub outcome: KeywordOutcome,
    pub new_score: f64,
    pub error: Option<SearchErrorKind>,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub selected: Vec<String>,
    pub results: Vec<KeywordResult>,
    pub successes: usize,
    pub failures: usize,
    pub error_counts: BTreeMap<SearchErrorKind, usize>,
    /// Whether the updated ledger reached disk
    pub saved: bool,
}

impl RunSummary {
    pub fn success_rate(&self) -> f64 {
        let total = self.successes + self.failures;
        if total == 0 {
            0.0
        } else {
            self.successes as f64 / total as f64
        }
    }
}

pub struct KeywordSession {
    config: Config,
    scorer: KeywordScorer,
    selector: KeywordSelector,
    ledger_file: CacheFile,
}

impl KeywordSession {
    pub fn new(config: Config) -> Self {
        let scorer = KeywordScorer::new(config.scoring.clone());
        let selector = KeywordSelector::new(config.selection.clone(), scorer.clone());
        let ledger_file = CacheFile::new(&config.paths.scores_file).with_label("Score Ledger");
        Self {
            config,
            scorer,
            selector,
            ledger_file,
        }
    }

    pub fn scorer(&self) -> &KeywordScorer {
        &self.scorer
    }

    pub fn selector(&self) -> &KeywordSelector {
        &self.selector
    }

    pub fn ledger_file(&self) -> &CacheFile {
        &self.ledger_file
    }

    /// Load the ledger, repairing out-of-range scores
    pub async fn load_ledger(&self) -> ScoreLedger {
        let mut ledger = self.ledger_file.load(ScoreLedger::new()).await.into_value();
        self.scorer.sanitize(&mut ledger);
        ledger
    }

    pub async fn save_ledger(&self, ledger: &mut ScoreLedger) -> bool {
        ledger.touch();
        self.ledger_file.save(ledger).await
    }

    /// Pick this run's keywords
    pub fn plan<R: Rng + ?Sized>(
        &self,
        keywords: &[String],
        ledger: &ScoreLedger,
        used: &HashSet<String>,
        rng: &mut R,
    ) -> Vec<String> {
        self.selector
            .select(keywords, ledger, self.config.selection.keywords_per_run, used, rng)
    }

    /// Search every selected keyword and score the outcome.
    ///
    /// A failing keyword is recorded and the run moves on.
    pub async fn execute(
        &self,
        source: &dyn VideoSource,
        ledger: &mut ScoreLedger,
        selected: Vec<String>,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        let max_results = self.config.selection.results_per_keyword;

        for keyword in &selected {
            info!("🔍 Searching keyword: {}", keyword);

            let (outcome, error) = match source.search(keyword, max_results).await {
                Ok(videos) if !videos.is_empty() => {
                    let views = videos.iter().filter_map(|v| v.view_count).sum();
                    let outcome = KeywordOutcome::Success {
                        downloads: videos.len() as u64,
                        views,
                    };
                    (outcome, None)
                }
                Ok(_) => {
                    info!("No results for keyword: {}", keyword);
                    (KeywordOutcome::Failure, Some(SearchErrorKind::NoResults))
                }
                Err(failure) => {
                    warn!("Search failed for '{}': {}", keyword, failure);
                    (KeywordOutcome::Failure, Some(failure.error))
                }
            };

            let new_score = self.scorer.update(ledger, keyword, outcome);
            if outcome.is_success() {
                summary.successes += 1;
            } else {
                summary.failures += 1;
            }
            if let Some(kind) = error {
                *summary.error_counts.entry(kind).or_insert(0) += 1;
            }

            summary.results.push(KeywordResult {
                keyword: keyword.clone(),
                outcome,
                new_score,
                error,
            });
        }

        summary.selected = selected;
        summary
    }

    /// Full run against the configured keyword list and ledger
    pub async fn run(&self, source: &dyn VideoSource, used: &HashSet<String>) -> RunSummary {
        let keywords = keywords::load_keywords(&self.config.paths.keywords_file).await;
        if keywords.is_empty() {
            warn!("No keywords available, nothing to search");
            return RunSummary::default();
        }

        let mut ledger = self.load_ledger().await;
        let selected = self.plan(&keywords, &ledger, used, &mut rand::rng());
        info!("🎯 Selected {} of {} keywords", selected.len(), keywords.len());

        let mut summary = self.execute(source, &mut ledger, selected).await;
        summary.saved = self.save_ledger(&mut ledger).await;

        info!(
            "✅ Run complete: {} succeeded, {} failed ({:.0}% success)",
            summary.successes,
            summary.failures,
            summary.success_rate() * 100.0
        );
        summary
    }
}
