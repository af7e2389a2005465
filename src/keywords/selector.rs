use super::ledger::{KeywordScorer, ScoreLedger};
use crate::config::SelectionConfig;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Picks the keywords to search in a run.
///
/// The strongest third is always taken; the rest is drawn by score-weighted
/// sampling without replacement so unscored keywords still get tried.
#[derive(Debug, Clone)]
pub struct KeywordSelector {
    config: SelectionConfig,
    scorer: KeywordScorer,
}

/// A keyword with the score used to rank it
#[derive(Debug, Clone, PartialEq)]
pub struct RankedKeyword {
    pub keyword: String,
    pub effective_score: f64,
}

impl KeywordSelector {
    pub fn new(config: SelectionConfig, scorer: KeywordScorer) -> Self {
        Self { config, scorer }
    }

    /// Number of keywords always taken from the top of the ranking
    pub fn top_slice_len(&self, count: usize) -> usize {
        count.div_ceil(self.config.top_slice_divisor.max(1))
    }

    /// Keywords by effective score, highest first. Ties keep input order.
    pub fn rank(&self, keywords: &[String], ledger: &ScoreLedger, used: &HashSet<String>) -> Vec<RankedKeyword> {
        let mut seen = HashSet::with_capacity(keywords.len());
        let mut ranked: Vec<RankedKeyword> = keywords
            .iter()
            .filter(|k| seen.insert(k.as_str()))
            .map(|keyword| {
                let mut effective_score = self.scorer.score(ledger, keyword);
                if used.contains(keyword) {
                    effective_score *= self.config.used_penalty;
                }
                RankedKeyword {
                    keyword: keyword.clone(),
                    effective_score,
                }
            })
            .collect();

        ranked.sort_by(|a, b| b.effective_score.total_cmp(&a.effective_score));
        ranked
    }

    /// Select `count` keywords (or all of them when fewer are available)
    pub fn select<R: Rng + ?Sized>(
        &self,
        keywords: &[String],
        ledger: &ScoreLedger,
        count: usize,
        used: &HashSet<String>,
        rng: &mut R,
    ) -> Vec<String> {
        let ranked = self.rank(keywords, ledger, used);
        let count = count.min(ranked.len());
        if count == 0 {
            return Vec::new();
        }

        let top_len = self.top_slice_len(count).min(count);
        let (top, remainder) = ranked.split_at(top_len);
        let mut selected: Vec<String> = top.iter().map(|r| r.keyword.clone()).collect();

        let wanted = count - top_len;
        if wanted > 0 {
            selected.extend(draw_weighted(remainder, wanted, rng));
        }

        debug!(
            selected = ?selected,
            top_slice = top_len,
            candidates = ranked.len(),
            "Selected keywords"
        );
        selected
    }
}

/// Weighted draw without replacement, falling back to a uniform shuffle
fn draw_weighted<R: Rng + ?Sized>(candidates: &[RankedKeyword], amount: usize, rng: &mut R) -> Vec<String> {
    let total: f64 = candidates.iter().map(|r| r.effective_score.max(0.0)).sum();
    let uniform = !(total > 0.0 && total.is_finite());

    let weighted = candidates.choose_multiple_weighted(&mut *rng, amount, |r| {
        if uniform {
            1.0
        } else {
            r.effective_score.max(0.0)
        }
    });

    let mut drawn: Vec<String> = match weighted {
        Ok(iter) => iter.map(|r| r.keyword.clone()).collect(),
        Err(e) => {
            warn!("Weighted selection failed, using random shuffle: {}", e);
            shuffled_draw(candidates, amount, rng)
        }
    };

    // Zero-weight candidates are never drawn; top up from the ranking
    if drawn.len() < amount {
        let taken: HashSet<String> = drawn.iter().cloned().collect();
        let missing = amount - drawn.len();
        drawn.extend(
            candidates
                .iter()
                .filter(|r| !taken.contains(&r.keyword))
                .take(missing)
                .map(|r| r.keyword.clone()),
        );
    }

    drawn
}

/// Uniform draw without replacement
fn shuffled_draw<R: Rng + ?Sized>(candidates: &[RankedKeyword], amount: usize, rng: &mut R) -> Vec<String> {
    let mut shuffled: Vec<&RankedKeyword> = candidates.iter().collect();
    shuffled.shuffle(rng);
    shuffled.into_iter().take(amount).map(|r| r.keyword.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn selector() -> KeywordSelector {
        KeywordSelector::new(SelectionConfig::default(), KeywordScorer::new(ScoringConfig::default()))
    }

    fn keywords(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("kw{}", i)).collect()
    }

    #[test]
    fn test_returns_min_count_unique_members() {
        let selector = selector();
        let all = keywords(12);
        let mut ledger = ScoreLedger::new();
        for (i, k) in all.iter().enumerate() {
            ledger.scores.insert(k.clone(), (i * 7 % 100) as f64);
        }

        let mut rng = StdRng::seed_from_u64(1);
        for count in 0..20 {
            let picked = selector.select(&all, &ledger, count, &HashSet::new(), &mut rng);
            assert_eq!(picked.len(), count.min(all.len()));

            let unique: HashSet<&String> = picked.iter().collect();
            assert_eq!(unique.len(), picked.len());
            assert!(picked.iter().all(|k| all.contains(k)));
        }
    }

    #[test]
    fn test_top_slice_is_deterministic() {
        let selector = selector();
        let all = keywords(10);
        let mut ledger = ScoreLedger::new();
        for (i, k) in all.iter().enumerate() {
            ledger.scores.insert(k.clone(), 10.0 * i as f64);
        }

        // ceil(5 / 3) = 2 strongest always lead
        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = selector.select(&all, &ledger, 5, &HashSet::new(), &mut rng);
            assert_eq!(&picked[..2], &["kw9".to_string(), "kw8".to_string()]);
        }
    }

    #[test]
    fn test_used_keywords_rank_below_equal_unused() {
        let selector = selector();
        let all = vec!["used".to_string(), "fresh".to_string(), "other".to_string()];
        let ledger = ScoreLedger::new();
        let used: HashSet<String> = ["used".to_string()].into_iter().collect();

        let mut leading_used = 0;
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picked = selector.select(&all, &ledger, 1, &used, &mut rng);
            if picked[0] == "used" {
                leading_used += 1;
            }
        }
        assert_eq!(leading_used, 0);
    }

    #[test]
    fn test_zero_scores_fall_back_to_uniform() {
        let selector = selector();
        let all = keywords(6);
        let mut ledger = ScoreLedger::new();
        for k in &all {
            ledger.scores.insert(k.clone(), 0.0);
        }

        let mut rng = StdRng::seed_from_u64(99);
        let picked = selector.select(&all, &ledger, 6, &HashSet::new(), &mut rng);
        let unique: HashSet<&String> = picked.iter().collect();
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn test_zero_weight_remainder_is_topped_up() {
        let selector = selector();
        let all = keywords(5);
        let mut ledger = ScoreLedger::new();
        ledger.scores.insert("kw0".to_string(), 80.0);
        ledger.scores.insert("kw1".to_string(), 40.0);
        for k in &all[2..] {
            ledger.scores.insert(k.clone(), 0.0);
        }

        let mut rng = StdRng::seed_from_u64(3);
        let picked = selector.select(&all, &ledger, 4, &HashSet::new(), &mut rng);
        assert_eq!(picked.len(), 4);
        assert_eq!(picked[0], "kw0");
        assert_eq!(picked[1], "kw1");
    }

    #[test]
    fn test_duplicates_are_collapsed() {
        let selector = selector();
        let all = vec!["a".to_string(), "b".to_string(), "a".to_string()];
        let mut rng = StdRng::seed_from_u64(5);

        let picked = selector.select(&all, &ScoreLedger::new(), 10, &HashSet::new(), &mut rng);
        assert_eq!(picked.len(), 2);
    }

    #[test]
    fn test_higher_scores_drawn_more_often() {
        let selector = selector();
        let all = keywords(4);
        let mut ledger = ScoreLedger::new();
        ledger.scores.insert("kw0".to_string(), 100.0);
        ledger.scores.insert("kw1".to_string(), 90.0);
        ledger.scores.insert("kw2".to_string(), 5.0);
        ledger.scores.insert("kw3".to_string(), 1.0);

        let mut strong = 0;
        let mut weak = 0;
        for seed in 0..500 {
            let mut rng = StdRng::seed_from_u64(seed);
            // Top slice takes kw0; the second pick is weighted among the rest
            let picked = selector.select(&all, &ledger, 2, &HashSet::new(), &mut rng);
            match picked[1].as_str() {
                "kw1" => strong += 1,
                "kw3" => weak += 1,
                _ => {}
            }
        }
        assert!(strong > weak * 5, "strong={} weak={}", strong, weak);
    }

    #[test]
    fn test_shuffled_draw_is_unique_and_bounded() {
        let candidates: Vec<RankedKeyword> = keywords(6)
            .into_iter()
            .map(|keyword| RankedKeyword {
                keyword,
                effective_score: f64::NAN,
            })
            .collect();
        let names: HashSet<&str> = candidates.iter().map(|r| r.keyword.as_str()).collect();

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let drawn = shuffled_draw(&candidates, 4, &mut rng);
            assert_eq!(drawn.len(), 4);
            assert_eq!(drawn.iter().collect::<HashSet<_>>().len(), 4);
            assert!(drawn.iter().all(|k| names.contains(k.as_str())));
        }

        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(shuffled_draw(&candidates, 10, &mut rng).len(), 6);
        assert!(shuffled_draw(&[], 3, &mut rng).is_empty());
    }

    #[test]
    fn test_empty_input() {
        let selector = selector();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(selector.select(&[], &ScoreLedger::new(), 5, &HashSet::new(), &mut rng).is_empty());
    }
}
