use crate::keywords::{KeywordScorer, ScoreLedger};
use serde::Serialize;

/// Highest scoring keywords, best first. Equal scores keep key order.
pub fn top_performers(ledger: &ScoreLedger, top_n: usize) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = ledger
        .scores
        .iter()
        .map(|(keyword, score)| (keyword.clone(), *score))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(top_n);
    ranked
}

/// Snapshot of a ledger for reports
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSummary {
    pub keywords: usize,
    pub mean_score: f64,
    /// Keywords that have drifted below the default score
    pub below_default: usize,
    pub top: Vec<(String, f64)>,
}

pub fn ledger_summary(ledger: &ScoreLedger, scorer: &KeywordScorer, top_n: usize) -> LedgerSummary {
    let keywords = ledger.len();
    let mean_score = if keywords == 0 {
        0.0
    } else {
        ledger.scores.values().sum::<f64>() / keywords as f64
    };
    let default = scorer.config().default_score;

    LedgerSummary {
        keywords,
        mean_score,
        below_default: ledger.scores.values().filter(|s| **s < default).count(),
        top: top_performers(ledger, top_n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> ScoreLedger {
        let mut ledger = ScoreLedger::new();
        for (k, v) in [("b", 70.0), ("a", 70.0), ("c", 20.0), ("d", 95.0)] {
            ledger.scores.insert(k.to_string(), v);
        }
        ledger
    }

    #[test]
    fn test_top_performers_order_and_truncation() {
        let top = top_performers(&ledger(), 3);
        let names: Vec<&str> = top.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["d", "a", "b"]);

        assert_eq!(top_performers(&ledger(), 10).len(), 4);
        assert!(top_performers(&ScoreLedger::new(), 5).is_empty());
    }

    #[test]
    fn test_ledger_summary() {
        let summary = ledger_summary(&ledger(), &KeywordScorer::default(), 2);
        assert_eq!(summary.keywords, 4);
        assert!((summary.mean_score - 63.75).abs() < 1e-9);
        assert_eq!(summary.below_default, 1);
        assert_eq!(summary.top.len(), 2);

        let empty = ledger_summary(&ScoreLedger::new(), &KeywordScorer::default(), 2);
        assert_eq!(empty.mean_score, 0.0);
    }
}
