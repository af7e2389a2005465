/// Array-shaped caches whose entries carry their own `added_timestamp`
use super::CacheFile;
use crate::dates;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

/// One entry of the upload correlation cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationEntry {
    /// Row index of the video in the downloads sheet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_index: Option<Value>,

    /// When the entry was added; kept as raw JSON so odd values survive a round trip
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_timestamp: Option<Value>,

    /// Everything else the producer stored
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl CorrelationEntry {
    /// New entry stamped with the current time
    pub fn new(video_index: impl Into<Value>) -> Self {
        Self::new_at(video_index, dates::now())
    }

    pub fn new_at(video_index: impl Into<Value>, added: NaiveDateTime) -> Self {
        Self {
            video_index: Some(video_index.into()),
            added_timestamp: Some(Value::String(dates::format_iso(&added))),
            payload: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Parsed `added_timestamp`, `None` when missing or unparseable
    pub fn added_at(&self) -> Option<NaiveDateTime> {
        self.added_timestamp
            .as_ref()
            .and_then(Value::as_str)
            .and_then(dates::parse_date)
    }

    fn describe(&self) -> String {
        self.video_index
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// Outcome of an age-based cleanup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Entries present before cleanup
    pub total: usize,
    /// Entries dropped for being older than the cutoff
    pub removed: usize,
    /// Entries kept because their timestamp was missing or unparseable
    pub invalid: usize,
    /// Whether the cleaned list was written back
    pub saved: bool,
    /// False only when a needed save failed
    pub success: bool,
}

impl CacheFile {
    /// Drop entries whose `added_timestamp` is older than `days_to_keep` days
    pub async fn cleanup_by_age(&self, days_to_keep: u32) -> CleanupReport {
        self.cleanup_by_age_at(days_to_keep, dates::now()).await
    }

    /// [`CacheFile::cleanup_by_age`] against an explicit reference time.
    ///
    /// Entries with ambiguous timestamps are always kept. The file is only
    /// rewritten when something was removed.
    pub async fn cleanup_by_age_at(&self, days_to_keep: u32, now: NaiveDateTime) -> CleanupReport {
        let entries: Vec<CorrelationEntry> = self.load(Vec::new()).await.into_value();
        let mut report = CleanupReport {
            total: entries.len(),
            success: true,
            ..Default::default()
        };

        if entries.is_empty() {
            info!(cache = %self.label(), "No entries to clean up");
            return report;
        }

        let mut kept = Vec::with_capacity(entries.len());

        for entry in entries {
            match entry.added_at() {
                Some(added) if dates::is_older_than_days(&added, days_to_keep, &now) => {
                    debug!(cache = %self.label(), entry = %entry.describe(), "Dropping expired entry");
                    report.removed += 1;
                }
                Some(_) => kept.push(entry),
                None => {
                    warn!(
                        cache = %self.label(),
                        entry = %entry.describe(),
                        "Missing or unparseable timestamp, keeping entry"
                    );
                    report.invalid += 1;
                    kept.push(entry);
                }
            }
        }

        if report.removed > 0 {
            if self.save(&kept).await {
                report.saved = true;
                info!(
                    cache = %self.label(),
                    "🧹 Removed {} of {} entries older than {} days",
                    report.removed,
                    report.total,
                    days_to_keep
                );
            } else {
                error!(cache = %self.label(), "Failed to save cleaned cache");
                report.success = false;
            }
        } else {
            info!(cache = %self.label(), "No old entries to remove (keeping all {})", report.total);
        }

        if report.invalid > 0 {
            warn!(
                cache = %self.label(),
                "Found {} entries with invalid or missing timestamps",
                report.invalid
            );
        }

        report
    }
}
