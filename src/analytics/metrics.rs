//! Metadata quality and upload performance counters.
//!
//! Both structs are persisted as JSON objects through [`crate::store::CacheFile`];
//! missing keys fall back to their defaults so older files keep loading.

use crate::config::MetricsConfig;
use crate::dates;
use crate::store::{Document, Shape};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Counter kinds tracked for generated metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataIssue {
    ParseFailure,
    Timeout,
    EmptyTitle,
    EmptyDescription,
    EmptyTags,
    TitleMismatch,
    TagListError,
    KeywordStuffing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSample {
    #[serde(rename = "type")]
    pub error_type: String,
    pub details: String,
    pub video_title: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataMetrics {
    pub total_api_calls: u64,
    pub parse_failures: u64,
    pub timeouts: u64,
    pub empty_title_errors: u64,
    pub empty_description_errors: u64,
    pub empty_tags_errors: u64,
    pub validation_title_mismatches: u64,
    pub validation_tag_list_errors: u64,
    pub validation_keyword_stuffing: u64,
    #[serde(with = "dates::lenient")]
    pub last_run_date: Option<NaiveDateTime>,
    /// Most recent first
    pub error_samples: Vec<ErrorSample>,
    pub total_api_calls_previous: u64,
    pub total_errors_previous: u64,
}

impl Default for MetadataMetrics {
    fn default() -> Self {
        Self {
            total_api_calls: 0,
            parse_failures: 0,
            timeouts: 0,
            empty_title_errors: 0,
            empty_description_errors: 0,
            empty_tags_errors: 0,
            validation_title_mismatches: 0,
            validation_tag_list_errors: 0,
            validation_keyword_stuffing: 0,
            last_run_date: Some(dates::now()),
            error_samples: Vec::new(),
            total_api_calls_previous: 0,
            total_errors_previous: 0,
        }
    }
}

impl Document for MetadataMetrics {
    const SHAPE: Shape = Shape::Object;
}

/// Per-call rates in `[0, 1]`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ErrorRates {
    pub parse_failure_rate: f64,
    pub timeout_rate: f64,
    pub empty_description_rate: f64,
    pub empty_tags_rate: f64,
    pub title_mismatch_rate: f64,
    pub tag_list_error_rate: f64,
    pub keyword_stuffing_rate: f64,
    pub overall_error_rate: f64,
}

/// First rate found at or above its threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityIssue {
    pub reason: MetadataIssue,
    pub rate: f64,
}

impl fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.reason {
            MetadataIssue::ParseFailure => "Parse Failures",
            MetadataIssue::Timeout => "Timeouts",
            MetadataIssue::EmptyTitle => "Empty Titles",
            MetadataIssue::EmptyDescription => "Empty Descriptions",
            MetadataIssue::EmptyTags => "Empty Tags",
            MetadataIssue::TitleMismatch => "Title Mismatches",
            MetadataIssue::TagListError => "Tag List Errors",
            MetadataIssue::KeywordStuffing => "Keyword Stuffing",
        };
        write!(f, "{} ({:.1}%)", reason, self.rate * 100.0)
    }
}

impl MetadataMetrics {
    pub fn record_api_call(&mut self) {
        self.total_api_calls += 1;
    }

    pub fn record_issue(&mut self, issue: MetadataIssue) {
        let counter = match issue {
            MetadataIssue::ParseFailure => &mut self.parse_failures,
            MetadataIssue::Timeout => &mut self.timeouts,
            MetadataIssue::EmptyTitle => &mut self.empty_title_errors,
            MetadataIssue::EmptyDescription => &mut self.empty_description_errors,
            MetadataIssue::EmptyTags => &mut self.empty_tags_errors,
            MetadataIssue::TitleMismatch => &mut self.validation_title_mismatches,
            MetadataIssue::TagListError => &mut self.validation_tag_list_errors,
            MetadataIssue::KeywordStuffing => &mut self.validation_keyword_stuffing,
        };
        *counter += 1;
    }

    /// Keep an example of a failure, newest first, at most `max_samples`
    pub fn add_error_sample(
        &mut self,
        error_type: impl Into<String>,
        details: impl Into<String>,
        video_title: impl Into<String>,
        max_samples: usize,
    ) {
        self.error_samples.insert(
            0,
            ErrorSample {
                error_type: error_type.into(),
                details: details.into(),
                video_title: video_title.into(),
                timestamp: dates::format_iso(&dates::now()),
            },
        );
        self.error_samples.truncate(max_samples);
    }

    /// Hard failures; validation warnings are not counted
    pub fn total_errors(&self) -> u64 {
        self.parse_failures
            + self.timeouts
            + self.empty_title_errors
            + self.empty_description_errors
            + self.empty_tags_errors
    }

    pub fn error_rates(&self) -> ErrorRates {
        if self.total_api_calls == 0 {
            return ErrorRates::default();
        }
        let calls = self.total_api_calls as f64;
        let rate = |count: u64| count as f64 / calls;

        ErrorRates {
            parse_failure_rate: rate(self.parse_failures),
            timeout_rate: rate(self.timeouts),
            empty_description_rate: rate(self.empty_description_errors),
            empty_tags_rate: rate(self.empty_tags_errors),
            title_mismatch_rate: rate(self.validation_title_mismatches),
            tag_list_error_rate: rate(self.validation_tag_list_errors),
            keyword_stuffing_rate: rate(self.validation_keyword_stuffing),
            overall_error_rate: rate(self.total_errors()),
        }
    }

    /// Check rates against the configured percentage thresholds, in priority order
    pub fn quality_issue(&self, config: &MetricsConfig) -> Option<QualityIssue> {
        if self.total_api_calls == 0 {
            return None;
        }
        let rates = self.error_rates();
        let error = config.error_threshold_percent / 100.0;
        let timeout = config.timeout_threshold_percent / 100.0;
        let validation = config.validation_warning_threshold_percent / 100.0;

        let checks = [
            (MetadataIssue::ParseFailure, rates.parse_failure_rate, error),
            (MetadataIssue::Timeout, rates.timeout_rate, timeout),
            (MetadataIssue::EmptyDescription, rates.empty_description_rate, error),
            (MetadataIssue::EmptyTags, rates.empty_tags_rate, error),
            (MetadataIssue::TitleMismatch, rates.title_mismatch_rate, validation),
            (MetadataIssue::TagListError, rates.tag_list_error_rate, validation),
            (MetadataIssue::KeywordStuffing, rates.keyword_stuffing_rate, validation),
        ];

        let issue = checks
            .into_iter()
            .find(|(_, rate, threshold)| rate >= threshold)
            .map(|(reason, rate, _)| QualityIssue { reason, rate });

        if let Some(issue) = &issue {
            warn!("Metadata quality issue detected: {}", issue);
        }
        issue
    }

    /// True when this window's error rate is above the previous window's
    pub fn regressed_since_previous(&self) -> bool {
        if self.total_api_calls == 0 || self.total_api_calls_previous == 0 {
            return false;
        }
        let current = self.total_errors() as f64 / self.total_api_calls as f64;
        let previous = self.total_errors_previous as f64 / self.total_api_calls_previous as f64;
        current > previous
    }

    /// Move the current totals into the `_previous` fields and reset the counters
    pub fn roll_window(&mut self) {
        let samples = std::mem::take(&mut self.error_samples);
        *self = Self {
            total_api_calls_previous: self.total_api_calls,
            total_errors_previous: self.total_errors(),
            error_samples: samples,
            ..Self::default()
        };
        debug!(
            previous_calls = self.total_api_calls_previous,
            previous_errors = self.total_errors_previous,
            "Rolled metadata metrics window"
        );
    }

    pub fn touch(&mut self) {
        self.last_run_date = Some(dates::now());
    }
}

/// A published video's engagement numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoPerformance {
    pub video_id: String,
    pub title: String,
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl VideoPerformance {
    pub fn new(video_id: impl Into<String>, title: impl Into<String>, views: u64, likes: u64, comments: u64) -> Self {
        Self {
            video_id: video_id.into(),
            title: title.into(),
            views,
            likes,
            comments,
            upload_date: None,
            last_updated: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceMetrics {
    pub total_uploads: u64,
    pub successful_uploads: u64,
    pub failed_uploads: u64,
    pub success_rate: f64,
    pub average_views: f64,
    pub average_likes: f64,
    pub average_comments: f64,
    /// Sorted by views, highest first
    pub top_performing_videos: Vec<VideoPerformance>,
    pub error_counts: BTreeMap<String, u64>,
    #[serde(with = "dates::lenient")]
    pub last_run_date: Option<NaiveDateTime>,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            total_uploads: 0,
            successful_uploads: 0,
            failed_uploads: 0,
            success_rate: 0.0,
            average_views: 0.0,
            average_likes: 0.0,
            average_comments: 0.0,
            top_performing_videos: Vec::new(),
            error_counts: BTreeMap::new(),
            last_run_date: Some(dates::now()),
        }
    }
}

impl Document for PerformanceMetrics {
    const SHAPE: Shape = Shape::Object;
}

impl PerformanceMetrics {
    fn refresh_success_rate(&mut self) {
        self.success_rate = if self.total_uploads > 0 {
            self.successful_uploads as f64 / self.total_uploads as f64
        } else {
            0.0
        };
    }

    pub fn record_upload(&mut self, success: bool, error_type: Option<&str>) {
        self.total_uploads += 1;
        if success {
            self.successful_uploads += 1;
        } else {
            self.failed_uploads += 1;
            if let Some(error_type) = error_type {
                *self.error_counts.entry(error_type.to_string()).or_insert(0) += 1;
            }
        }
        self.refresh_success_rate();
    }

    /// Fold a video's numbers into the moving averages and the top list.
    ///
    /// Averages only move once at least one upload has succeeded. A video
    /// already in the top list is replaced rather than duplicated.
    pub fn record_video(&mut self, mut video: VideoPerformance, config: &MetricsConfig) {
        if self.successful_uploads > 0 {
            let alpha = config.moving_average_alpha;
            let ema = |current: f64, new: u64| (1.0 - alpha) * current + alpha * new as f64;
            self.average_views = ema(self.average_views, video.views);
            self.average_likes = ema(self.average_likes, video.likes);
            self.average_comments = ema(self.average_comments, video.comments);
        }

        let now = dates::format_iso(&dates::now());
        if video.upload_date.is_none() {
            video.upload_date = Some(now.clone());
        }
        video.last_updated = Some(now);

        match self
            .top_performing_videos
            .iter_mut()
            .find(|v| v.video_id == video.video_id)
        {
            Some(existing) => *existing = video,
            None => self.top_performing_videos.push(video),
        }

        self.top_performing_videos.sort_by(|a, b| b.views.cmp(&a.views));
        self.top_performing_videos.truncate(config.top_videos);
    }

    pub fn touch(&mut self) {
        self.last_run_date = Some(dates::now());
        self.refresh_success_rate();
    }
}
