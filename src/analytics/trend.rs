//! Multi-period view trends for a source channel

use super::{AnalyticsError, Result};
use crate::dates;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Percent change in average views beyond which a trend is called
const TREND_THRESHOLD_PERCENT: f64 = 5.0;
const LOW_ENGAGEMENT_RATIO: f64 = 0.01;
const HIGH_ENGAGEMENT_RATIO: f64 = 0.1;

/// Channel history as stored by the channel tracker
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelData {
    #[serde(default)]
    pub channel_url: Option<String>,

    #[serde(default)]
    pub videos: Vec<ChannelVideo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelVideo {
    #[serde(default)]
    pub video_id: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    /// Usually `YYYYMMDD`; any format `dates::parse_date` accepts works
    #[serde(default)]
    pub upload_date: Option<String>,

    #[serde(default)]
    pub view_count: Option<u64>,

    #[serde(default)]
    pub like_count: Option<u64>,

    #[serde(default)]
    pub comment_count: Option<u64>,
}

/// Totals and averages for the videos uploaded in one window
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PeriodStats {
    pub days: u32,
    pub videos: usize,
    pub total_views: u64,
    pub total_likes: u64,
    pub total_comments: u64,
    pub avg_views: f64,
    pub avg_likes: f64,
    pub avg_comments: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl TrendDirection {
    fn classify(percent: f64) -> Self {
        if percent > TREND_THRESHOLD_PERCENT {
            TrendDirection::Up
        } else if percent < -TREND_THRESHOLD_PERCENT {
            TrendDirection::Down
        } else {
            TrendDirection::Stable
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Up => write!(f, "up"),
            TrendDirection::Down => write!(f, "down"),
            TrendDirection::Stable => write!(f, "stable"),
        }
    }
}

/// Average-view change between a short window and the next longer one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub short_days: u32,
    pub long_days: u32,
    pub view_trend_percent: f64,
    pub direction: TrendDirection,
}

impl Trend {
    pub fn label(&self) -> String {
        format!("{}_days_vs_{}_days", self.short_days, self.long_days)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendReport {
    pub channel_url: String,
    pub total_videos: usize,
    /// One entry per requested window, shortest first
    pub periods: Vec<PeriodStats>,
    pub trends: Vec<Trend>,
    pub recommendations: Vec<String>,
}

impl TrendReport {
    pub fn period(&self, days: u32) -> Option<&PeriodStats> {
        self.periods.iter().find(|p| p.days == days)
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn period_stats(videos: &[(NaiveDateTime, &ChannelVideo)], days: u32, now: NaiveDateTime) -> PeriodStats {
    // No representable cutoff means the window covers every dated video
    let cutoff = now.checked_sub_signed(Duration::days(i64::from(days)));
    let in_window: Vec<&ChannelVideo> = videos
        .iter()
        .filter(|(uploaded, _)| cutoff.map_or(true, |c| *uploaded >= c))
        .map(|(_, video)| *video)
        .collect();

    if in_window.is_empty() {
        return PeriodStats {
            days,
            ..Default::default()
        };
    }

    let count = in_window.len();
    let total_views: u64 = in_window.iter().filter_map(|v| v.view_count).sum();
    let total_likes: u64 = in_window.iter().filter_map(|v| v.like_count).sum();
    let total_comments: u64 = in_window.iter().filter_map(|v| v.comment_count).sum();

    PeriodStats {
        days,
        videos: count,
        total_views,
        total_likes,
        total_comments,
        avg_views: round2(total_views as f64 / count as f64),
        avg_likes: round2(total_likes as f64 / count as f64),
        avg_comments: round2(total_comments as f64 / count as f64),
    }
}

/// Compare view averages across `periods` (days) ending at `now`.
///
/// Videos without a parseable upload date are ignored. Windows with no
/// videos produce no trend entries.
pub fn analyze_trend(data: &ChannelData, periods: &[u32], now: NaiveDateTime) -> Result<TrendReport> {
    if data.videos.is_empty() {
        return Err(AnalyticsError::NoChannelData);
    }

    let mut periods = periods.to_vec();
    periods.sort_unstable();
    periods.dedup();
    if periods.is_empty() {
        return Err(AnalyticsError::NoPeriods);
    }

    let dated: Vec<(NaiveDateTime, &ChannelVideo)> = data
        .videos
        .iter()
        .filter_map(|video| {
            let uploaded = video.upload_date.as_deref().and_then(dates::parse_date)?;
            Some((uploaded, video))
        })
        .collect();
    debug!(total = data.videos.len(), dated = dated.len(), "Analyzing channel videos");

    let stats: Vec<PeriodStats> = periods.iter().map(|days| period_stats(&dated, *days, now)).collect();

    let trends: Vec<Trend> = stats
        .windows(2)
        .filter(|pair| pair[0].videos > 0 && pair[1].videos > 0)
        .map(|pair| {
            let (short, long) = (&pair[0], &pair[1]);
            let percent = if long.avg_views > 0.0 {
                round2((short.avg_views / long.avg_views - 1.0) * 100.0)
            } else {
                0.0
            };
            Trend {
                short_days: short.days,
                long_days: long.days,
                view_trend_percent: percent,
                direction: TrendDirection::classify(percent),
            }
        })
        .collect();

    let mut recommendations = Vec::new();
    let recent = &stats[0];
    if recent.videos == 0 {
        recommendations.push(format!("Channel appears inactive in the last {} days", recent.days));
    }
    if recent.avg_views > 0.0 {
        let engagement = (recent.avg_likes + recent.avg_comments) / recent.avg_views;
        if engagement < LOW_ENGAGEMENT_RATIO {
            recommendations
                .push("Low engagement ratio. Consider channels with more audience interaction".to_string());
        } else if engagement > HIGH_ENGAGEMENT_RATIO {
            recommendations.push("High engagement ratio. This channel has an active audience".to_string());
        }
    }
    for trend in &trends {
        match trend.direction {
            TrendDirection::Up => recommendations.push(format!("Channel is trending upward ({})", trend.label())),
            TrendDirection::Down => {
                recommendations.push(format!("Channel is trending downward ({})", trend.label()))
            }
            TrendDirection::Stable => {}
        }
    }

    Ok(TrendReport {
        channel_url: data.channel_url.clone().unwrap_or_else(|| "Unknown".to_string()),
        total_videos: data.videos.len(),
        periods: stats,
        trends,
        recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 31).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn video(days_ago: i64, views: u64, likes: u64, comments: u64) -> ChannelVideo {
        let date = (now() - Duration::days(days_ago)).format("%Y%m%d").to_string();
        ChannelVideo {
            upload_date: Some(date),
            view_count: Some(views),
            like_count: Some(likes),
            comment_count: Some(comments),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_videos_is_an_error() {
        let result = analyze_trend(&ChannelData::default(), &[7, 30], now());
        assert!(matches!(result, Err(AnalyticsError::NoChannelData)));
    }

    #[test]
    fn test_upward_trend() {
        let data = ChannelData {
            channel_url: Some("https://example.com/@chan".to_string()),
            videos: vec![video(2, 3000, 20, 1), video(20, 1000, 10, 0), video(60, 500, 1, 0)],
        };

        let report = analyze_trend(&data, &[7, 30, 90], now()).unwrap();

        let week = report.period(7).unwrap();
        assert_eq!(week.videos, 1);
        assert_eq!(week.avg_views, 3000.0);

        let month = report.period(30).unwrap();
        assert_eq!(month.videos, 2);
        assert_eq!(month.avg_views, 2000.0);

        assert_eq!(report.trends.len(), 2);
        assert_eq!(report.trends[0].view_trend_percent, 50.0);
        assert_eq!(report.trends[0].direction, TrendDirection::Up);
        assert!(report
            .recommendations
            .contains(&"Channel is trending upward (7_days_vs_30_days)".to_string()));
    }

    #[test]
    fn test_inactive_channel_and_unsorted_periods() {
        let data = ChannelData {
            channel_url: None,
            videos: vec![video(40, 100, 0, 0), video(50, 100, 0, 0)],
        };

        let report = analyze_trend(&data, &[90, 7, 30], now()).unwrap();

        assert_eq!(report.channel_url, "Unknown");
        assert_eq!(report.periods.iter().map(|p| p.days).collect::<Vec<_>>(), vec![7, 30, 90]);
        assert!(report.trends.is_empty());
        assert_eq!(report.recommendations, vec!["Channel appears inactive in the last 7 days"]);
    }

    #[test]
    fn test_engagement_recommendations() {
        let low = ChannelData {
            channel_url: None,
            videos: vec![video(1, 10_000, 5, 5)],
        };
        let report = analyze_trend(&low, &[7], now()).unwrap();
        assert!(report.recommendations[0].starts_with("Low engagement"));

        let high = ChannelData {
            channel_url: None,
            videos: vec![video(1, 100, 15, 5)],
        };
        let report = analyze_trend(&high, &[7], now()).unwrap();
        assert!(report.recommendations[0].starts_with("High engagement"));
    }

    #[test]
    fn test_stable_and_undated_videos() {
        let mut undated = video(1, 999_999, 0, 0);
        undated.upload_date = Some("not a date".to_string());

        let data = ChannelData {
            channel_url: None,
            videos: vec![video(1, 1020, 50, 0), video(10, 980, 50, 0), undated],
        };

        let report = analyze_trend(&data, &[7, 30], now()).unwrap();
        assert_eq!(report.total_videos, 3);
        assert_eq!(report.trends[0].direction, TrendDirection::Stable);
        assert_eq!(report.period(30).unwrap().total_views, 2000);
    }

    #[test]
    fn test_window_past_date_range_covers_all_dated_videos() {
        let mut undated = video(1, 5, 0, 0);
        undated.upload_date = None;
        let data = ChannelData {
            channel_url: None,
            videos: vec![video(2, 300, 3, 0), video(400, 100, 1, 0), undated],
        };

        let report = analyze_trend(&data, &[7, u32::MAX], now()).unwrap();

        assert_eq!(report.period(7).unwrap().videos, 1);
        let all = report.period(u32::MAX).unwrap();
        assert_eq!(all.videos, 2);
        assert_eq!(all.total_views, 400);
    }
}
