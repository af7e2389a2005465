//! Reporting over the ledger, channel history and run metrics

pub mod metrics;
pub mod performance;
pub mod trend;

pub use metrics::{ErrorRates, MetadataIssue, MetadataMetrics, PerformanceMetrics, QualityIssue, VideoPerformance};
pub use performance::{ledger_summary, top_performers, LedgerSummary};
pub use trend::{analyze_trend, ChannelData, ChannelVideo, PeriodStats, TrendDirection, TrendReport};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("No channel data available")]
    NoChannelData,

    #[error("No analysis periods given")]
    NoPeriods,
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Default windows (days) for trend analysis
pub const DEFAULT_TREND_PERIODS: [u32; 3] = [7, 30, 90];
