use crate::keywords;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the keyword engine and its state files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Locations of state and input files
    pub paths: PathsConfig,

    /// Keyword score bounds and update tunables
    pub scoring: ScoringConfig,

    /// Keyword selection settings
    pub selection: SelectionConfig,

    /// Cache expiry settings
    pub cache: CacheConfig,

    /// Metadata quality and upload metrics settings
    pub metrics: MetricsConfig,

    /// Logging output
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding JSON state files
    pub data_dir: PathBuf,

    /// Plain-text keyword list, one per line
    pub keywords_file: PathBuf,

    /// Keyword score ledger
    pub scores_file: PathBuf,

    /// Upload correlation cache
    pub correlation_cache_file: PathBuf,

    /// Metadata generation metrics
    pub metadata_metrics_file: PathBuf,

    /// Upload performance metrics
    pub performance_metrics_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Lowest score a keyword can hold
    pub min_score: f64,

    /// Highest score a keyword can hold
    pub max_score: f64,

    /// Score assumed for keywords never seen before
    pub default_score: f64,

    /// Multiplier applied to every keyword not updated in a cycle
    pub decay_factor: f64,

    /// Base multiplier for a successful keyword
    pub boost_factor: f64,

    /// How much of the rescaled spread survives normalization (0..=1)
    pub normalization_factor: f64,

    /// Multiplier forced on a success that failed to raise the score
    pub success_floor_multiplier: f64,

    /// Extra boost per downloaded video
    pub download_boost_step: f64,

    /// Cap on the download boost
    pub download_boost_cap: f64,

    /// Extra boost per 10,000 views
    pub view_boost_step: f64,

    /// Cap on the view boost
    pub view_boost_cap: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Keywords to process per run
    pub keywords_per_run: usize,

    /// Multiplier applied to recently used keywords
    pub used_penalty: f64,

    /// The top `ceil(count / top_slice_divisor)` keywords are always taken
    pub top_slice_divisor: usize,

    /// Search results requested per keyword
    pub results_per_keyword: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Object caches older than this are treated as stale
    pub expiry_days: u64,

    /// Correlation entries older than this are dropped
    pub correlation_days_to_keep: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Content error rate (percent) that flags a metadata quality issue
    pub error_threshold_percent: f64,

    /// Timeout rate (percent) that flags a metadata quality issue
    pub timeout_threshold_percent: f64,

    /// Validation warning rate (percent) that flags a metadata quality issue
    pub validation_warning_threshold_percent: f64,

    /// Error samples kept in the metadata metrics file
    pub max_error_samples: usize,

    /// Weight of the newest video in the moving averages
    pub moving_average_alpha: f64,

    /// Top performing videos kept in the performance metrics file
    pub top_videos: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive (overridden by RUST_LOG)
    pub level: String,

    /// Log file path; logs go to stderr when unset
    pub log_file: Option<PathBuf>,

    /// Emit ANSI colors (ignored for file output)
    pub ansi: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        Self {
            keywords_file: PathBuf::from("config/keywords.txt"),
            scores_file: data_dir.join("keyword_scores.json"),
            correlation_cache_file: data_dir.join("upload_correlation_cache.json"),
            metadata_metrics_file: data_dir.join("metadata_metrics.json"),
            performance_metrics_file: data_dir.join("performance_metrics.json"),
            data_dir,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_score: keywords::MIN_KEYWORD_SCORE,
            max_score: keywords::MAX_KEYWORD_SCORE,
            default_score: keywords::DEFAULT_KEYWORD_SCORE,
            decay_factor: keywords::SCORE_DECAY_FACTOR,
            boost_factor: keywords::SCORE_BOOST_FACTOR,
            normalization_factor: keywords::NORMALIZATION_FACTOR,
            success_floor_multiplier: 1.1,
            download_boost_step: 0.1,
            download_boost_cap: 0.5,
            view_boost_step: 0.1,
            view_boost_cap: 0.5,
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            keywords_per_run: 5,
            used_penalty: 0.5,
            top_slice_divisor: 3,
            results_per_keyword: 10,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expiry_days: 7,
            correlation_days_to_keep: 7,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            error_threshold_percent: 5.0,
            timeout_threshold_percent: 3.0,
            validation_warning_threshold_percent: 5.0,
            max_error_samples: 20,
            moving_average_alpha: 0.3,
            top_videos: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
            ansi: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            scoring: ScoringConfig::default(),
            selection: SelectionConfig::default(),
            cache: CacheConfig::default(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the first config file found, else from the environment
    pub fn load() -> Result<Self> {
        let config_paths = ["shorts-autopilot.toml", "config/shorts-autopilot.toml"];

        for path in &config_paths {
            if Path::new(path).exists() {
                match Self::load_from(path) {
                    Ok(config) => {
                        tracing::info!("📄 Loaded configuration from: {}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {}: {:#}", path, e);
                    }
                }
            }
        }

        Self::from_env()
    }

    /// Load configuration from a specific TOML file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(data_dir) = std::env::var("SHORTS_AUTOPILOT_DATA_DIR") {
            config.paths = PathsConfig::under(PathBuf::from(data_dir));
        }

        if let Ok(keywords_file) = std::env::var("SHORTS_AUTOPILOT_KEYWORDS_FILE") {
            config.paths.keywords_file = PathBuf::from(keywords_file);
        }

        if let Ok(log_level) = std::env::var("SHORTS_AUTOPILOT_LOG_LEVEL") {
            config.logging.level = log_level;
        }

        if let Ok(count) = std::env::var("SHORTS_AUTOPILOT_KEYWORDS_PER_RUN") {
            config.selection.keywords_per_run = count
                .parse()
                .with_context(|| format!("Invalid SHORTS_AUTOPILOT_KEYWORDS_PER_RUN: {}", count))?;
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let config_str = toml::to_string_pretty(self)?;
        std::fs::write(path, config_str)?;
        tracing::info!("💾 Configuration saved to: {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let s = &self.scoring;

        if !(s.min_score < s.max_score) {
            return Err(anyhow!("min_score must be below max_score"));
        }

        if s.default_score < s.min_score || s.default_score > s.max_score {
            return Err(anyhow!("default_score must lie within [min_score, max_score]"));
        }

        if !(s.decay_factor > 0.0 && s.decay_factor <= 1.0) {
            return Err(anyhow!("decay_factor must be in (0, 1]"));
        }

        if s.boost_factor <= 1.0 {
            return Err(anyhow!("boost_factor must be greater than 1"));
        }

        if !(0.0..=1.0).contains(&s.normalization_factor) {
            return Err(anyhow!("normalization_factor must be in [0, 1]"));
        }

        if s.success_floor_multiplier <= 1.0 {
            return Err(anyhow!("success_floor_multiplier must be greater than 1"));
        }

        if self.selection.keywords_per_run == 0 {
            return Err(anyhow!("keywords_per_run must be greater than 0"));
        }

        if self.selection.top_slice_divisor == 0 {
            return Err(anyhow!("top_slice_divisor must be greater than 0"));
        }

        if !(0.0..=1.0).contains(&self.selection.used_penalty) {
            return Err(anyhow!("used_penalty must be in [0, 1]"));
        }

        if !(0.0..=1.0).contains(&self.metrics.moving_average_alpha) {
            return Err(anyhow!("moving_average_alpha must be in [0, 1]"));
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Shorts Autopilot Configuration:\n\
            - Data Directory: {}\n\
            - Keywords File: {}\n\
            - Score Bounds: [{}, {}] (default {})\n\
            - Decay / Boost: {} / {}\n\
            - Keywords Per Run: {}\n\
            - Cache Expiry: {} days",
            self.paths.data_dir.display(),
            self.paths.keywords_file.display(),
            self.scoring.min_score,
            self.scoring.max_score,
            self.scoring.default_score,
            self.scoring.decay_factor,
            self.scoring.boost_factor,
            self.selection.keywords_per_run,
            self.cache.expiry_days
        )
    }
}

impl PathsConfig {
    /// Default file names rooted at `data_dir`
    pub fn under(data_dir: PathBuf) -> Self {
        Self {
            keywords_file: PathsConfig::default().keywords_file,
            scores_file: data_dir.join("keyword_scores.json"),
            correlation_cache_file: data_dir.join("upload_correlation_cache.json"),
            metadata_metrics_file: data_dir.join("metadata_metrics.json"),
            performance_metrics_file: data_dir.join("performance_metrics.json"),
            data_dir,
        }
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_data_dir(mut self, dir: PathBuf) -> Self {
        let keywords_file = self.config.paths.keywords_file.clone();
        self.config.paths = PathsConfig::under(dir);
        self.config.paths.keywords_file = keywords_file;
        self
    }

    pub fn with_keywords_file(mut self, path: PathBuf) -> Self {
        self.config.paths.keywords_file = path;
        self
    }

    pub fn with_keywords_per_run(mut self, count: usize) -> Self {
        self.config.selection.keywords_per_run = count;
        self
    }

    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.config.scoring = scoring;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_cache_expiry_days(mut self, days: u64) -> Self {
        self.config.cache.expiry_days = days;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.scoring.default_score, 50.0);
        assert_eq!(config.scoring.decay_factor, 0.9);
        assert_eq!(config.scoring.boost_factor, 1.2);
        assert_eq!(config.selection.keywords_per_run, 5);
        assert_eq!(config.paths.scores_file, PathBuf::from("data/keyword_scores.json"));
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_data_dir(PathBuf::from("/tmp/state"))
            .with_keywords_per_run(8)
            .with_cache_expiry_days(3)
            .build();

        assert_eq!(config.selection.keywords_per_run, 8);
        assert_eq!(config.cache.expiry_days, 3);
        assert_eq!(
            config.paths.scores_file,
            PathBuf::from("/tmp/state/keyword_scores.json")
        );
        assert_eq!(config.paths.keywords_file, PathBuf::from("config/keywords.txt"));
    }

    #[test]
    fn test_builder_scoring_is_validated() {
        let config = ConfigBuilder::new()
            .with_scoring(ScoringConfig {
                decay_factor: 0.9,
                ..Default::default()
            })
            .build();
        assert_eq!(config.scoring.decay_factor, 0.9);
        assert_eq!(config.scoring.default_score, ScoringConfig::default().default_score);
        assert!(config.validate().is_ok());

        let config = ConfigBuilder::new()
            .with_scoring(ScoringConfig {
                boost_factor: 0.9,
                ..Default::default()
            })
            .build();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::default().validate().is_ok());

        let mut bad = Config::default();
        bad.scoring.default_score = 150.0;
        assert!(bad.validate().is_err());

        let mut bad = Config::default();
        bad.scoring.boost_factor = 0.9;
        assert!(bad.validate().is_err());

        let bad = ConfigBuilder::new().with_keywords_per_run(0).build();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shorts-autopilot.toml");
        std::fs::write(&path, "[selection]\nkeywords_per_run = 12\n\n[scoring]\ndecay_factor = 0.95\n")
            .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.selection.keywords_per_run, 12);
        assert_eq!(config.selection.used_penalty, 0.5);
        assert_eq!(config.scoring.decay_factor, 0.95);
        assert_eq!(config.scoring.max_score, 100.0);
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.toml");

        let config = ConfigBuilder::new().with_log_level("debug").build();
        config.save(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.logging.level, "debug");
        assert_eq!(loaded.cache.correlation_days_to_keep, 7);
    }
}
