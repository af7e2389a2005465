use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use shorts_autopilot::config::PathsConfig;
use shorts_autopilot::store::scan_dir;
use shorts_autopilot::{logging, CacheFile, Config};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "cache-manager")]
#[command(about = "State file and cache maintenance utility")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the data directory from the configuration
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List JSON state files with age and validity
    List,
    /// Check whether a state file is present, fresh and parseable
    Validate {
        /// State file path
        file: PathBuf,
        /// Maximum age in days (defaults to cache.expiry_days)
        #[arg(long)]
        max_age_days: Option<u64>,
    },
    /// Drop expired entries from the upload correlation cache
    Cleanup {
        /// Days of entries to keep (defaults to cache.correlation_days_to_keep)
        #[arg(long)]
        days: Option<u32>,
    },
    /// Back up and delete a state file
    Clear {
        /// State file path
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = cli.data_dir {
        let keywords_file = config.paths.keywords_file.clone();
        config.paths = PathsConfig::under(dir);
        config.paths.keywords_file = keywords_file;
    }
    logging::init(&config.logging)?;

    match cli.command {
        Commands::List => {
            let statuses = scan_dir(&config.paths.data_dir, config.cache.expiry_days).await;

            if statuses.is_empty() {
                info!("📭 No state files found in {}", config.paths.data_dir.display());
                return Ok(());
            }

            info!("📚 Found {} state files:", statuses.len());
            for status in statuses {
                let state = if status.is_valid { "✅ Valid" } else { "❌ Stale or invalid" };
                let age = status
                    .age_days
                    .map(|d| format!("{} days old", d))
                    .unwrap_or_else(|| "age unknown".to_string());
                info!(
                    "  {} - {} bytes, {}, {}",
                    status.path.display(),
                    status.size_bytes,
                    age,
                    state
                );
            }
        }

        Commands::Validate { file, max_age_days } => {
            let max_age = max_age_days.unwrap_or(config.cache.expiry_days);
            let cache = CacheFile::new(&file);

            if cache.is_valid(max_age).await {
                info!("✅ {} is valid", file.display());
            } else {
                warn!("❌ {} is missing, empty, older than {} days or not valid JSON", file.display(), max_age);
                return Err(anyhow!("Invalid state file: {}", file.display()));
            }
        }

        Commands::Cleanup { days } => {
            let days = days.unwrap_or(config.cache.correlation_days_to_keep);
            let cache =
                CacheFile::new(&config.paths.correlation_cache_file).with_label("Correlation Cache");

            let report = cache.cleanup_by_age(days).await;
            if !report.success {
                return Err(anyhow!("Failed to save cleaned correlation cache"));
            }
            info!(
                "🗑️ Removed {} of {} entries ({} with invalid timestamps kept)",
                report.removed,
                report.total,
                report.invalid
            );
        }

        Commands::Clear { file } => {
            let cache = CacheFile::new(&file);
            if !cache.clear().await {
                return Err(anyhow!("Failed to clear {}", file.display()));
            }
            info!("🧹 Cleared {}", file.display());
        }
    }

    Ok(())
}
