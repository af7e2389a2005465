use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{info, warn};

use shorts_autopilot::analytics::{self, ChannelData, MetadataMetrics, PerformanceMetrics, DEFAULT_TREND_PERIODS};
use shorts_autopilot::keywords::{self, KeywordOutcome};
use shorts_autopilot::{dates, logging, CacheFile, Config, KeywordSession};

fn cli() -> Command {
    Command::new("shorts-autopilot")
        .version("0.1.0")
        .author("TigreRoll")
        .about("Keyword scoring and selection for short-form video discovery")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (TOML)")
                .global(true),
        )
        .arg(
            Arg::new("data-dir")
                .short('d')
                .long("data-dir")
                .value_name("DIR")
                .help("Directory holding the JSON state files")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("select")
                .about("Pick the keywords for the next run")
                .arg(
                    Arg::new("count")
                        .short('n')
                        .long("count")
                        .value_name("NUM")
                        .help("Number of keywords (defaults to keywords_per_run)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("used")
                        .short('u')
                        .long("used")
                        .value_name("KEYWORD")
                        .help("Recently used keyword (repeatable)")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .value_name("SEED")
                        .help("Seed for reproducible selection")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .subcommand(
            Command::new("record")
                .about("Record the outcome of searching a keyword")
                .arg(Arg::new("keyword").required(true).help("Keyword that was searched"))
                .arg(
                    Arg::new("failure")
                        .long("failure")
                        .help("The search found nothing usable")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("downloads")
                        .long("downloads")
                        .value_name("NUM")
                        .default_value("0")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("views")
                        .long("views")
                        .value_name("NUM")
                        .default_value("0")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .subcommand(Command::new("normalize").about("Rescale ledger scores toward the default"))
        .subcommand(
            Command::new("top")
                .about("Show the best performing keywords")
                .arg(
                    Arg::new("limit")
                        .short('n')
                        .long("limit")
                        .value_name("NUM")
                        .default_value("10")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("trend")
                .about("Analyze view trends from a channel history file")
                .arg(Arg::new("channel-file").required(true).value_name("FILE"))
                .arg(
                    Arg::new("periods")
                        .short('p')
                        .long("periods")
                        .value_name("DAYS")
                        .help("Comma-separated windows in days")
                        .value_delimiter(',')
                        .value_parser(clap::value_parser!(u32)),
                ),
        )
        .subcommand(Command::new("metrics").about("Report metadata quality and upload metrics"))
}

fn load_config(matches: &ArgMatches) -> Result<Config> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(dir) = matches.get_one::<String>("data-dir") {
        let keywords_file = config.paths.keywords_file.clone();
        config.paths = shorts_autopilot::config::PathsConfig::under(PathBuf::from(dir));
        config.paths.keywords_file = keywords_file;
    }

    if matches.get_flag("verbose") {
        config.logging.level = "debug".to_string();
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    let config = load_config(&matches)?;
    logging::init(&config.logging)?;

    tracing::debug!("{}", config.summary());

    match matches.subcommand() {
        Some(("select", sub)) => select(&config, sub).await,
        Some(("record", sub)) => record(&config, sub).await,
        Some(("normalize", _)) => normalize(&config).await,
        Some(("top", sub)) => top(&config, sub).await,
        Some(("trend", sub)) => trend(sub).await,
        Some(("metrics", _)) => metrics(&config).await,
        _ => Err(anyhow!("Unknown command")),
    }
}

async fn select(config: &Config, matches: &ArgMatches) -> Result<()> {
    let session = KeywordSession::new(config.clone());
    let keywords = keywords::load_keywords(&config.paths.keywords_file).await;
    if keywords.is_empty() {
        warn!("⚠️ No keywords in {}", config.paths.keywords_file.display());
        return Ok(());
    }

    let ledger = session.load_ledger().await;
    let used: HashSet<String> = matches
        .get_many::<String>("used")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let count = matches
        .get_one::<usize>("count")
        .copied()
        .unwrap_or(config.selection.keywords_per_run);

    let selected = match matches.get_one::<u64>("seed") {
        Some(seed) => {
            let mut rng = StdRng::seed_from_u64(*seed);
            session.selector().select(&keywords, &ledger, count, &used, &mut rng)
        }
        None => session.selector().select(&keywords, &ledger, count, &used, &mut rand::rng()),
    };

    info!("🎯 Selected {} of {} keywords", selected.len(), keywords.len());
    for keyword in &selected {
        println!("{}", keyword);
    }
    Ok(())
}

async fn record(config: &Config, matches: &ArgMatches) -> Result<()> {
    let session = KeywordSession::new(config.clone());
    let keyword = matches
        .get_one::<String>("keyword")
        .ok_or_else(|| anyhow!("keyword is required"))?;

    let outcome = if matches.get_flag("failure") {
        KeywordOutcome::Failure
    } else {
        KeywordOutcome::Success {
            downloads: matches.get_one::<u64>("downloads").copied().unwrap_or(0),
            views: matches.get_one::<u64>("views").copied().unwrap_or(0),
        }
    };

    let mut ledger = session.load_ledger().await;
    let before = session.scorer().score(&ledger, keyword);
    let after = session.scorer().update(&mut ledger, keyword, outcome);

    if !session.save_ledger(&mut ledger).await {
        return Err(anyhow!("Failed to save {}", session.ledger_file().path().display()));
    }
    info!("📈 {}: {:.2} -> {:.2}", keyword, before, after);
    Ok(())
}

async fn normalize(config: &Config) -> Result<()> {
    let session = KeywordSession::new(config.clone());
    let mut ledger = session.load_ledger().await;
    if ledger.is_empty() {
        info!("📭 Ledger is empty, nothing to normalize");
        return Ok(());
    }

    session.scorer().normalize_ledger(&mut ledger);
    if !session.save_ledger(&mut ledger).await {
        return Err(anyhow!("Failed to save {}", session.ledger_file().path().display()));
    }
    info!("⚖️ Normalized {} keyword scores", ledger.len());
    Ok(())
}

async fn top(config: &Config, matches: &ArgMatches) -> Result<()> {
    let session = KeywordSession::new(config.clone());
    let ledger = session.load_ledger().await;
    let limit = matches.get_one::<usize>("limit").copied().unwrap_or(10);

    let summary = analytics::ledger_summary(&ledger, session.scorer(), limit);
    info!("📊 Keyword Ledger:");
    info!("  Keywords: {}", summary.keywords);
    info!("  Mean score: {:.2}", summary.mean_score);
    info!("  Below default: {}", summary.below_default);
    if let Some(updated) = &ledger.last_updated {
        let age = dates::days_between(updated, &dates::now());
        info!("  Last updated: {} ({} days ago)", dates::format_iso(updated), age);
    }

    for (rank, (keyword, score)) in summary.top.iter().enumerate() {
        println!("{:>3}. {:<40} {:>6.2}", rank + 1, keyword, score);
    }
    Ok(())
}

async fn trend(matches: &ArgMatches) -> Result<()> {
    let path = matches
        .get_one::<String>("channel-file")
        .ok_or_else(|| anyhow!("channel file is required"))?;
    let periods: Vec<u32> = matches
        .get_many::<u32>("periods")
        .map(|values| values.copied().collect())
        .unwrap_or_else(|| DEFAULT_TREND_PERIODS.to_vec());

    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read channel file {}", path))?;
    let data: ChannelData =
        serde_json::from_str(&content).with_context(|| format!("Failed to parse channel file {}", path))?;

    let report = analytics::analyze_trend(&data, &periods, dates::now())?;
    for recommendation in &report.recommendations {
        info!("💡 {}", recommendation);
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn metrics(config: &Config) -> Result<()> {
    let metadata_file = CacheFile::new(&config.paths.metadata_metrics_file).with_label("Metadata Metrics");
    let performance_file =
        CacheFile::new(&config.paths.performance_metrics_file).with_label("Performance Metrics");

    let metadata = metadata_file.load(MetadataMetrics::default()).await.into_value();
    let performance = performance_file.load(PerformanceMetrics::default()).await.into_value();

    let rates = metadata.error_rates();
    info!("🧾 Metadata API calls: {}", metadata.total_api_calls);
    info!(
        "  Content errors: {} ({:.1}%), Timeouts: {:.1}%",
        metadata.total_errors(),
        rates.overall_error_rate * 100.0,
        rates.timeout_rate * 100.0
    );
    info!(
        "  Validation warnings - Title mismatches: {:.1}%, Tag list errors: {:.1}%, Keyword stuffing: {:.1}%",
        rates.title_mismatch_rate * 100.0,
        rates.tag_list_error_rate * 100.0,
        rates.keyword_stuffing_rate * 100.0
    );

    match metadata.quality_issue(&config.metrics) {
        Some(issue) => warn!("⚠️ Metadata quality issue: {}", issue),
        None => info!("✅ Metadata quality within thresholds"),
    }
    if metadata.regressed_since_previous() {
        warn!("📉 Error rate is higher than the previous window");
    }

    info!(
        "📤 Uploads: {} total, {} ok, {} failed ({:.1}% success)",
        performance.total_uploads,
        performance.successful_uploads,
        performance.failed_uploads,
        performance.success_rate * 100.0
    );
    info!(
        "  Moving averages: {:.0} views, {:.0} likes, {:.0} comments",
        performance.average_views, performance.average_likes, performance.average_comments
    );
    for (error_type, count) in &performance.error_counts {
        info!("  {}: {}", error_type, count);
    }
    for video in &performance.top_performing_videos {
        println!("{:>10} views  {}  {}", video.views, video.video_id, video.title);
    }
    Ok(())
}
