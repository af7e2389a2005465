/// Discovery of JSON state files under a data directory
use super::CacheFile;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Age and validity of one state file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStatus {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub age_days: Option<u64>,
    pub is_valid: bool,
}

/// Every `*.json` file under `dir`, sorted by path. Backups are skipped.
pub async fn scan_dir(dir: &Path, max_age_days: u64) -> Vec<CacheStatus> {
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut statuses = Vec::with_capacity(paths.len());
    for path in paths {
        let size_bytes = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
        let cache = CacheFile::new(&path);
        statuses.push(CacheStatus {
            size_bytes,
            age_days: cache.age_days().await,
            is_valid: cache.is_valid(max_age_days).await,
            path,
        });
    }
    statuses
}
