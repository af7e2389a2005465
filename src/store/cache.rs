/// Single JSON state file with backup rotation and age checks
use super::{Document, LoadOutcome, Shape, StoreError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, error, info, warn};

const SECONDS_PER_DAY: u64 = 86_400;

/// Handle on one state file.
///
/// The label names the file in every log record the handle emits, so callers
/// can tell "Score Ledger" traffic from "Correlation Cache" traffic.
#[derive(Debug, Clone)]
pub struct CacheFile {
    path: PathBuf,
    label: String,
}

impl CacheFile {
    /// Create a handle labelled with the file name
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Cache".to_string());
        Self { path, label }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Sibling path holding the previous contents (`<path>.bak`)
    pub fn backup_path(&self) -> PathBuf {
        self.with_suffix(".bak")
    }

    fn with_suffix(&self, suffix: &str) -> PathBuf {
        let mut os: OsString = self.path.clone().into_os_string();
        os.push(suffix);
        PathBuf::from(os)
    }

    pub async fn exists(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Load the file, falling back to `default` on any failure. Never writes.
    pub async fn load<T: Document>(&self, default: T) -> LoadOutcome<T> {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(cache = %self.label, path = %self.path.display(), "File not found, using default");
                return LoadOutcome::NotFound(default);
            }
            Err(e) => {
                error!(cache = %self.label, path = %self.path.display(), "Failed to read file: {}", e);
                return LoadOutcome::IoError(default, StoreError::Io(e));
            }
        };

        if content.iter().all(|b| b.is_ascii_whitespace()) {
            info!(cache = %self.label, "File exists but is empty, using default");
            return LoadOutcome::Empty(default);
        }

        let value: serde_json::Value = match serde_json::from_slice(&content) {
            Ok(value) => value,
            Err(e) => {
                error!(cache = %self.label, path = %self.path.display(), "Malformed JSON, using default: {}", e);
                return LoadOutcome::Corrupt(default, StoreError::Malformed(e.to_string()));
            }
        };

        let found = Shape::of(&value);
        if found != Some(T::SHAPE) {
            let found = found
                .map(|s| s.to_string())
                .unwrap_or_else(|| "scalar".to_string());
            warn!(cache = %self.label, "Invalid format (expected {}, found {}), using default", T::SHAPE, found);
            return LoadOutcome::Corrupt(
                default,
                StoreError::ShapeMismatch {
                    expected: T::SHAPE,
                    found,
                },
            );
        }

        match serde_json::from_value::<T>(value) {
            Ok(parsed) => {
                debug!(cache = %self.label, path = %self.path.display(), "Loaded from disk");
                LoadOutcome::Found(parsed)
            }
            Err(e) => {
                error!(cache = %self.label, "Unexpected structure, using default: {}", e);
                LoadOutcome::Corrupt(default, StoreError::Malformed(e.to_string()))
            }
        }
    }

    /// Save `value`, backing up any existing file first.
    ///
    /// The new contents are written to a sibling temporary file and renamed
    /// over the target, so an interrupted write never truncates the old state.
    pub async fn try_save<T: Document>(&self, value: &T) -> Result<(), StoreError> {
        let json_value =
            serde_json::to_value(value).map_err(|e| StoreError::Serialize(e.to_string()))?;
        let json_content = serde_json::to_string_pretty(&json_value)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        if self.exists().await {
            self.backup().await;
        }

        let tmp_path = self.with_suffix(".tmp");
        if let Err(e) = fs::write(&tmp_path, json_content).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        match &json_value {
            serde_json::Value::Object(map) => {
                let entries = map.len() - usize::from(map.contains_key("timestamp"));
                info!(cache = %self.label, entries, "💾 Saved");
            }
            serde_json::Value::Array(items) => {
                info!(cache = %self.label, entries = items.len(), "💾 Saved");
            }
            _ => info!(cache = %self.label, "💾 Saved"),
        }

        Ok(())
    }

    /// Boolean form of [`CacheFile::try_save`]; failures are logged, never raised
    pub async fn save<T: Document>(&self, value: &T) -> bool {
        match self.try_save(value).await {
            Ok(()) => true,
            Err(e) => {
                error!(cache = %self.label, path = %self.path.display(), "Failed to save: {}", e);
                false
            }
        }
    }

    /// Copy the current file to `<path>.bak`. Failure is non-fatal.
    async fn backup(&self) -> bool {
        let backup_path = self.backup_path();
        match fs::copy(&self.path, &backup_path).await {
            Ok(_) => {
                debug!(cache = %self.label, backup = %backup_path.display(), "Created backup");
                true
            }
            Err(e) => {
                warn!(cache = %self.label, "Could not create backup: {}", e);
                false
            }
        }
    }

    /// Age of the file in whole days, by modification time
    pub async fn age_days(&self) -> Option<u64> {
        let metadata = fs::metadata(&self.path).await.ok()?;
        let modified = metadata.modified().ok()?;
        Some(age_in_days(modified))
    }

    /// False when the file is missing, empty, older than `max_age_days`, or not valid JSON
    pub async fn is_valid(&self, max_age_days: u64) -> bool {
        let metadata = match fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(_) => {
                debug!(cache = %self.label, "Cache file not found");
                return false;
            }
        };

        if metadata.len() == 0 {
            debug!(cache = %self.label, "Cache file is empty");
            return false;
        }

        let age = match metadata.modified() {
            Ok(modified) => age_in_days(modified),
            Err(e) => {
                warn!(cache = %self.label, "Error checking cache validity: {}", e);
                return false;
            }
        };
        if age > max_age_days {
            debug!(cache = %self.label, age_days = age, "Cache file expired");
            return false;
        }

        match fs::read(&self.path).await {
            Ok(content) => match serde_json::from_slice::<serde_json::Value>(&content) {
                Ok(_) => true,
                Err(_) => {
                    debug!(cache = %self.label, "Cache file contains invalid JSON");
                    false
                }
            },
            Err(e) => {
                warn!(cache = %self.label, "Error checking cache validity: {}", e);
                false
            }
        }
    }

    /// Back up then delete the file. A missing file is a successful no-op.
    pub async fn clear(&self) -> bool {
        if !self.exists().await {
            info!(cache = %self.label, path = %self.path.display(), "Nothing to clear");
            return true;
        }

        self.backup().await;

        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!(cache = %self.label, path = %self.path.display(), "🗑️ Cleared");
                true
            }
            Err(e) => {
                error!(cache = %self.label, "Error clearing file: {}", e);
                false
            }
        }
    }
}

fn age_in_days(modified: SystemTime) -> u64 {
    SystemTime::now()
        .duration_since(modified)
        .map(|d| d.as_secs() / SECONDS_PER_DAY)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};
    use std::collections::BTreeMap;
    use std::time::Duration;
    use tempfile::TempDir;

    fn object_default() -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("x".to_string(), json!(1));
        map
    }

    fn set_age_days(path: &Path, days: u64) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(days * SECONDS_PER_DAY + 60))
            .unwrap();
    }

    #[tokio::test]
    async fn test_load_missing_returns_default_without_writing() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheFile::new(temp_dir.path().join("missing.json"));

        let outcome = cache.load(object_default()).await;

        assert!(matches!(outcome, LoadOutcome::NotFound(_)));
        assert_eq!(outcome.into_value(), object_default());
        assert!(!cache.path().exists());
    }

    #[tokio::test]
    async fn test_load_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("empty.json");
        std::fs::write(&path, "").unwrap();

        let outcome = CacheFile::new(&path).load(Vec::<Value>::new()).await;
        assert!(matches!(outcome, LoadOutcome::Empty(_)));
    }

    #[tokio::test]
    async fn test_load_malformed_leaves_file_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.json");
        std::fs::write(&path, "{\"x\": ").unwrap();

        let outcome = CacheFile::new(&path).load(object_default()).await;

        assert!(outcome.is_corrupt());
        assert!(matches!(outcome.error(), Some(StoreError::Malformed(_))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"x\": ");
    }

    #[tokio::test]
    async fn test_load_shape_mismatch() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("list.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let outcome = CacheFile::new(&path).load(object_default()).await;
        match outcome {
            LoadOutcome::Corrupt(value, StoreError::ShapeMismatch { expected, found }) => {
                assert_eq!(value, object_default());
                assert_eq!(expected, Shape::Object);
                assert_eq!(found, "array");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_creates_parents_and_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheFile::new(temp_dir.path().join("nested/dir/scores.json"));

        let mut scores = BTreeMap::new();
        scores.insert("alpha".to_string(), 42.5);
        scores.insert("beta".to_string(), 10.0);

        assert!(cache.save(&scores).await);
        let loaded = cache.load(BTreeMap::<String, f64>::new()).await;
        assert!(loaded.is_found());
        assert_eq!(loaded.into_value(), scores);

        // Saving what was loaded is idempotent
        let reloaded = cache.load(BTreeMap::<String, f64>::new()).await.into_value();
        assert!(cache.save(&reloaded).await);
        let again: BTreeMap<String, f64> = cache.load(BTreeMap::new()).await.into_value();
        assert_eq!(again, scores);
    }

    #[tokio::test]
    async fn test_save_backs_up_previous_contents() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheFile::new(temp_dir.path().join("data.json"));

        assert!(cache.save(&vec![1, 2]).await);
        assert!(!cache.backup_path().exists());

        assert!(cache.save(&vec![3]).await);
        let backup: Vec<i32> =
            serde_json::from_str(&std::fs::read_to_string(cache.backup_path()).unwrap()).unwrap();
        assert_eq!(backup, vec![1, 2]);
        assert_eq!(cache.load(Vec::<i32>::new()).await.into_value(), vec![3]);
    }

    #[tokio::test]
    async fn test_save_reports_failure() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not_a_dir");
        std::fs::write(&blocker, "file").unwrap();

        let cache = CacheFile::new(blocker.join("state.json"));
        assert!(!cache.save(&vec![1]).await);
        assert!(matches!(cache.try_save(&vec![1]).await, Err(StoreError::Io(_))));
    }

    #[tokio::test]
    async fn test_is_valid_checks() {
        let temp_dir = TempDir::new().unwrap();

        let missing = CacheFile::new(temp_dir.path().join("missing.json"));
        assert!(!missing.is_valid(7).await);

        let empty_path = temp_dir.path().join("empty.json");
        std::fs::write(&empty_path, "").unwrap();
        assert!(!CacheFile::new(&empty_path).is_valid(7).await);

        let bad_path = temp_dir.path().join("bad.json");
        std::fs::write(&bad_path, "not json").unwrap();
        assert!(!CacheFile::new(&bad_path).is_valid(7).await);

        let fresh = CacheFile::new(temp_dir.path().join("fresh.json"));
        assert!(fresh.save(&vec![1]).await);
        assert!(fresh.is_valid(7).await);
        assert_eq!(fresh.age_days().await, Some(0));
    }

    #[tokio::test]
    async fn test_is_valid_rejects_old_file() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheFile::new(temp_dir.path().join("old.json"));
        assert!(cache.save(&vec![1]).await);

        set_age_days(cache.path(), 8);

        assert_eq!(cache.age_days().await, Some(8));
        assert!(!cache.is_valid(7).await);
        assert!(cache.is_valid(8).await);
    }

    #[tokio::test]
    async fn test_clear_backs_up_and_deletes() {
        let temp_dir = TempDir::new().unwrap();
        let cache = CacheFile::new(temp_dir.path().join("clear.json")).with_label("Test Cache");
        assert_eq!(cache.label(), "Test Cache");

        assert!(cache.save(&vec!["a".to_string()]).await);
        assert!(cache.clear().await);

        assert!(!cache.path().exists());
        assert!(cache.backup_path().exists());

        // Clearing again is a no-op success
        assert!(cache.clear().await);
    }
}
