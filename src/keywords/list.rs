/// Plain-text keyword list handling
use regex::Regex;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::fs;
use tracing::{debug, error, info, warn};

fn non_word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid regex"))
}

/// Parse a keyword list: one per line, `#` starts a comment, blank lines skipped
pub fn parse_keywords(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read the keyword list at `path`. A missing or unreadable file yields an empty list.
pub async fn load_keywords(path: &Path) -> Vec<String> {
    match fs::read_to_string(path).await {
        Ok(content) => {
            let keywords = parse_keywords(&content);
            info!("📋 Loaded {} keywords from {}", keywords.len(), path.display());
            keywords
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Keywords file not found: {}", path.display());
            Vec::new()
        }
        Err(e) => {
            error!("Error loading keywords from {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Write `keywords` one per line, keeping the previous file as `<path>.bak`
pub async fn save_keywords(keywords: &[String], path: &Path) -> bool {
    match try_save_keywords(keywords, path).await {
        Ok(()) => {
            info!("💾 Saved {} keywords to {}", keywords.len(), path.display());
            true
        }
        Err(e) => {
            error!("Error saving keywords to {}: {}", path.display(), e);
            false
        }
    }
}

async fn try_save_keywords(keywords: &[String], path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    if fs::try_exists(path).await.unwrap_or(false) {
        let mut backup: OsString = path.as_os_str().to_owned();
        backup.push(".bak");
        let backup = PathBuf::from(backup);
        match fs::copy(path, &backup).await {
            Ok(_) => debug!("Created keywords backup at {}", backup.display()),
            Err(e) => warn!("Could not back up keywords file: {}", e),
        }
    }

    let mut content = keywords.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    fs::write(path, content).await
}

/// Candidate keywords from free text (titles, descriptions).
///
/// Words are lowercased with punctuation removed; words shorter than
/// `min_length` characters or made only of digits are dropped.
pub fn extract_keywords_from_text(text: &str, min_length: usize) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned = non_word_regex().replace_all(&lowered, " ");

    let mut seen = HashSet::new();
    cleaned
        .split_whitespace()
        .filter(|word| word.chars().count() >= min_length)
        .filter(|word| !word.chars().all(|c| c.is_ascii_digit()))
        .filter(|word| seen.insert(word.to_string()))
        .map(str::to_string)
        .collect()
}

/// Append keywords from `new` that are not already present, keeping order
pub fn merge_keywords(existing: &[String], new: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = existing.iter().map(String::as_str).collect();
    let mut merged = existing.to_vec();
    for keyword in new {
        if seen.insert(keyword.as_str()) {
            merged.push(keyword.clone());
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_strips_comments_and_blanks() {
        let content = "# header\ngta 6 trailer\n\n  minecraft  # evergreen\n#disabled\nfortnite";
        assert_eq!(parse_keywords(content), vec!["gta 6 trailer", "minecraft", "fortnite"]);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_keywords(&temp_dir.path().join("nope.txt")).await.is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_with_backup() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config").join("keywords.txt");

        let first = vec!["one".to_string(), "two".to_string()];
        assert!(save_keywords(&first, &path).await);
        assert_eq!(load_keywords(&path).await, first);

        let second = vec!["three".to_string()];
        assert!(save_keywords(&second, &path).await);
        assert_eq!(load_keywords(&path).await, second);

        let backup = temp_dir.path().join("config").join("keywords.txt.bak");
        assert_eq!(load_keywords(&backup).await, first);
    }

    #[test]
    fn test_extract_keywords() {
        let words = extract_keywords_from_text("GTA 6: Trailer #2 (2025) - gta trailer REACTION!", 3);
        assert_eq!(words, vec!["gta", "trailer", "reaction"]);

        assert!(extract_keywords_from_text("a an 12345", 2).contains(&"an".to_string()));
        assert!(extract_keywords_from_text("", 3).is_empty());
    }

    #[test]
    fn test_merge_keeps_order_and_skips_known() {
        let existing = vec!["a".to_string(), "b".to_string()];
        let new = vec!["b".to_string(), "c".to_string(), "c".to_string()];
        assert_eq!(merge_keywords(&existing, &new), vec!["a", "b", "c"]);
    }
}
