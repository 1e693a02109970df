use std::path::{Path, PathBuf};

use anyhow::Context;
use regex::Regex;

use crate::util::file_lines;

/// Load `metadata/ignore`, one pattern per line. Lines that no longer
/// compile are skipped (they were validated when stored).
pub fn load_patterns(ignore_file: &Path) -> Vec<Regex> {
    file_lines(ignore_file)
        .iter()
        .filter_map(|line| Regex::new(line).ok())
        .collect()
}

pub fn validate_pattern(pattern: &str) -> anyhow::Result<Regex> {
    Regex::new(pattern).with_context(|| format!("invalid regex pattern \"{pattern}\""))
}

/// Drop input items whose whole path string matches any pattern,
/// before any IO happens.
pub fn filter_items(items: &mut Vec<PathBuf>, patterns: &[Regex]) {
    if patterns.is_empty() {
        return;
    }
    items.retain(|item| {
        let s = item.to_string_lossy();
        !patterns.iter().any(|p| p.is_match(&s))
    });
}

/// GUI path ingests are filtered by filename component.
pub fn filter_ingest_paths(paths: &mut Vec<PathBuf>, patterns: &[Regex]) {
    if patterns.is_empty() {
        return;
    }
    paths.retain(|path| {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        !patterns.iter().any(|p| p.is_match(&name))
    });
}

/// Text ingested from the GUI is dropped wholesale when it matches.
pub fn text_matches(text: &str, patterns: &[Regex]) -> bool {
    patterns.iter().any(|p| p.is_match(text))
}

/// Post-write pruning of a raw-data payload: every pattern is replaced
/// with the empty string.
pub fn scrub_text(content: &str, patterns: &[Regex]) -> String {
    let mut out = content.to_string();
    for p in patterns {
        out = p.replace_all(&out, "").into_owned();
    }
    out
}

/// Post-write pruning of stored files: entries whose filename matches
/// any pattern are removed from the entry directory.
pub fn prune_files(data_dir: &Path, patterns: &[Regex]) -> std::io::Result<()> {
    if patterns.is_empty() {
        return Ok(());
    }
    for entry in std::fs::read_dir(data_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if patterns.iter().any(|p| p.is_match(&name)) {
            let path = entry.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_patterns_fail_validation() {
        assert!(validate_pattern(r"\.tmp$").is_ok());
        assert!(validate_pattern(r"([unclosed").is_err());
    }

    #[test]
    fn items_filter_on_whole_path() {
        let patterns = vec![Regex::new(r"\.tmp$").unwrap()];
        let mut items = vec![
            PathBuf::from("/tmp/a.txt"),
            PathBuf::from("/tmp/b.tmp"),
            PathBuf::from("/tmp/c.txt"),
        ];
        filter_items(&mut items, &patterns);
        assert_eq!(
            items,
            vec![PathBuf::from("/tmp/a.txt"), PathBuf::from("/tmp/c.txt")]
        );
    }

    #[test]
    fn ingest_filter_uses_filename_only() {
        // Pattern anchors on the filename, so a parent dir component
        // that matches must not drop the item.
        let patterns = vec![Regex::new(r"^secret").unwrap()];
        let mut paths = vec![
            PathBuf::from("/home/secret-stuff/ok.txt"),
            PathBuf::from("/home/u/secret.txt"),
        ];
        filter_ingest_paths(&mut paths, &patterns);
        assert_eq!(paths, vec![PathBuf::from("/home/secret-stuff/ok.txt")]);
    }

    #[test]
    fn scrub_replaces_matches_with_nothing() {
        let patterns = vec![Regex::new(r"[0-9]+").unwrap()];
        assert_eq!(scrub_text("a1b22c", &patterns), "abc");
    }

    #[test]
    fn prune_removes_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("keep.txt"), "x").unwrap();
        std::fs::write(dir.path().join("drop.tmp"), "x").unwrap();
        std::fs::create_dir(dir.path().join("drop-dir.tmp")).unwrap();
        let patterns = vec![Regex::new(r"\.tmp$").unwrap()];
        prune_files(dir.path(), &patterns).unwrap();
        assert!(dir.path().join("keep.txt").exists());
        assert!(!dir.path().join("drop.tmp").exists());
        assert!(!dir.path().join("drop-dir.tmp").exists());
    }
}
