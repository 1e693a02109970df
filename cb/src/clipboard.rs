use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use regex::Regex;

use crate::consts::{
    DATA_DIR, IGNORE_FILE, LOCK_FILE, METADATA_DIR, MIME_FILE, NOTES_FILE, ORIGINALS_FILE,
    RAW_DATA_FILE, SCRIPT_FILE,
};
use crate::ignore;
use crate::lock::LockGuard;
use crate::paths::{self, GlobalPaths};
use crate::util::{file_lines, file_string, non_empty_file};

/// A named, versioned clipboard on disk.
///
/// Layout: `<root>/data/<n>/` per history entry (newest has the highest
/// number) and `<root>/metadata/` for the sidecar files. The in-memory
/// entry index is kept sorted descending; an empty `data/` is treated
/// as holding entry 0.
#[derive(Debug)]
pub struct Clipboard {
    name: String,
    root: PathBuf,
    pub is_persistent: bool,
    pub index: VecDeque<u64>,
    position: usize,
    data_dir: PathBuf,
    lock: Option<LockGuard>,
}

fn build_index(entries_dir: &Path) -> std::io::Result<VecDeque<u64>> {
    let mut numbers: Vec<u64> = Vec::new();
    if entries_dir.exists() {
        for entry in std::fs::read_dir(entries_dir)? {
            let entry = entry?;
            if let Ok(n) = entry.file_name().to_string_lossy().parse::<u64>() {
                numbers.push(n);
            }
        }
    }
    if numbers.is_empty() {
        numbers.push(0);
    }
    numbers.sort_unstable_by(|a, b| b.cmp(a));
    Ok(numbers.into())
}

impl Clipboard {
    /// Open (creating on demand) the named clipboard, pointing at the
    /// given history entry (0 = current).
    pub fn open(paths: &GlobalPaths, name: &str, entry: usize) -> anyhow::Result<Self> {
        paths::validate_clipboard_name(name)?;

        let root = paths::clipboard_root(paths, name);
        let entries_dir = root.join(DATA_DIR);
        std::fs::create_dir_all(&entries_dir)
            .with_context(|| format!("create {}", entries_dir.display()))?;

        let index = build_index(&entries_dir)?;
        let number = *index.get(entry).ok_or_else(|| {
            anyhow!(
                "The history entry you chose (\"{entry}\") doesn't exist. Try choosing a different or newer one instead."
            )
        })?;

        let data_dir = entries_dir.join(number.to_string());
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("create {}", data_dir.display()))?;
        std::fs::create_dir_all(root.join(METADATA_DIR))
            .with_context(|| format!("create {}", root.join(METADATA_DIR).display()))?;

        Ok(Self {
            name: name.to_string(),
            is_persistent: paths::is_persistent_name(name),
            root,
            index,
            position: entry,
            data_dir,
            lock: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Position of the current entry within the index.
    pub fn entry(&self) -> usize {
        self.position
    }

    pub fn total_entries(&self) -> usize {
        self.index.len()
    }

    /// Directory of the current entry.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn data_root(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    pub fn raw_data_path(&self) -> PathBuf {
        self.data_dir.join(RAW_DATA_FILE)
    }

    pub fn entry_dir_at(&self, position: usize) -> Option<PathBuf> {
        self.index
            .get(position)
            .map(|n| self.data_root().join(n.to_string()))
    }

    fn metadata_dir(&self) -> PathBuf {
        self.root.join(METADATA_DIR)
    }

    pub fn originals_path(&self) -> PathBuf {
        self.metadata_dir().join(ORIGINALS_FILE)
    }

    pub fn notes_path(&self) -> PathBuf {
        self.metadata_dir().join(NOTES_FILE)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.metadata_dir().join(LOCK_FILE)
    }

    pub fn ignore_path(&self) -> PathBuf {
        self.metadata_dir().join(IGNORE_FILE)
    }

    pub fn mime_path(&self) -> PathBuf {
        self.metadata_dir().join(MIME_FILE)
    }

    pub fn script_path(&self) -> PathBuf {
        self.metadata_dir().join(SCRIPT_FILE)
    }

    /// Allocate the next entry (`max + 1`) and point at it.
    pub fn make_new_entry(&mut self) -> anyhow::Result<()> {
        let next = self.index.front().copied().unwrap_or(0) + 1;
        self.index.push_front(next);
        self.position = 0;
        self.data_dir = self.data_root().join(next.to_string());
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("create {}", self.data_dir.display()))?;
        Ok(())
    }

    /// Re-point the current entry at index position `position`.
    pub fn set_entry(&mut self, position: usize) -> anyhow::Result<()> {
        let number = *self.index.get(position).ok_or_else(|| {
            anyhow!("The history entry you chose (\"{position}\") doesn't exist.")
        })?;
        self.position = position;
        self.data_dir = self.data_root().join(number.to_string());
        Ok(())
    }

    /// Drop the oldest entries until at most `max` remain (0 = keep
    /// everything).
    pub fn trim_history_entries(&mut self, max: usize) {
        if max == 0 {
            return;
        }
        while self.index.len() > max {
            if let Some(oldest) = self.index.pop_back() {
                let _ = std::fs::remove_dir_all(self.data_root().join(oldest.to_string()));
            }
        }
    }

    /// The current entry holds a non-empty `rawdata.clipboard`.
    pub fn holds_raw_data(&self) -> bool {
        non_empty_file(&self.raw_data_path())
    }

    /// The current entry holds anything non-empty at all.
    pub fn holds_data(&self) -> bool {
        if self.holds_raw_data() {
            return true;
        }
        let Ok(read) = std::fs::read_dir(&self.data_dir) else {
            return false;
        };
        for entry in read.flatten() {
            let p = entry.path();
            if p.is_dir() {
                match std::fs::read_dir(&p) {
                    Ok(mut children) => {
                        if children.next().is_some() {
                            return true;
                        }
                    }
                    Err(_) => continue,
                }
            } else if entry.metadata().map(|m| m.len() > 0).unwrap_or(false) {
                return true;
            }
        }
        false
    }

    /// User-visible files in the current entry (everything except the
    /// raw-data payload).
    pub fn entry_files(&self) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = match std::fs::read_dir(&self.data_dir) {
            Ok(read) => read
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.file_name().map(|n| n != RAW_DATA_FILE).unwrap_or(true))
                .collect(),
            Err(_) => Vec::new(),
        };
        out.sort();
        out
    }

    pub fn is_unused(&self) -> bool {
        !self.holds_data()
            && !non_empty_file(&self.notes_path())
            && !non_empty_file(&self.originals_path())
    }

    pub fn is_locked(&self) -> bool {
        self.lock_path().exists()
    }

    pub fn locked_by(&self) -> Option<String> {
        file_string(&self.lock_path()).map(|s| s.trim().to_string())
    }

    pub async fn acquire_lock(&mut self) -> anyhow::Result<()> {
        if self.lock.is_none() {
            self.lock = Some(LockGuard::acquire(&self.lock_path()).await?);
        }
        Ok(())
    }

    pub fn release_lock(&mut self) {
        if let Some(mut guard) = self.lock.take() {
            guard.release();
        }
    }

    pub fn note(&self) -> Option<String> {
        file_string(&self.notes_path())
    }

    pub fn ignore_patterns(&self) -> Vec<Regex> {
        ignore::load_patterns(&self.ignore_path())
    }

    pub fn ignore_pattern_lines(&self) -> Vec<String> {
        file_lines(&self.ignore_path())
    }

    pub fn holds_ignore_patterns(&self) -> bool {
        non_empty_file(&self.ignore_path())
    }

    /// Enforce the ignore list against the current entry after a write.
    pub fn apply_ignore_patterns(&self) -> std::io::Result<()> {
        let patterns = self.ignore_patterns();
        if patterns.is_empty() {
            return Ok(());
        }
        if self.holds_raw_data() {
            let raw = self.raw_data_path();
            let content = std::fs::read_to_string(&raw).unwrap_or_default();
            let scrubbed = ignore::scrub_text(&content, &patterns);
            if scrubbed != content {
                std::fs::write(&raw, scrubbed)?;
            }
            Ok(())
        } else {
            ignore::prune_files(&self.data_dir, &patterns)
        }
    }

    /// One-line preview of the current entry: flattened text for raw
    /// data, a comma-separated name list for files.
    pub fn preview(&self, max_chars: usize) -> String {
        if self.holds_raw_data() {
            let text = file_string(&self.raw_data_path()).unwrap_or_default();
            let flat: String = text.chars().filter(|c| *c != '\n').collect();
            flat.chars().take(max_chars).collect()
        } else {
            let names: Vec<String> = self
                .entry_files()
                .iter()
                .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect();
            let joined = names.join(", ");
            joined.chars().take(max_chars).collect()
        }
    }

    /// Age of an entry, measured from its directory mtime.
    pub fn entry_age(&self, position: usize) -> Option<std::time::Duration> {
        let dir = self.entry_dir_at(position)?;
        let mtime = std::fs::metadata(dir).ok()?.modified().ok()?;
        std::time::SystemTime::now().duration_since(mtime).ok()
    }
}

/// Names of every clipboard that currently holds data, across both
/// roots, sorted by name.
pub fn clipboards_with_content(paths: &GlobalPaths) -> Vec<Clipboard> {
    let mut out: Vec<Clipboard> = Vec::new();
    for root in [&paths.temporary, &paths.persistent] {
        let Ok(read) = std::fs::read_dir(root) else {
            continue;
        };
        for entry in read.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Ok(cb) = Clipboard::open(paths, &name, 0) {
                if cb.holds_data() {
                    out.push(cb);
                }
            }
        }
    }
    out.sort_by(|a, b| a.name().cmp(b.name()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_paths(dir: &Path) -> GlobalPaths {
        GlobalPaths {
            temporary: dir.join("tmp"),
            persistent: dir.join("persist"),
        }
    }

    #[test]
    fn fresh_clipboard_synthesises_entry_zero() {
        let dir = tempfile::tempdir().unwrap();
        let cb = Clipboard::open(&test_paths(dir.path()), "0", 0).unwrap();
        assert_eq!(cb.index, VecDeque::from(vec![0]));
        assert!(cb.data_dir().ends_with("data/0"));
        assert!(!cb.holds_data());
    }

    #[test]
    fn make_new_entry_on_fresh_clipboard_yields_entry_one() {
        let dir = tempfile::tempdir().unwrap();
        let mut cb = Clipboard::open(&test_paths(dir.path()), "0", 0).unwrap();
        cb.make_new_entry().unwrap();
        assert_eq!(cb.index, VecDeque::from(vec![1, 0]));
        assert!(cb.data_dir().ends_with("data/1"));
    }

    #[test]
    fn index_reflects_disk_and_sorts_descending() {
        let dir = tempfile::tempdir().unwrap();
        let paths = test_paths(dir.path());
        {
            let mut cb = Clipboard::open(&paths, "0", 0).unwrap();
            cb.make_new_entry().unwrap();
            cb.make_new_entry().unwrap();
            cb.make_new_entry().unwrap();
        }
        let cb = Clipboard::open(&paths, "0", 0).unwrap();
        assert_eq!(cb.index, VecDeque::from(vec![3, 2, 1, 0]));
    }

    #[test]
    fn selecting_a_missing_entry_fails() {
        let dir = tempfile::tempdir().unwrap();
        let paths = test_paths(dir.path());
        assert!(Clipboard::open(&paths, "0", 5).is_err());
    }

    #[test]
    fn entry_selection_points_at_older_entries() {
        let dir = tempfile::tempdir().unwrap();
        let paths = test_paths(dir.path());
        let mut cb = Clipboard::open(&paths, "0", 0).unwrap();
        for payload in ["A", "B", "C"] {
            cb.make_new_entry().unwrap();
            std::fs::write(cb.raw_data_path(), payload).unwrap();
        }
        // Index is [3, 2, 1, 0]; position 2 is the first payload.
        let cb = Clipboard::open(&paths, "0", 2).unwrap();
        assert_eq!(std::fs::read_to_string(cb.raw_data_path()).unwrap(), "A");
    }

    #[test]
    fn trim_keeps_the_newest_entries() {
        let dir = tempfile::tempdir().unwrap();
        let paths = test_paths(dir.path());
        let mut cb = Clipboard::open(&paths, "0", 0).unwrap();
        for _ in 0..4 {
            cb.make_new_entry().unwrap();
            std::fs::write(cb.raw_data_path(), "x").unwrap();
        }
        cb.trim_history_entries(2);
        assert_eq!(cb.index, VecDeque::from(vec![4, 3]));
        assert!(!cb.data_root().join("1").exists());
        assert!(cb.data_root().join("4").exists());

        // 0 means unlimited.
        cb.trim_history_entries(0);
        assert_eq!(cb.index.len(), 2);
    }

    #[test]
    fn raw_data_and_files_are_mutually_visible() {
        let dir = tempfile::tempdir().unwrap();
        let paths = test_paths(dir.path());
        let cb = Clipboard::open(&paths, "0", 0).unwrap();
        assert!(!cb.holds_raw_data());
        std::fs::write(cb.raw_data_path(), "hello").unwrap();
        assert!(cb.holds_raw_data());
        assert!(cb.holds_data());
        assert!(cb.entry_files().is_empty());

        let cb2 = Clipboard::open(&paths, "other", 0).unwrap();
        std::fs::write(cb2.data_dir().join("f.txt"), "x").unwrap();
        assert!(!cb2.holds_raw_data());
        assert!(cb2.holds_data());
        assert_eq!(cb2.entry_files().len(), 1);
    }

    #[test]
    fn apply_ignore_patterns_scrubs_raw_data() {
        let dir = tempfile::tempdir().unwrap();
        let paths = test_paths(dir.path());
        let cb = Clipboard::open(&paths, "0", 0).unwrap();
        std::fs::write(cb.ignore_path(), "[0-9]+\n").unwrap();
        std::fs::write(cb.raw_data_path(), "a1b2c3").unwrap();
        cb.apply_ignore_patterns().unwrap();
        assert_eq!(std::fs::read_to_string(cb.raw_data_path()).unwrap(), "abc");
    }

    #[test]
    fn apply_ignore_patterns_prunes_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = test_paths(dir.path());
        let cb = Clipboard::open(&paths, "0", 0).unwrap();
        std::fs::write(cb.ignore_path(), "\\.tmp$\n").unwrap();
        std::fs::write(cb.data_dir().join("a.txt"), "x").unwrap();
        std::fs::write(cb.data_dir().join("b.tmp"), "x").unwrap();
        cb.apply_ignore_patterns().unwrap();
        assert!(cb.data_dir().join("a.txt").exists());
        assert!(!cb.data_dir().join("b.tmp").exists());
    }

    #[test]
    fn unused_accounting() {
        let dir = tempfile::tempdir().unwrap();
        let paths = test_paths(dir.path());
        let cb = Clipboard::open(&paths, "0", 0).unwrap();
        assert!(cb.is_unused());
        std::fs::write(cb.notes_path(), "remember").unwrap();
        assert!(!cb.is_unused());
    }
}
