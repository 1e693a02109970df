use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Whether a paths clipboard was produced by a copy or a cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathsAction {
    Copy,
    Cut,
}

/// What a clipboard (ours or the GUI's) currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ContentData {
    #[default]
    Empty,
    Text {
        text: String,
        mime: String,
    },
    Paths {
        paths: Vec<PathBuf>,
        action: PathsAction,
    },
}

/// Clipboard content plus the MIME names the source said it could also
/// have produced. The extra types are only used for reporting.
#[derive(Debug, Clone, Default)]
pub struct ClipboardContent {
    pub data: ContentData,
    pub available_types: Vec<String>,
}

impl ClipboardContent {
    pub fn text(text: String, mime: String) -> Self {
        Self {
            data: ContentData::Text { text, mime },
            available_types: Vec::new(),
        }
    }

    pub fn paths(paths: Vec<PathBuf>, action: PathsAction) -> Self {
        Self {
            data: ContentData::Paths { paths, action },
            available_types: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.data, ContentData::Empty)
    }
}

/// Collision handling for paste and import. Starts out `Unknown` and is
/// settled by the first prompt (or forced to `ReplaceAll` for robots).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyPolicy {
    ReplaceAll,
    ReplaceOnce,
    SkipOnce,
    SkipAll,
    #[default]
    Unknown,
}

/// One item that could not be processed, reported in bulk at the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedItem {
    pub name: String,
    pub error: String,
}

impl FailedItem {
    pub fn new(name: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            name: name.into(),
            error: error.to_string(),
        }
    }
}

/// Success counters shared with the indicator task. The indicator only
/// reads these for display, so relaxed ordering is enough.
#[derive(Debug, Default)]
pub struct Successes {
    pub files: AtomicU64,
    pub directories: AtomicU64,
    pub bytes: AtomicU64,
    pub clipboards: AtomicU64,
}

impl Successes {
    pub fn add_file(&self) {
        self.files.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_directory(&self) {
        self.directories.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bytes(&self, n: u64) {
        self.bytes.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_clipboard(&self) {
        self.clipboards.fetch_add(1, Ordering::Relaxed);
    }

    pub fn files(&self) -> u64 {
        self.files.load(Ordering::Relaxed)
    }

    pub fn directories(&self) -> u64 {
        self.directories.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn clipboards(&self) -> u64 {
        self.clipboards.load(Ordering::Relaxed)
    }

    pub fn items(&self) -> u64 {
        self.files() + self.directories()
    }
}
