use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::io::AsyncReadExt;

use crate::clipboard::Clipboard;
use crate::content::{CopyPolicy, FailedItem};
use crate::dispatch::{Action, IoMode};
use crate::indicator::{Indicator, Progress};
use crate::locales::Catalog;
use crate::paths::GlobalPaths;
use crate::terminal::Tty;

/// Flag state for one invocation.
#[derive(Debug, Clone, Default)]
pub struct Flags {
    pub all: bool,
    pub fast_copy: bool,
    pub no_confirmation: bool,
    pub preferred_mime: Option<String>,
    pub output_silent: bool,
    pub progress_silent: bool,
}

/// Everything one invocation carries around: the resolved action, the
/// clipboard handle (which owns the lock), shared progress state, and
/// the result accumulators. Threaded through every routine instead of
/// process-wide globals.
pub struct Ctx {
    pub action: Action,
    pub io: IoMode,
    pub items: Vec<PathBuf>,
    pub board: Clipboard,
    pub paths: GlobalPaths,
    pub flags: Flags,
    pub tty: Tty,
    pub catalog: Catalog,
    pub invocation: String,
    pub progress: Arc<Progress>,
    pub indicator: Indicator,
    pub policy: CopyPolicy,
    pub failed: Vec<FailedItem>,
    /// Text captured by the action, used for reporting and publishing.
    pub buffer: String,
    pub buffer_mime: String,
    pub available_types: Vec<String>,
    pub max_history: usize,
    /// Some routines end the invocation right after their own output.
    pub skip_summary: bool,
}

impl Ctx {
    pub fn user_is_robot(&self) -> bool {
        self.tty.user_is_robot() || self.flags.no_confirmation
    }

    pub fn is_default_target(&self) -> bool {
        self.board.name() == crate::consts::DEFAULT_CLIPBOARD_NAME
            && self.board.entry() == crate::consts::DEFAULT_CLIPBOARD_ENTRY
    }

    pub fn doing(&self) -> &'static str {
        self.catalog.doing(self.action)
    }

    pub fn did(&self) -> &'static str {
        self.catalog.did(self.action)
    }

    pub async fn stop_indicator(&mut self) {
        self.indicator.stop().await;
    }

    pub fn add_failed(&mut self, item: FailedItem) {
        self.failed.push(item);
    }

    pub fn extend_failed(&mut self, items: Vec<FailedItem>) {
        self.failed.extend(items);
    }

    /// Drain stdin to EOF, counting bytes into the shared progress.
    pub async fn read_piped_input(&self) -> anyhow::Result<Vec<u8>> {
        let mut stdin = tokio::io::stdin();
        let mut out = Vec::new();
        let mut buf = vec![0u8; 65536];
        loop {
            let n = stdin.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
            self.progress.successes.add_bytes(n as u64);
        }
        Ok(out)
    }

    /// The single positional item actions like `note` and text-copy
    /// operate on.
    pub fn single_item_string(&self) -> anyhow::Result<String> {
        self.items
            .first()
            .map(|p| p.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("this action needs an item"))
    }

    /// All positional items as plain strings.
    pub fn item_strings(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    }
}
