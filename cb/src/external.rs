use std::path::PathBuf;

use anyhow::Context;
use log::debug;

use crate::clipboard::Clipboard;
use crate::consts::{DEFAULT_CLIPBOARD_NAME, OSC52_CHUNK, PLAIN_TEXT_MIME, URI_LIST_MIME};
use crate::content::{ClipboardContent, ContentData, PathsAction};
use crate::copy_engine;
use crate::dispatch::{is_clearing_action, is_write_action, Action};
use crate::gui::{self, osc52};
use crate::ignore;
use crate::invocation::Ctx;
use crate::paths::GlobalPaths;
use crate::util::{file_lines, file_string};

pub fn sniff_text_mime(text: &str) -> String {
    infer::get(text.as_bytes())
        .map(|k| k.mime_type().to_string())
        .unwrap_or_else(|| PLAIN_TEXT_MIME.to_string())
}

/// Pull the remote (OSC-52) and GUI clipboards into the store before
/// the action runs. Only the default clipboard at entry 0 syncs, and
/// clearing actions skip it; `force` overrides both.
pub async fn sync_from_external(ctx: &mut Ctx, force: bool) -> anyhow::Result<()> {
    let applies = force
        || (!is_clearing_action(ctx.action)
            && ctx.is_default_target()
            && ctx.action != Action::Status);
    if !applies {
        return Ok(());
    }

    let mut content = ClipboardContent::default();

    let tty = ctx.tty;
    if let Ok(Some(text)) =
        tokio::task::spawn_blocking(move || osc52::read_remote(&tty)).await.map_err(anyhow::Error::from)
    {
        content = ClipboardContent::text(text, PLAIN_TEXT_MIME.to_string());
    }

    if content.is_empty() {
        let preferred = ctx.flags.preferred_mime.clone();
        content = tokio::task::spawn_blocking(move || -> anyhow::Result<ClipboardContent> {
            match gui::pick_backend()? {
                Some(backend) => backend.get(preferred.as_deref()),
                None => Ok(ClipboardContent::default()),
            }
        })
        .await
        .context("join gui read")??;
    }

    ctx.available_types = content.available_types.clone();

    match content.data {
        ContentData::Text { text, mime } => {
            if ingest_text(&mut ctx.board, &text)? {
                ctx.buffer_mime = if mime.is_empty() {
                    sniff_text_mime(&text)
                } else {
                    mime
                };
            }
        }
        ContentData::Paths { paths, action } => {
            ingest_paths(&mut ctx.board, paths, action)?;
            ctx.buffer_mime = URI_LIST_MIME.to_string();
        }
        ContentData::Empty => {}
    }

    Ok(())
}

/// Store GUI text into a fresh entry unless it is a duplicate of the
/// current one or the ignore list rejects it.
pub fn ingest_text(board: &mut Clipboard, text: &str) -> anyhow::Result<bool> {
    let existing = file_string(&board.raw_data_path()).unwrap_or_default();
    if existing == text {
        return Ok(false);
    }
    // Terminals cap OSC-52 replies; a 4096-byte echo of our own longer
    // content must not create a truncated duplicate entry.
    if text.len() == OSC52_CHUNK && existing.len() > OSC52_CHUNK {
        return Ok(false);
    }
    if ignore::text_matches(text, &board.ignore_patterns()) {
        return Ok(false);
    }

    board.make_new_entry()?;
    std::fs::write(board.raw_data_path(), text).context("write ingested text")?;
    Ok(true)
}

/// Store GUI paths into a fresh entry, applying the ignore list and
/// skipping ingests that would reproduce the current entry.
pub fn ingest_paths(
    board: &mut Clipboard,
    mut paths: Vec<PathBuf>,
    action: PathsAction,
) -> anyhow::Result<()> {
    ignore::filter_ingest_paths(&mut paths, &board.ignore_patterns());
    if paths.is_empty() {
        return Ok(());
    }

    let eligible = paths.iter().all(|p| p.exists());
    let changed = paths.iter().any(|p| {
        let name = match p.file_name() {
            Some(n) => n.to_os_string(),
            None => return true,
        };
        let stored = board.data_dir().join(name);
        if !stored.exists() {
            return true;
        }
        if p.is_dir() {
            return false;
        }
        let differs_in_size = match (std::fs::metadata(p), std::fs::metadata(&stored)) {
            (Ok(a), Ok(b)) => a.len() != b.len(),
            _ => true,
        };
        differs_in_size || std::fs::read(p).ok() != std::fs::read(&stored).ok()
    });
    if !changed || !eligible {
        return Ok(());
    }

    board.make_new_entry()?;
    for path in &paths {
        if !path.exists() {
            continue;
        }
        if let Err(e) = copy_engine::copy_item(path, board.data_dir(), true) {
            debug!("gui ingest of {} failed: {e}", path.display());
        }
    }

    if action == PathsAction::Cut {
        let mut lines = String::new();
        for path in &paths {
            lines.push_str(&path.display().to_string());
            lines.push('\n');
        }
        std::fs::write(board.originals_path(), lines).context("write originals")?;
    }

    Ok(())
}

/// What the default clipboard would tell the GUI right now.
pub fn stored_content(paths: &GlobalPaths, supports_cut: bool) -> anyhow::Result<ClipboardContent> {
    let board = Clipboard::open(paths, DEFAULT_CLIPBOARD_NAME, 0)?;

    if board.originals_path().exists() && supports_cut {
        let files: Vec<PathBuf> = file_lines(&board.originals_path())
            .into_iter()
            .map(PathBuf::from)
            .collect();
        if !files.is_empty() {
            return Ok(ClipboardContent::paths(files, PathsAction::Cut));
        }
    }

    if board.holds_raw_data() {
        let text = file_string(&board.raw_data_path()).unwrap_or_default();
        let mime = sniff_text_mime(&text);
        return Ok(ClipboardContent::text(text, mime));
    }

    let files = board.entry_files();
    if !files.is_empty() {
        return Ok(ClipboardContent::paths(files, PathsAction::Copy));
    }

    Ok(ClipboardContent::default())
}

fn content_for_publish(
    paths: &GlobalPaths,
    buffer: &str,
    buffer_mime: &str,
    supports_cut: bool,
) -> anyhow::Result<ClipboardContent> {
    let board = Clipboard::open(paths, DEFAULT_CLIPBOARD_NAME, 0)?;
    if board.originals_path().exists() && supports_cut {
        return stored_content(paths, supports_cut);
    }
    if !buffer.is_empty() {
        let mime = if buffer_mime.is_empty() {
            sniff_text_mime(buffer)
        } else {
            buffer_mime.to_string()
        };
        return Ok(ClipboardContent::text(buffer.to_string(), mime));
    }
    stored_content(paths, supports_cut)
}

/// Push the default clipboard out to the GUI and the terminal after a
/// write action (or when forced, e.g. by history promotion).
pub async fn publish_to_external(ctx: &Ctx, force: bool) -> anyhow::Result<()> {
    let applies = force
        || (is_write_action(ctx.action) && ctx.board.name() == DEFAULT_CLIPBOARD_NAME);
    if !applies {
        return Ok(());
    }

    let paths = ctx.paths.clone();
    let buffer = ctx.buffer.clone();
    let buffer_mime = ctx.buffer_mime.clone();
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        match gui::pick_backend()? {
            Some(backend) => {
                let content =
                    content_for_publish(&paths, &buffer, &buffer_mime, backend.supports_cut())?;
                if !content.is_empty() {
                    let _ = backend.set(&content)?;
                }
                Ok(())
            }
            None => Ok(()),
        }
    })
    .await
    .context("join gui publish")??;

    // The terminal bridge can only carry text.
    let remote = content_for_publish(&ctx.paths, &ctx.buffer, &ctx.buffer_mime, false)?;
    match remote.data {
        ContentData::Text { text, .. } => osc52::write_remote(&text),
        _ => osc52::clear_remote(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_paths(dir: &std::path::Path) -> GlobalPaths {
        GlobalPaths {
            temporary: dir.join("tmp"),
            persistent: dir.join("persist"),
        }
    }

    #[test]
    fn ingest_text_creates_a_new_entry() {
        let dir = tempfile::tempdir().unwrap();
        let paths = test_paths(dir.path());
        let mut board = Clipboard::open(&paths, "0", 0).unwrap();
        assert!(ingest_text(&mut board, "from the gui").unwrap());
        assert_eq!(board.index.len(), 2);
        assert_eq!(
            std::fs::read_to_string(board.raw_data_path()).unwrap(),
            "from the gui"
        );
    }

    #[test]
    fn ingest_text_dedupes_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let paths = test_paths(dir.path());
        let mut board = Clipboard::open(&paths, "0", 0).unwrap();
        std::fs::write(board.raw_data_path(), "same").unwrap();
        assert!(!ingest_text(&mut board, "same").unwrap());
        assert_eq!(board.index.len(), 1);
    }

    #[test]
    fn ingest_text_ignores_truncated_echo() {
        let dir = tempfile::tempdir().unwrap();
        let paths = test_paths(dir.path());
        let mut board = Clipboard::open(&paths, "0", 0).unwrap();
        let long = "a".repeat(OSC52_CHUNK + 100);
        std::fs::write(board.raw_data_path(), &long).unwrap();
        let truncated = &long[..OSC52_CHUNK];
        assert!(!ingest_text(&mut board, truncated).unwrap());
    }

    #[test]
    fn ingest_text_respects_ignore_patterns() {
        let dir = tempfile::tempdir().unwrap();
        let paths = test_paths(dir.path());
        let mut board = Clipboard::open(&paths, "0", 0).unwrap();
        std::fs::write(board.ignore_path(), "^secret").unwrap();
        assert!(!ingest_text(&mut board, "secret stuff").unwrap());
        assert_eq!(board.index.len(), 1);
    }

    #[test]
    fn ingest_paths_copies_and_marks_cut() {
        let dir = tempfile::tempdir().unwrap();
        let paths = test_paths(dir.path());
        let mut board = Clipboard::open(&paths, "0", 0).unwrap();
        let src = dir.path().join("f.txt");
        std::fs::write(&src, "x").unwrap();

        ingest_paths(&mut board, vec![src.clone()], PathsAction::Cut).unwrap();
        assert!(board.data_dir().join("f.txt").exists());
        let originals = std::fs::read_to_string(board.originals_path()).unwrap();
        assert!(originals.contains("f.txt"));
    }

    #[test]
    fn stored_content_prefers_cut_originals() {
        let dir = tempfile::tempdir().unwrap();
        let paths = test_paths(dir.path());
        let board = Clipboard::open(&paths, "0", 0).unwrap();
        std::fs::write(board.raw_data_path(), "text").unwrap();
        std::fs::write(board.originals_path(), "/tmp/x\n").unwrap();

        let with_cut = stored_content(&paths, true).unwrap();
        assert!(matches!(
            with_cut.data,
            ContentData::Paths {
                action: PathsAction::Cut,
                ..
            }
        ));

        let without_cut = stored_content(&paths, false).unwrap();
        assert!(matches!(without_cut.data, ContentData::Text { .. }));
    }
}
