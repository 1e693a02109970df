use std::time::SystemTime;

use serde_json::json;

use crate::copy_engine::{available_space, directory_size};
use crate::external::sniff_text_mime;
use crate::format::{format_age, format_bytes};
use crate::invocation::Ctx;
use crate::util::file_string;

struct Report {
    name: String,
    created: Option<String>,
    last_changed: Option<String>,
    path: String,
    owner: Option<String>,
    is_persistent: bool,
    total_entries: usize,
    total_bytes_used: u64,
    total_bytes_remaining: Option<u64>,
    content_bytes: u64,
    content_type: String,
    files: u64,
    directories: u64,
    content_cut: bool,
    locked: bool,
    locked_by: Option<String>,
    note: Option<String>,
    ignore_patterns: Vec<String>,
}

fn age_of(time: std::io::Result<SystemTime>) -> Option<String> {
    let t = time.ok()?;
    let age = SystemTime::now().duration_since(t).ok()?;
    Some(format!("{} ago", format_age(age)))
}

fn gather(ctx: &Ctx) -> Report {
    let board = &ctx.board;
    let metadata = std::fs::metadata(board.root());

    let (content_bytes, content_type, files, directories) = if board.holds_raw_data() {
        let text = file_string(&board.raw_data_path()).unwrap_or_default();
        (text.len() as u64, sniff_text_mime(&text), 0, 0)
    } else {
        let mut files = 0u64;
        let mut directories = 0u64;
        for p in board.entry_files() {
            if p.is_dir() {
                directories += 1;
            } else {
                files += 1;
            }
        }
        (
            directory_size(board.data_dir()),
            "text/uri-list".to_string(),
            files,
            directories,
        )
    };

    Report {
        name: board.name().to_string(),
        created: metadata.as_ref().ok().and_then(|m| age_of(m.created())),
        last_changed: metadata.as_ref().ok().and_then(|m| age_of(m.modified())),
        path: board.root().display().to_string(),
        owner: board.locked_by(),
        is_persistent: board.is_persistent,
        total_entries: board.total_entries(),
        total_bytes_used: directory_size(board.root()),
        total_bytes_remaining: available_space(board.root()),
        content_bytes,
        content_type,
        files,
        directories,
        content_cut: board.originals_path().exists(),
        locked: board.is_locked(),
        locked_by: board.locked_by(),
        note: board.note(),
        ignore_patterns: board.ignore_pattern_lines(),
    }
}

/// Human-readable clipboard facts on stderr.
pub async fn run(ctx: &mut Ctx) -> anyhow::Result<()> {
    ctx.stop_indicator().await;
    let r = gather(ctx);

    eprintln!("Info for clipboard {}", r.name);
    if let Some(created) = &r.created {
        eprintln!("Created {created}");
    }
    if let Some(changed) = &r.last_changed {
        eprintln!("Last changed {changed}");
    }
    eprintln!("Stored in {}", r.path);
    eprintln!("Persistent? {}", if r.is_persistent { "Yes" } else { "No" });
    eprintln!("Total entries: {}", r.total_entries);
    eprintln!("Total size: {}", format_bytes(r.total_bytes_used));
    if let Some(remaining) = r.total_bytes_remaining {
        eprintln!("Space remaining: {}", format_bytes(remaining));
    }
    eprintln!("Content size: {}", format_bytes(r.content_bytes));
    eprintln!("Content type: {}", r.content_type);
    if r.files > 0 || r.directories > 0 {
        eprintln!("Files: {}", r.files);
        eprintln!("Directories: {}", r.directories);
    }
    if !ctx.available_types.is_empty() {
        eprintln!("Available types from GUI: {}", ctx.available_types.join(", "));
    }
    eprintln!("Content cut? {}", if r.content_cut { "Yes" } else { "No" });
    eprintln!(
        "Locked by another process? {}",
        if r.locked { "Yes" } else { "No" }
    );
    if let Some(pid) = &r.locked_by {
        eprintln!("Locked by process with pid {pid}");
    }
    match &r.note {
        Some(note) => eprintln!("Note: {note}"),
        None => eprintln!("There is no note for this clipboard."),
    }
    if r.ignore_patterns.is_empty() {
        eprintln!("There are no ignore regexes for this clipboard.");
    } else {
        eprintln!("Ignore regexes: {}", r.ignore_patterns.join(", "));
    }
    ctx.skip_summary = true;
    Ok(())
}

/// The same facts as a stable JSON object.
pub fn json(ctx: &mut Ctx) -> anyhow::Result<()> {
    let r = gather(ctx);
    let out = json!({
        "name": r.name,
        "created": r.created,
        "lastChanged": r.last_changed,
        "path": r.path,
        "owner": r.owner,
        "isPersistent": r.is_persistent,
        "totalEntries": r.total_entries,
        "totalBytesUsed": r.total_bytes_used,
        "totalBytesRemaining": r.total_bytes_remaining,
        "contentBytes": r.content_bytes,
        "contentType": r.content_type,
        "files": r.files,
        "directories": r.directories,
        "availableTypes": ctx.available_types,
        "contentCut": r.content_cut,
        "locked": r.locked,
        "lockedBy": r.locked_by,
        "note": r.note.unwrap_or_default(),
        "ignoreRegexes": r.ignore_patterns,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    ctx.skip_summary = true;
    Ok(())
}
