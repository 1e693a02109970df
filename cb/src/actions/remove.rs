use anyhow::{bail, Context};
use regex::Regex;

use crate::dispatch::IoMode;
use crate::ignore;
use crate::invocation::Ctx;

/// Remove content matching the given regexes: replaced with nothing in
/// text entries, deleted outright for file entries.
pub async fn run(ctx: &mut Ctx) -> anyhow::Result<()> {
    let patterns: Vec<Regex> = if ctx.io == IoMode::Pipe {
        let piped = ctx.read_piped_input().await?;
        let pattern = String::from_utf8_lossy(&piped).trim_end().to_string();
        vec![ignore::validate_pattern(&pattern)?]
    } else {
        ctx.item_strings()
            .iter()
            .map(|s| ignore::validate_pattern(s))
            .collect::<anyhow::Result<_>>()?
    };

    if ctx.board.holds_raw_data() {
        let raw = ctx.board.raw_data_path();
        let content = std::fs::read_to_string(&raw).context("read raw data")?;
        let scrubbed = ignore::scrub_text(&content, &patterns);
        if scrubbed.len() == content.len() {
            ctx.stop_indicator().await;
            bail!(
                "CB couldn't match your pattern(s) against anything. Try using a different pattern instead or check what's stored."
            );
        }
        ctx.progress
            .successes
            .add_bytes((content.len() - scrubbed.len()) as u64);
        std::fs::write(&raw, &scrubbed).context("write raw data")?;
        ctx.buffer = scrubbed;
        return Ok(());
    }

    for path in ctx.board.entry_files() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !patterns.iter().any(|p| p.is_match(&name)) {
            continue;
        }
        let is_dir = path.is_dir();
        let result = if is_dir {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        match result {
            Ok(()) if is_dir => ctx.progress.successes.add_directory(),
            Ok(()) => ctx.progress.successes.add_file(),
            Err(e) => ctx.add_failed(crate::content::FailedItem::new(name, e)),
        }
    }

    if ctx.progress.successes.items() == 0 {
        ctx.stop_indicator().await;
        bail!(
            "CB couldn't match your pattern(s) against anything. Try using a different pattern instead or check what's stored."
        );
    }
    Ok(())
}
