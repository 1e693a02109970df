use anyhow::Result;
use regex::Regex;

use crate::ignore;
use crate::invocation::Ctx;
use crate::terminal;
use crate::util::file_string;

fn filters(ctx: &Ctx) -> Result<Vec<Regex>> {
    ctx.item_strings()
        .iter()
        .map(|s| ignore::validate_pattern(s))
        .collect()
}

/// Show what the current entry holds: up to 250 characters of text, or
/// the (optionally filtered) item list.
pub async fn run(ctx: &mut Ctx) -> Result<()> {
    let filters = filters(ctx)?;
    ctx.stop_indicator().await;

    if ctx.board.holds_raw_data() {
        let content = file_string(&ctx.board.raw_data_path()).unwrap_or_default();
        let flat: String = content.chars().filter(|c| *c != '\n').collect();
        let shown: String = flat.chars().take(250).collect();
        println!(
            "Here are the first {} characters of clipboard {}:",
            shown.chars().count(),
            ctx.board.name()
        );
        println!("{}", terminal::bold(&shown));
        let total = flat.chars().count();
        if total > 250 {
            println!("...and {} more characters", total - 250);
        }
        ctx.skip_summary = true;
        return Ok(());
    }

    println!("Here are the items of clipboard {}:", ctx.board.name());
    for path in ctx.board.entry_files() {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !filters.is_empty() && !filters.iter().any(|f| f.is_match(&name)) {
            continue;
        }
        if path.is_dir() {
            println!("{}", terminal::underline(&name));
        } else {
            println!("{}", terminal::bold(&name));
        }
    }
    ctx.skip_summary = true;
    Ok(())
}

/// Pipe-mode show: quoted absolute paths on one line, for shells.
pub fn filepaths(ctx: &mut Ctx) -> Result<()> {
    let filters = filters(ctx)?;

    let mut paths = ctx.board.entry_files();
    if !filters.is_empty() {
        paths.retain(|p| {
            let name = p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            filters.iter().any(|f| f.is_match(&name))
        });
    }

    let line: Vec<String> = paths
        .iter()
        .map(|p| format!("\"{}\"", p.display()))
        .collect();
    print!("{}", line.join(" "));

    for p in &paths {
        if p.is_dir() {
            ctx.progress.successes.add_directory();
        } else {
            ctx.progress.successes.add_file();
        }
    }
    ctx.skip_summary = true;
    Ok(())
}
