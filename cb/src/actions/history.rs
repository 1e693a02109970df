use anyhow::Context;
use serde_json::json;

use crate::clipboard::Clipboard;
use crate::consts::DEFAULT_CLIPBOARD_NAME;
use crate::content::FailedItem;
use crate::external;
use crate::format::{format_age, number_width};
use crate::invocation::Ctx;
use crate::terminal;

/// List the entry history, or re-promote the listed entries when
/// positions are given.
pub async fn run(ctx: &mut Ctx) -> anyhow::Result<()> {
    if !ctx.items.is_empty() {
        return promote(ctx).await;
    }

    ctx.stop_indicator().await;

    let name = ctx.board.name().to_string();
    eprintln!("Entry history for clipboard {}", terminal::bold(&name));

    let width = terminal::columns();
    let entry_width = number_width(ctx.board.total_entries().saturating_sub(1) as u64);

    let mut probe = Clipboard::open(&ctx.paths, &name, 0)?;
    for position in 0..probe.total_entries() {
        probe.set_entry(position)?;
        let age = probe
            .entry_age(position)
            .map(format_age)
            .unwrap_or_else(|| "n/a".to_string());
        let remaining = width.saturating_sub(entry_width + age.len() + 8).max(8);
        println!(
            "{:>entry_width$}  {:>10}  {}",
            position,
            age,
            probe.preview(remaining)
        );
    }
    Ok(())
}

/// Each listed entry position is moved into a fresh new entry, newest
/// last, so the promoted content becomes current.
async fn promote(ctx: &mut Ctx) -> anyhow::Result<()> {
    // Resolve positions against the index before any renames shift it.
    let mut sources = Vec::new();
    for item in ctx.item_strings() {
        match item.parse::<usize>() {
            Ok(position) => match ctx.board.entry_dir_at(position) {
                Some(dir) => sources.push(dir),
                None => ctx.add_failed(FailedItem::new(item, "no such history entry")),
            },
            Err(e) => ctx.add_failed(FailedItem::new(item, e)),
        }
    }

    let mut promoted = 0u64;
    for source in sources {
        ctx.board.make_new_entry()?;
        // make_new_entry creates an empty directory; replace it with
        // the promoted one wholesale.
        std::fs::remove_dir(ctx.board.data_dir()).context("clear new entry")?;
        match std::fs::rename(&source, ctx.board.data_dir()) {
            Ok(()) => promoted += 1,
            Err(e) => ctx.add_failed(FailedItem::new(source.display().to_string(), e)),
        }
    }

    ctx.stop_indicator().await;
    if !ctx.flags.output_silent {
        eprintln!("Queued up {promoted} entries");
    }

    if ctx.board.name() == DEFAULT_CLIPBOARD_NAME {
        external::publish_to_external(ctx, true)
            .await
            .context("publish after promotion")?;
    }
    ctx.skip_summary = true;
    Ok(())
}

/// Machine-readable history listing for pipes.
pub fn json(ctx: &mut Ctx) -> anyhow::Result<()> {
    let name = ctx.board.name().to_string();
    let mut entries = Vec::new();
    let mut probe = Clipboard::open(&ctx.paths, &name, 0)?;
    for position in 0..probe.total_entries() {
        probe.set_entry(position)?;
        let age = probe.entry_age(position).map(format_age);
        entries.push(json!({
            "entry": position,
            "age": age,
            "holdsText": probe.holds_raw_data(),
            "preview": probe.preview(250),
        }));
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "name": name,
            "entries": entries,
        }))?
    );
    Ok(())
}
