use std::sync::atomic::Ordering;

use anyhow::Context;

use crate::copy_engine;
use crate::dispatch::Action;
use crate::invocation::Ctx;

/// Cut/copy of real files into the current entry.
pub async fn files(ctx: &mut Ctx) -> anyhow::Result<()> {
    ctx.progress
        .total_items
        .store(ctx.items.len() as u64, Ordering::Relaxed);

    let items = ctx.items.clone();
    let dest = ctx.board.data_dir().to_path_buf();
    let fast = ctx.flags.fast_copy;
    let originals = (ctx.action == Action::Cut).then(|| ctx.board.originals_path());
    let progress = ctx.progress.clone();

    let failed = tokio::task::spawn_blocking(move || {
        copy_engine::copy_items(&items, &dest, fast, originals.as_deref(), &progress.successes)
    })
    .await
    .context("join copy batch")?;

    ctx.extend_failed(failed);
    ctx.progress
        .failed
        .store(ctx.failed.len() as u64, Ordering::Relaxed);
    Ok(())
}

/// Cut/copy of inline text: the items joined by single spaces become
/// the raw payload.
pub async fn text(ctx: &mut Ctx) -> anyhow::Result<()> {
    let text = ctx.item_strings().join(" ");
    tokio::fs::write(ctx.board.raw_data_path(), &text)
        .await
        .context("write raw data")?;

    if ctx.action == Action::Cut {
        tokio::fs::write(
            ctx.board.originals_path(),
            ctx.board.raw_data_path().display().to_string(),
        )
        .await
        .context("write originals")?;
    }

    ctx.buffer = text;

    if !ctx.flags.output_silent {
        ctx.stop_indicator().await;
        let shown: String = ctx.buffer.chars().take(250).collect();
        eprintln!("{} text \"{}\"", ctx.did(), shown);
    }
    Ok(())
}

/// Cut/copy from a pipe: stdin to EOF becomes the raw payload.
pub async fn pipe_in(ctx: &mut Ctx) -> anyhow::Result<()> {
    let content = ctx.read_piped_input().await?;
    tokio::fs::write(ctx.board.raw_data_path(), &content)
        .await
        .context("write raw data")?;

    if ctx.action == Action::Cut {
        tokio::fs::write(
            ctx.board.originals_path(),
            ctx.board.raw_data_path().display().to_string(),
        )
        .await
        .context("write originals")?;
    }

    ctx.buffer = String::from_utf8_lossy(&content).into_owned();
    Ok(())
}
