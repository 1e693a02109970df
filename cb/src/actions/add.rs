use std::sync::atomic::Ordering;

use anyhow::{bail, Context};
use tokio::io::AsyncWriteExt;

use crate::copy_engine;
use crate::dispatch::IoMode;
use crate::invocation::Ctx;

/// Add files to an entry that already holds files (or is empty).
pub async fn files(ctx: &mut Ctx) -> anyhow::Result<()> {
    if ctx.board.holds_raw_data() {
        ctx.stop_indicator().await;
        bail!("You can't add items to text. Try copying text first, or add text instead.");
    }

    ctx.progress
        .total_items
        .store(ctx.items.len() as u64, Ordering::Relaxed);

    let items = ctx.items.clone();
    let dest = ctx.board.data_dir().to_path_buf();
    let fast = ctx.flags.fast_copy;
    let progress = ctx.progress.clone();
    let failed = tokio::task::spawn_blocking(move || {
        copy_engine::copy_items(&items, &dest, fast, None, &progress.successes)
    })
    .await
    .context("join add batch")?;
    ctx.extend_failed(failed);
    Ok(())
}

/// Add text to an entry that holds text (or is empty). Mixing text and
/// files in one entry is refused.
pub async fn data(ctx: &mut Ctx) -> anyhow::Result<()> {
    let raw = ctx.board.raw_data_path();

    if ctx.board.holds_raw_data() {
        let content = incoming(ctx).await?;
        let mut f = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&raw)
            .await
            .context("open raw data")?;
        f.write_all(&content).await.context("append raw data")?;
        if ctx.io != IoMode::Pipe {
            // Piped bytes were already counted while reading.
            ctx.progress.successes.add_bytes(content.len() as u64);
        }
        return Ok(());
    }

    if !ctx.board.entry_files().is_empty() {
        ctx.stop_indicator().await;
        bail!("You can't add text to items. Try copying text first, or add a file instead.");
    }

    let content = incoming(ctx).await?;
    tokio::fs::write(&raw, &content).await.context("write raw data")?;
    if ctx.io != IoMode::Pipe {
        ctx.progress.successes.add_bytes(content.len() as u64);
    }
    ctx.buffer = String::from_utf8_lossy(&content).into_owned();
    Ok(())
}

async fn incoming(ctx: &mut Ctx) -> anyhow::Result<Vec<u8>> {
    if ctx.io == IoMode::Pipe {
        ctx.read_piped_input().await
    } else {
        Ok(ctx.single_item_string()?.into_bytes())
    }
}
