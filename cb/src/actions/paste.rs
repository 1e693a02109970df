use std::sync::atomic::Ordering;

use anyhow::Context;
use regex::Regex;
use tokio::io::AsyncWriteExt;
use walkdir::WalkDir;

use crate::copy_engine;
use crate::ignore;
use crate::invocation::Ctx;

fn item_filters(ctx: &Ctx) -> anyhow::Result<Vec<Regex>> {
    ctx.item_strings()
        .iter()
        .map(|s| ignore::validate_pattern(s))
        .collect()
}

/// Paste the current entry's items into the working directory,
/// consulting the collision policy.
pub async fn files(ctx: &mut Ctx) -> anyhow::Result<()> {
    let entry_dir = ctx.board.data_dir().to_path_buf();
    let dest = std::env::current_dir().context("current dir")?;
    let filters = item_filters(ctx)?;

    let item_count = std::fs::read_dir(&entry_dir)
        .map(|r| r.count())
        .unwrap_or(0);
    ctx.progress
        .total_items
        .store(item_count as u64, Ordering::Relaxed);

    let fast = ctx.flags.fast_copy;
    let robot = ctx.user_is_robot();
    let progress = ctx.progress.clone();
    let starting_policy = ctx.policy;

    let (failed, policy) = tokio::task::spawn_blocking(move || {
        let mut policy = starting_policy;
        let failed = copy_engine::paste_entry(
            &entry_dir,
            &dest,
            fast,
            &mut policy,
            &filters,
            &progress.successes,
            |name| {
                // The prompt owns the terminal while it's up.
                progress.pause();
                let decision = copy_engine::user_decision(name, robot);
                progress.resume();
                decision
            },
        );
        (failed, policy)
    })
    .await
    .context("join paste batch")?;

    ctx.policy = policy;
    ctx.extend_failed(failed);
    ctx.progress
        .failed
        .store(ctx.failed.len() as u64, Ordering::Relaxed);

    remove_originals(ctx).await
}

/// Stream every file of the current entry to stdout in directory
/// order, then honour any pending cut.
pub async fn pipe_out(ctx: &mut Ctx) -> anyhow::Result<()> {
    let entry_dir = ctx.board.data_dir().to_path_buf();

    let mut files: Vec<std::path::PathBuf> = WalkDir::new(&entry_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();

    let mut stdout = tokio::io::stdout();
    for file in files {
        let bytes = tokio::fs::read(&file)
            .await
            .with_context(|| format!("read {}", file.display()))?;
        stdout.write_all(&bytes).await.context("write stdout")?;
        ctx.progress.successes.add_bytes(bytes.len() as u64);
    }
    stdout.flush().await.ok();

    remove_originals(ctx).await
}

async fn remove_originals(ctx: &mut Ctx) -> anyhow::Result<()> {
    let originals = ctx.board.originals_path();
    let failed = tokio::task::spawn_blocking(move || copy_engine::remove_originals(&originals))
        .await
        .context("join originals removal")?;
    ctx.extend_failed(failed);
    Ok(())
}
