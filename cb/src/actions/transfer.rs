use std::path::PathBuf;

use anyhow::{bail, Context};

use crate::clipboard::Clipboard;
use crate::consts::{IMPORT_EXPORT_DIR, LOCK_FILE, METADATA_DIR};
use crate::content::{CopyPolicy, FailedItem};
use crate::copy_engine;
use crate::invocation::Ctx;
use crate::paths;

/// Import whole clipboard trees from an `Exported_Clipboards`
/// directory, honouring the name → persistence mapping.
pub async fn import(ctx: &mut Ctx) -> anyhow::Result<()> {
    let import_dir = ctx
        .items
        .first()
        .cloned()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default().join(IMPORT_EXPORT_DIR));

    if !import_dir.exists() {
        ctx.stop_indicator().await;
        bail!("The directory you're trying to import from doesn't exist. Try choosing a different one instead.");
    }
    if !import_dir.is_dir() {
        ctx.stop_indicator().await;
        bail!("The directory you're trying to import from isn't a directory. Try choosing a different one instead.");
    }

    let robot = ctx.user_is_robot();
    for entry in std::fs::read_dir(&import_dir).context("read import dir")?.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !entry.path().is_dir() {
            ctx.add_failed(FailedItem::new(name, "not a directory"));
            continue;
        }

        let target_root = if paths::is_persistent_name(&name) {
            &ctx.paths.persistent
        } else {
            &ctx.paths.temporary
        };
        let target = target_root.join(&name);

        if target.exists() {
            let effective = match ctx.policy {
                CopyPolicy::SkipAll => CopyPolicy::SkipAll,
                CopyPolicy::ReplaceAll => CopyPolicy::ReplaceAll,
                _ => {
                    ctx.progress.pause();
                    let decision = copy_engine::user_decision(&name, robot);
                    ctx.progress.resume();
                    ctx.policy = decision;
                    decision
                }
            };
            if matches!(effective, CopyPolicy::SkipAll | CopyPolicy::SkipOnce) {
                continue;
            }
        }

        match copy_engine::copy_dir_recursive(&entry.path(), &target, false) {
            Ok(()) => ctx.progress.successes.add_clipboard(),
            Err(e) => ctx.add_failed(FailedItem::new(name, e)),
        }
    }
    Ok(())
}

/// Export clipboards (all of them, or the named ones) into
/// `./Exported_Clipboards/`, leaving lock files behind.
pub async fn export(ctx: &mut Ctx) -> anyhow::Result<()> {
    let mut names: Vec<String> = if ctx.items.is_empty() {
        let mut all = Vec::new();
        for root in [&ctx.paths.temporary, &ctx.paths.persistent] {
            if let Ok(read) = std::fs::read_dir(root) {
                all.extend(
                    read.flatten()
                        .map(|e| e.file_name().to_string_lossy().into_owned()),
                );
            }
        }
        all
    } else {
        ctx.item_strings()
    };
    names.sort();
    names.dedup();

    let export_dir = std::env::current_dir()
        .context("current dir")?
        .join(IMPORT_EXPORT_DIR);
    if export_dir.exists() {
        std::fs::remove_dir_all(&export_dir).context("remove old export dir")?;
    }
    std::fs::create_dir_all(&export_dir).with_context(|| {
        "CB couldn't create the export directory. Try checking if you have the right permissions."
    })?;

    for name in &names {
        if let Err(e) = export_one(ctx, name, &export_dir).await {
            ctx.add_failed(FailedItem::new(name.clone(), e));
        }
    }

    if ctx.progress.successes.clipboards() == 0 {
        ctx.stop_indicator().await;
        bail!("There is nothing to export.");
    }
    Ok(())
}

async fn export_one(ctx: &mut Ctx, name: &str, export_dir: &PathBuf) -> anyhow::Result<()> {
    let mut board = Clipboard::open(&ctx.paths, name, 0)?;
    board.acquire_lock().await?;
    if board.is_unused() {
        board.release_lock();
        return Ok(());
    }

    let target = export_dir.join(name);
    let result = copy_engine::copy_dir_recursive(board.root(), &target, false);
    // The export must not carry our (or anyone's) lock.
    let _ = std::fs::remove_file(target.join(METADATA_DIR).join(LOCK_FILE));
    board.release_lock();
    result?;

    ctx.progress.successes.add_clipboard();
    Ok(())
}
