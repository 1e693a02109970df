use std::io::{BufRead, Write};

use anyhow::Context;

use crate::clipboard::Clipboard;
use crate::invocation::Ctx;

/// `clear` pushes a fresh empty entry (done before dispatch) and drops
/// the metadata; `clear --all` wipes every clipboard after confirming.
pub async fn run(ctx: &mut Ctx) -> anyhow::Result<()> {
    if ctx.flags.all {
        return clear_everything(ctx).await;
    }

    let _ = std::fs::remove_file(ctx.board.originals_path());
    let _ = std::fs::remove_file(ctx.board.notes_path());
    let _ = std::fs::remove_file(ctx.board.ignore_path());

    ctx.stop_indicator().await;
    if !ctx.flags.output_silent {
        eprintln!("Cleared clipboard");
    }
    Ok(())
}

async fn clear_everything(ctx: &mut Ctx) -> anyhow::Result<()> {
    // There is nobody to confirm with.
    if ctx.user_is_robot() {
        return Ok(());
    }

    ctx.stop_indicator().await;
    eprint!(
        "Are you sure you want to clear all clipboards? This will remove everything in {} and {}. [y(es)/n(o)] ",
        ctx.paths.temporary.display(),
        ctx.paths.persistent.display()
    );
    std::io::stderr().flush().ok();

    let mut decision = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut decision)
        .context("read confirmation")?;
    if !decision.trim_start().to_ascii_lowercase().starts_with('y') {
        return Ok(());
    }

    let mut cleared = 0u64;
    for root in [ctx.paths.temporary.clone(), ctx.paths.persistent.clone()] {
        let Ok(read) = std::fs::read_dir(&root) else {
            continue;
        };
        for entry in read.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let held_data = Clipboard::open(&ctx.paths, &name, 0)
                .map(|cb| cb.holds_data())
                .unwrap_or(false);
            if std::fs::remove_dir_all(entry.path()).is_ok() && held_data {
                cleared += 1;
            }
        }
    }

    eprintln!("Cleared {cleared} clipboard{}", if cleared == 1 { "" } else { "s" });
    ctx.skip_summary = true;
    Ok(())
}
