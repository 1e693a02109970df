use anyhow::{bail, Context};

use crate::clipboard::Clipboard;
use crate::consts::DEFAULT_CLIPBOARD_NAME;
use crate::content::FailedItem;
use crate::copy_engine;
use crate::external;
use crate::invocation::Ctx;

/// Exchange the current entries of two clipboards through `.swap`
/// sibling directories so a failure can't leave either side empty.
pub async fn run(ctx: &mut Ctx) -> anyhow::Result<()> {
    if ctx.items.len() > 1 {
        ctx.stop_indicator().await;
        bail!(
            "You can only swap one clipboard at a time. Try making sure there's only one other clipboard specified, like \"{} swap 5\".",
            ctx.invocation
        );
    }

    let destination_name = ctx
        .items
        .first()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_CLIPBOARD_NAME.to_string());

    if destination_name == ctx.board.name() {
        ctx.stop_indicator().await;
        bail!(
            "You can't swap a clipboard with itself. Try choosing a different clipboard to swap with, like \"{} swap 5\".",
            ctx.invocation
        );
    }

    let destination = Clipboard::open(&ctx.paths, &destination_name, 0)?;

    let ours = ctx.board.data_dir().to_path_buf();
    let theirs = destination.data_dir().to_path_buf();
    let ours_swap = ours.with_extension("swap");
    let theirs_swap = theirs.with_extension("swap");

    let result = (|| -> std::io::Result<()> {
        copy_engine::copy_dir_recursive(&theirs, &ours_swap, false)?;
        copy_engine::copy_dir_recursive(&ours, &theirs_swap, false)?;
        std::fs::remove_dir_all(&ours)?;
        std::fs::remove_dir_all(&theirs)?;
        std::fs::rename(&ours_swap, &ours)?;
        std::fs::rename(&theirs_swap, &theirs)?;
        Ok(())
    })();
    if let Err(e) = result {
        ctx.add_failed(FailedItem::new(destination_name.clone(), e));
        return Ok(());
    }

    ctx.stop_indicator().await;
    if !ctx.flags.output_silent {
        eprintln!("Swapped clipboard {} with {}", ctx.board.name(), destination_name);
    }

    if destination_name == DEFAULT_CLIPBOARD_NAME {
        external::publish_to_external(ctx, true)
            .await
            .context("publish after swap")?;
    }
    Ok(())
}
