use anyhow::{bail, Context};

use crate::clipboard::Clipboard;
use crate::consts::DEFAULT_CLIPBOARD_NAME;
use crate::content::FailedItem;
use crate::copy_engine;
use crate::external;
use crate::invocation::Ctx;

/// Copy the current entry of this clipboard into the current entries
/// of the named destinations (the default clipboard when none are
/// given).
pub async fn run(ctx: &mut Ctx) -> anyhow::Result<()> {
    if !ctx.board.holds_data() {
        ctx.stop_indicator().await;
        bail!("The clipboard you're trying to load from is empty. Try choosing a different source instead.");
    }

    let destinations: Vec<String> = if ctx.items.is_empty() {
        vec![DEFAULT_CLIPBOARD_NAME.to_string()]
    } else {
        ctx.item_strings()
    };

    if destinations.iter().any(|d| d == ctx.board.name()) {
        ctx.stop_indicator().await;
        bail!("You can't load a clipboard into itself. Try choosing different destinations.");
    }

    let sources = {
        let mut v: Vec<std::path::PathBuf> = std::fs::read_dir(ctx.board.data_dir())
            .context("read source entry")?
            .flatten()
            .map(|e| e.path())
            .collect();
        v.sort();
        v
    };

    for destination_name in &destinations {
        let destination = match Clipboard::open(&ctx.paths, destination_name, 0) {
            Ok(d) => d,
            Err(e) => {
                ctx.add_failed(FailedItem::new(destination_name.clone(), e));
                continue;
            }
        };

        let mut ok = true;
        for source in &sources {
            if let Err(e) =
                copy_engine::copy_item(source, destination.data_dir(), ctx.flags.fast_copy)
            {
                ctx.add_failed(FailedItem::new(destination_name.clone(), e));
                ok = false;
                break;
            }
        }
        if ok {
            destination
                .apply_ignore_patterns()
                .context("apply ignore patterns to destination")?;
            ctx.progress.successes.add_clipboard();
        }
    }

    if destinations.iter().any(|d| d == DEFAULT_CLIPBOARD_NAME) {
        external::publish_to_external(ctx, true)
            .await
            .context("publish after load")?;
    }
    Ok(())
}
