use anyhow::{bail, Context};

use crate::invocation::Ctx;

/// Set, clear, or print this clipboard's note.
pub async fn text(ctx: &mut Ctx) -> anyhow::Result<()> {
    match ctx.items.len() {
        1 => {
            let note = ctx.single_item_string()?;
            if note.is_empty() {
                let _ = std::fs::remove_file(ctx.board.notes_path());
                if !ctx.flags.output_silent {
                    ctx.stop_indicator().await;
                    eprintln!("Removed note");
                }
            } else {
                std::fs::write(ctx.board.notes_path(), &note).context("write note")?;
                if !ctx.flags.output_silent {
                    ctx.stop_indicator().await;
                    eprintln!("Saved note \"{note}\"");
                }
            }
            ctx.skip_summary = true;
            Ok(())
        }
        0 => {
            ctx.stop_indicator().await;
            match ctx.board.note() {
                Some(note) if ctx.tty.stdout => println!("Note for this clipboard: {note}"),
                Some(note) => print!("{note}"),
                None => eprintln!("There is no note for this clipboard."),
            }
            ctx.skip_summary = true;
            Ok(())
        }
        _ => {
            ctx.stop_indicator().await;
            bail!("You can't add multiple items to a note. Try providing a single piece of text instead.");
        }
    }
}

/// A piped note is stored as-is and ends the invocation.
pub async fn pipe(ctx: &mut Ctx) -> anyhow::Result<()> {
    let content = ctx.read_piped_input().await?;
    std::fs::write(ctx.board.notes_path(), &content).context("write note")?;
    if !ctx.flags.output_silent {
        ctx.stop_indicator().await;
        eprintln!("Saved note \"{}\"", String::from_utf8_lossy(&content));
    }
    ctx.skip_summary = true;
    Ok(())
}
