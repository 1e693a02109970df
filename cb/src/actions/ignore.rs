use anyhow::Context;

use crate::dispatch::IoMode;
use crate::ignore;
use crate::invocation::Ctx;

/// List, set, or clear this clipboard's ignore patterns. Every pattern
/// is validated before anything is persisted.
pub async fn run(ctx: &mut Ctx) -> anyhow::Result<()> {
    let patterns: Vec<String> = if ctx.io == IoMode::Pipe {
        let piped = ctx.read_piped_input().await?;
        vec![String::from_utf8_lossy(&piped).trim_end().to_string()]
    } else {
        ctx.item_strings()
    };

    if patterns.is_empty() {
        ctx.stop_indicator().await;
        let stored = ctx.board.ignore_pattern_lines();
        if stored.is_empty() {
            eprintln!("There are no ignore patterns for this clipboard.");
        } else if ctx.tty.stdout {
            eprintln!("Ignore patterns for this clipboard: {}", stored.join(", "));
        } else {
            print!("{}", stored.join(", "));
        }
        ctx.skip_summary = true;
        return Ok(());
    }

    if patterns.len() == 1 && patterns[0].is_empty() {
        let _ = std::fs::remove_file(ctx.board.ignore_path());
        if !ctx.flags.output_silent {
            ctx.stop_indicator().await;
            eprintln!("Removed ignore patterns");
        }
        ctx.skip_summary = true;
        return Ok(());
    }

    for pattern in &patterns {
        if let Err(e) = ignore::validate_pattern(pattern) {
            ctx.stop_indicator().await;
            return Err(e.context(format!(
                "The regex pattern you provided (\"{pattern}\") is invalid. Try using a different one instead."
            )));
        }
    }

    let mut content = String::new();
    for pattern in &patterns {
        content.push_str(pattern);
        content.push('\n');
    }
    std::fs::write(ctx.board.ignore_path(), content).context("write ignore patterns")?;

    if !ctx.flags.output_silent {
        ctx.stop_indicator().await;
        eprintln!("Saved ignore patterns {}", patterns.join(", "));
    }

    ctx.board
        .apply_ignore_patterns()
        .context("apply ignore patterns")?;
    ctx.skip_summary = true;
    Ok(())
}
