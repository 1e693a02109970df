use serde_json::{json, Map, Value};

use crate::clipboard::clipboards_with_content;
use crate::external;
use crate::invocation::Ctx;
use crate::terminal;
use crate::util::file_string;

/// Overview of every clipboard that holds something. Status syncs the
/// GUI in explicitly since the general sync skips it.
pub async fn run(ctx: &mut Ctx) -> anyhow::Result<()> {
    external::sync_from_external(ctx, true).await?;
    ctx.stop_indicator().await;

    let boards = clipboards_with_content(&ctx.paths);
    if boards.is_empty() {
        println!("There is currently nothing in any clipboard.");
        println!(
            "Try copying something with \"{} copy\" or pasting with \"{} paste\".",
            ctx.invocation, ctx.invocation
        );
        ctx.skip_summary = true;
        return Ok(());
    }

    let name_width = boards.iter().map(|b| b.name().len()).max().unwrap_or(1);
    let width = terminal::columns();

    for board in &boards {
        let remaining = width.saturating_sub(name_width + 3).max(8);
        let padded = format!("{:>name_width$}", board.name());
        println!("{} {}", terminal::bold(&padded), board.preview(remaining));
    }
    ctx.skip_summary = true;
    Ok(())
}

/// JSON status: object keyed by clipboard name; text content as a
/// string, file content as `{name, isDirectory}` rows.
pub fn json(ctx: &mut Ctx) -> anyhow::Result<()> {
    let boards = clipboards_with_content(&ctx.paths);

    let mut out = Map::new();
    for board in &boards {
        if board.holds_raw_data() {
            let content = file_string(&board.raw_data_path()).unwrap_or_default();
            out.insert(board.name().to_string(), Value::String(content));
        } else {
            let files: Vec<Value> = board
                .entry_files()
                .iter()
                .map(|p| {
                    json!({
                        "name": p.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default(),
                        "isDirectory": p.is_dir(),
                    })
                })
                .collect();
            out.insert(board.name().to_string(), Value::Array(files));
        }
    }

    println!("{}", serde_json::to_string_pretty(&Value::Object(out))?);
    ctx.skip_summary = true;
    Ok(())
}
