use std::path::PathBuf;

use anyhow::bail;

use crate::invocation::Ctx;

const FALLBACK_EDITORS: &[&str] = &["nano", "vim", "nvim", "micro", "gedit", "vi"];

fn preferred_editor(ctx: &Ctx) -> Option<String> {
    if let Some(item) = ctx.items.first() {
        return Some(item.to_string_lossy().into_owned());
    }
    for var in ["CLIPBOARD_EDITOR", "EDITOR", "VISUAL"] {
        if let Ok(editor) = std::env::var(var) {
            if !editor.is_empty() {
                return Some(editor);
            }
        }
    }
    None
}

fn fallback_editor() -> Option<String> {
    let path_var = std::env::var("PATH").ok()?;
    for dir in std::env::split_paths(&path_var) {
        for candidate in FALLBACK_EDITORS {
            if dir.join(candidate).exists() {
                return Some(candidate.to_string());
            }
        }
    }
    None
}

/// Open the current raw-data payload in an editor. Only text entries
/// can be edited.
pub async fn run(ctx: &mut Ctx) -> anyhow::Result<()> {
    if !ctx.board.holds_raw_data() {
        ctx.stop_indicator().await;
        if ctx.board.holds_data() {
            bail!("You can currently only edit text content. Try copying some text instead.");
        }
        bail!("You can't edit an empty clipboard. Try copying some text instead.");
    }

    let Some(editor) = preferred_editor(ctx).or_else(fallback_editor) else {
        ctx.stop_indicator().await;
        bail!("CB couldn't find a suitable editor to use. Try setting the CLIPBOARD_EDITOR environment variable.");
    };

    // Editor settings may carry arguments ("code -w").
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or(&editor).to_string();
    let args: Vec<String> = parts.map(str::to_string).collect();
    let raw: PathBuf = ctx.board.raw_data_path();

    ctx.stop_indicator().await;

    let status = tokio::process::Command::new(&program)
        .args(&args)
        .arg(&raw)
        .status()
        .await;
    match status {
        Ok(s) if s.success() => Ok(()),
        _ => bail!("CB couldn't open the editor. Try setting the CLIPBOARD_EDITOR environment variable."),
    }
}
