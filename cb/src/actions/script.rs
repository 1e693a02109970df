use anyhow::{bail, Context};

use crate::clipboard::Clipboard;
use crate::dispatch::IoMode;
use crate::invocation::Ctx;
use crate::util::file_string;

#[cfg(unix)]
fn make_executable(path: &std::path::Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o100);
    std::fs::set_permissions(path, perms)
}

#[cfg(not(unix))]
fn make_executable(_path: &std::path::Path) -> std::io::Result<()> {
    Ok(())
}

/// Install, print, or remove this clipboard's script hook.
pub async fn run(ctx: &mut Ctx) -> anyhow::Result<()> {
    let script = ctx.board.script_path();

    if ctx.io == IoMode::File {
        if ctx.items.len() > 1 {
            ctx.stop_indicator().await;
            bail!("You can only set one script file to run. Try providing a single script file instead.");
        }
        let source = ctx.items[0].clone();
        let _ = std::fs::remove_file(&script);
        std::fs::copy(&source, &script).context("install script")?;
        make_executable(&script).context("mark script executable")?;
        if !ctx.flags.output_silent {
            ctx.stop_indicator().await;
            eprintln!("Saved script \"{}\"", file_string(&script).unwrap_or_default().trim_end());
        }
        ctx.skip_summary = true;
        return Ok(());
    }

    if ctx.items.is_empty() {
        ctx.stop_indicator().await;
        match file_string(&script) {
            Some(content) => eprintln!("Here is this clipboard's current script: {}", content.trim_end()),
            None => eprintln!(
                "There is currently no script set for this clipboard. To set one, add it to the end, like \"{} script myscript.sh\".",
                ctx.invocation
            ),
        }
        ctx.skip_summary = true;
        return Ok(());
    }

    let joined = ctx.item_strings().join(" ");
    if joined.is_empty() {
        let _ = std::fs::remove_file(&script);
        if !ctx.flags.output_silent {
            ctx.stop_indicator().await;
            eprintln!("Removed script");
        }
        ctx.skip_summary = true;
        return Ok(());
    }

    let _ = std::fs::remove_file(&script);
    std::fs::write(&script, &joined).context("write script")?;
    make_executable(&script).context("mark script executable")?;
    if !ctx.flags.output_silent {
        ctx.stop_indicator().await;
        eprintln!("Saved script \"{joined}\"");
    }
    ctx.skip_summary = true;
    Ok(())
}

/// Run the clipboard's script hook, if any, around the action. Hook
/// failures are logged, never fatal.
pub async fn run_hook(board: &Clipboard, phase: &str, action_name: &str) {
    let script = board.script_path();
    if !script.is_file() {
        return;
    }

    let mut command = match std::env::var("CLIPBOARD_SCRIPT_RUNNER") {
        Ok(runner) if !runner.is_empty() => {
            let mut c = tokio::process::Command::new(runner);
            c.arg(&script);
            c
        }
        _ => tokio::process::Command::new(&script),
    };

    match command
        .arg(phase)
        .arg(action_name)
        .current_dir(board.data_dir())
        .status()
        .await
    {
        Ok(status) if !status.success() => {
            log::warn!("clipboard script exited with {status}");
        }
        Err(e) => log::warn!("clipboard script failed to run: {e}"),
        _ => {}
    }
}
