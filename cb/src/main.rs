use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;

use cb::actions;
use cb::actions::script;
use cb::clipboard::Clipboard;
use cb::consts::DEFAULT_CLIPBOARD_NAME;
use cb::content::CopyPolicy;
use cb::copy_engine;
use cb::dispatch::{
    self, default_action, io_mode_for, is_write_action, needs_new_entry, resolve_action,
    split_selector, verify_io, Action, IoMode, Selector,
};
use cb::external;
use cb::format::format_bytes;
use cb::indicator::{phase, Indicator, Progress};
use cb::invocation::{Ctx, Flags};
use cb::locales::Catalog;
use cb::paths::global_paths;
use cb::terminal::Tty;
use cb::util::{deduplicate, env_var_is_true, file_string};

#[derive(Parser)]
#[command(
    name = "cb",
    about = "Cut, copy, and paste anything, anywhere, all from the terminal.",
    disable_help_subcommand = true
)]
struct Cli {
    /// The action, optionally fused with a clipboard selector
    /// (e.g. "copy", "cp5", "paste_work-2").
    action: Option<String>,

    /// Items (files, text, or patterns) the action operates on.
    items: Vec<String>,

    /// Choose a clipboard by name.
    #[arg(short = 'c', long = "clipboard")]
    clipboard: Option<String>,

    /// Choose a history entry (0 is the newest).
    #[arg(short = 'e', long = "entry")]
    entry: Option<usize>,

    /// Apply the action to all clipboards.
    #[arg(short = 'a', long = "all")]
    all: bool,

    /// Use hardlinks instead of full copies where possible.
    #[arg(long = "fast-copy")]
    fast_copy: bool,

    /// Preferred MIME type when talking to the GUI clipboard.
    #[arg(short = 'm', long = "mime")]
    mime: Option<String>,

    /// Don't show the progress indicator.
    #[arg(long = "no-progress")]
    no_progress: bool,

    /// Don't ask for confirmation.
    #[arg(long = "no-confirmation")]
    no_confirmation: bool,

    #[arg(long = "bachata", hide = true)]
    bachata: bool,

    /// Internal: serve the X11 selection for the default clipboard.
    #[arg(long = "x11-daemon", hide = true)]
    x11_daemon: bool,
}

/// The historical spellings `-fc`, `-np`, and `-nc` predate the long
/// flags and still work.
fn normalize_args(args: impl Iterator<Item = String>) -> Vec<String> {
    args.map(|a| {
        match a.as_str() {
            "-fc" => "--fast-copy".to_string(),
            "-np" => "--no-progress".to_string(),
            "-nc" => "--no-confirmation".to_string(),
            _ => a,
        }
    })
    .collect()
}

fn print_help(catalog: &Catalog, invocation: &str) {
    println!("Usage: {invocation} [action][selector] [items...] [flags]");
    println!();
    println!("Actions:");
    for &action in dispatch::WIRED_ACTIONS {
        println!(
            "  {:>10}, {:<4} {}",
            catalog.name(action),
            catalog.shortcut(action),
            catalog.description(action)
        );
    }
    println!();
    println!("Selectors: a clipboard name or number fused onto the action, with an");
    println!("optional history entry, like \"{invocation} cp5\" or \"{invocation} paste_work-2\".");
    println!();
    println!("Flags: -c/--clipboard, -e/--entry, -a/--all, -fc/--fast-copy,");
    println!("       -m/--mime, -np/--no-progress, -nc/--no-confirmation, -h/--help");
}

#[tokio::main]
async fn main() {
    // Enable logging when the user sets RUST_LOG (kept quiet by default).
    // Useful for diagnosing clipboard edge cases.
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();

    match run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

async fn run() -> anyhow::Result<i32> {
    let mut raw = std::env::args();
    let argv0 = raw.next().unwrap_or_else(|| "cb".to_string());
    let invocation = PathBuf::from(&argv0)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or(argv0.clone());

    let mut argv = vec![argv0];
    argv.extend(normalize_args(raw));
    let cli = Cli::parse_from(argv);

    if cli.x11_daemon {
        #[cfg(all(unix, not(target_os = "macos")))]
        cb::gui::x11::daemon_main()?;
        return Ok(0);
    }

    if cli.bachata {
        println!("Here's some nice bachata music from Aventura! https://www.youtube.com/watch?v=RxIM2bMBhCo");
        println!("How about some in English? https://www.youtube.com/watch?v=jnD8Av4Dl4o");
        println!("Here's one from Romeo, the head of Aventura: https://www.youtube.com/watch?v=yjdHGmRKz08");
        return Ok(0);
    }

    let catalog = Catalog::from_env();
    let tty = Tty::detect();

    if cli.action.as_deref() == Some("help") {
        print_help(&catalog, &invocation);
        return Ok(0);
    }

    let (action, selector) = match &cli.action {
        Some(token) => {
            let (verb, selector) = split_selector(token);
            if verb.is_empty() {
                (default_action(&tty), selector)
            } else {
                (resolve_action(&verb, &catalog, &invocation)?, selector)
            }
        }
        None => (default_action(&tty), Selector::default()),
    };

    let clipboard_name = cli
        .clipboard
        .clone()
        .or(selector.clipboard)
        .unwrap_or_else(|| DEFAULT_CLIPBOARD_NAME.to_string());
    let entry = cli.entry.or(selector.entry).unwrap_or(0);

    let items: Vec<PathBuf> = cli.items.iter().map(PathBuf::from).collect();
    let io = io_mode_for(action, &items, &tty);
    verify_io(action, io, items.len(), &invocation)?;

    let flags = Flags {
        all: cli.all,
        fast_copy: cli.fast_copy,
        no_confirmation: cli.no_confirmation,
        preferred_mime: cli.mime.clone(),
        output_silent: env_var_is_true("CLIPBOARD_SILENT"),
        progress_silent: cli.no_progress || env_var_is_true("CLIPBOARD_NOPROGRESS"),
    };

    let paths = global_paths();
    std::fs::create_dir_all(&paths.temporary).context("create temporary root")?;
    std::fs::create_dir_all(&paths.persistent).context("create persistent root")?;

    let mut board = Clipboard::open(&paths, &clipboard_name, entry)?;

    let max_history = std::env::var("CLIPBOARD_HISTORY")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);

    let progress = Progress::new();

    // SIGINT: flip the indicator to Cancel, drop the lock, leave. No
    // locks are touched on this path.
    {
        let progress = progress.clone();
        let lock_path = board.lock_path();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                progress.cancel();
                eprintln!();
                let _ = std::fs::remove_file(&lock_path);
                std::process::exit(1);
            }
        });
    }

    if action != Action::Info {
        board.acquire_lock().await?;
    }

    let indicator_enabled = tty.stderr && !flags.progress_silent && !flags.output_silent;
    let indicator = Indicator::start(progress.clone(), io, catalog.doing(action), indicator_enabled);

    let mut ctx = Ctx {
        action,
        io,
        items,
        board,
        paths: paths.clone(),
        flags,
        tty,
        catalog,
        invocation,
        progress,
        indicator,
        policy: CopyPolicy::Unknown,
        failed: Vec::new(),
        buffer: String::new(),
        buffer_mime: String::new(),
        available_types: Vec::new(),
        max_history,
        skip_summary: false,
    };

    // A persisted preferred MIME fills in when the flag is absent, and
    // the flag refreshes it on write actions.
    if ctx.flags.preferred_mime.is_none() {
        ctx.flags.preferred_mime =
            file_string(&ctx.board.mime_path()).map(|s| s.trim().to_string());
    }
    if let Some(mime) = &cli.mime {
        if is_write_action(action) {
            let _ = std::fs::write(ctx.board.mime_path(), mime);
        }
    }

    external::sync_from_external(&mut ctx, false).await?;

    if action != Action::Ignore && io != IoMode::Pipe {
        let patterns = ctx.board.ignore_patterns();
        cb::ignore::filter_items(&mut ctx.items, &patterns);
    }
    deduplicate(&mut ctx.items);

    if matches!(action, Action::Cut | Action::Copy | Action::Add | Action::Remove)
        && io != IoMode::Pipe
        && ctx.items.is_empty()
    {
        ctx.stop_indicator().await;
        bail!(
            "You need to choose the items to {}. Try adding them after the action, like \"{} {} contacts.txt\".",
            ctx.catalog.name(action),
            ctx.invocation,
            ctx.catalog.name(action)
        );
    }

    if (matches!(action, Action::Paste | Action::Show)
        || (action == Action::Clear && !ctx.flags.all))
        && !ctx.board.holds_data()
    {
        actions::status::run(&mut ctx).await?;
        ctx.stop_indicator().await;
        return Ok(0);
    }

    if needs_new_entry(action, ctx.flags.all, entry) {
        ctx.board.make_new_entry()?;
    }

    ctx.progress.set_phase(phase::ACTION);

    check_space(&ctx)?;

    if action != Action::Script {
        script::run_hook(&ctx.board, "before", ctx.catalog.name(action)).await;
    }

    actions::perform(&mut ctx).await?;

    if is_write_action(action) {
        ctx.board
            .apply_ignore_patterns()
            .context("apply ignore patterns")?;
    }

    if ctx.buffer_mime.is_empty() {
        ctx.buffer_mime = match io {
            IoMode::File => "text/uri-list".to_string(),
            _ => external::sniff_text_mime(&ctx.buffer),
        };
    }

    external::publish_to_external(&ctx, false).await?;

    if action != Action::Script {
        script::run_hook(&ctx.board, "after", ctx.catalog.name(action)).await;
    }

    ctx.board.trim_history_entries(ctx.max_history);

    if !ctx.failed.is_empty() {
        ctx.progress.set_phase(phase::ERROR);
    }
    ctx.stop_indicator().await;

    deduplicate(&mut ctx.failed);
    let had_failures = !ctx.failed.is_empty();
    if !ctx.skip_summary {
        report_failures(&ctx);
        report_successes(&ctx);
    }

    if is_write_action(action) {
        sync_roots(&ctx);
    }

    ctx.board.release_lock();
    Ok(if had_failures { 1 } else { 0 })
}

/// Refuse up front when the target filesystem can't hold the copy.
fn check_space(ctx: &Ctx) -> anyhow::Result<()> {
    let (needed, target) = match (ctx.action, ctx.io) {
        (Action::Cut | Action::Copy | Action::Add, IoMode::File) => (
            copy_engine::total_item_size(&ctx.items),
            ctx.board.root().to_path_buf(),
        ),
        (Action::Paste, IoMode::Text | IoMode::File) => (
            copy_engine::directory_size(ctx.board.data_dir()),
            std::env::current_dir().context("current dir")?,
        ),
        _ => return Ok(()),
    };

    if let Some(available) = copy_engine::available_space(&target) {
        if needed > available {
            bail!(
                "There won't be enough storage available to {} anything ({} needed, {} available). Try double-checking what items you've chosen or delete some files.",
                ctx.catalog.name(ctx.action),
                format_bytes(needed),
                format_bytes(available)
            );
        }
    }
    Ok(())
}

fn report_failures(ctx: &Ctx) {
    if ctx.failed.is_empty() {
        return;
    }
    eprintln!(
        "CB couldn't {} these items:",
        ctx.catalog.name(ctx.action)
    );
    for item in &ctx.failed {
        eprintln!("  {}: {}", item.name, item.error);
    }
    eprintln!("Try double-checking the items and trying again.");
}

fn report_successes(ctx: &Ctx) {
    if ctx.flags.output_silent || !ctx.tty.stderr {
        return;
    }
    let s = &ctx.progress.successes;
    let did = ctx.did();

    if s.bytes() > 0 {
        eprintln!("{did} {}", format_bytes(s.bytes()));
    } else if s.clipboards() == 1 {
        eprintln!("{did} one clipboard");
    } else if s.clipboards() > 1 {
        eprintln!("{did} {} clipboards", s.clipboards());
    } else if s.items() == 1 {
        eprintln!("{did} one item");
    } else if s.files() > 0 && s.directories() == 0 {
        eprintln!("{did} {} files", s.files());
    } else if s.files() == 0 && s.directories() > 0 {
        eprintln!("{did} {} directories", s.directories());
    } else if s.files() > 0 && s.directories() > 0 {
        eprintln!("{did} {} files and {} directories", s.files(), s.directories());
    }
}

/// Flush directory metadata of both roots after a write so a pulled
/// plug doesn't lose the entry.
#[cfg(unix)]
fn sync_roots(ctx: &Ctx) {
    use std::os::fd::AsRawFd;
    for root in [&ctx.paths.temporary, &ctx.paths.persistent] {
        if let Ok(dir) = std::fs::File::open(root) {
            unsafe {
                libc::fsync(dir.as_raw_fd());
            }
        }
    }
}

#[cfg(not(unix))]
fn sync_roots(_ctx: &Ctx) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn historical_short_flags_are_rewritten() {
        let out = normalize_args(
            ["copy", "-fc", "-np", "-nc", "-m"].iter().map(|s| s.to_string()),
        );
        assert_eq!(
            out,
            vec!["copy", "--fast-copy", "--no-progress", "--no-confirmation", "-m"]
        );
    }
}
