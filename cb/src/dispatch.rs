use std::path::PathBuf;

use anyhow::anyhow;

use crate::distance::levenshtein;
use crate::locales::Catalog;
use crate::terminal::Tty;

/// Every verb the tool knows about. `Undo` and `Redo` are reserved and
/// never matched by the parser or wired to a routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Cut,
    Copy,
    Paste,
    Clear,
    Show,
    Edit,
    Add,
    Remove,
    Note,
    Swap,
    Status,
    Info,
    Load,
    Import,
    Export,
    History,
    Ignore,
    Search,
    Script,
    Undo,
    Redo,
}

impl Action {
    pub const COUNT: usize = 21;

    pub fn index(self) -> usize {
        self as usize
    }
}

/// The verbs that have routines behind them.
pub const WIRED_ACTIONS: &[Action] = &[
    Action::Cut,
    Action::Copy,
    Action::Paste,
    Action::Clear,
    Action::Show,
    Action::Edit,
    Action::Add,
    Action::Remove,
    Action::Note,
    Action::Swap,
    Action::Status,
    Action::Info,
    Action::Load,
    Action::Import,
    Action::Export,
    Action::History,
    Action::Ignore,
    Action::Search,
    Action::Script,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    File,
    Pipe,
    Text,
}

/// The clipboard selector fused onto the end of an action token, e.g.
/// `cp5-2` or `paste_work`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    pub clipboard: Option<String>,
    pub entry: Option<usize>,
}

/// Split `copy5-2` into the verb part and its selector. The selector
/// starts at the first `_` or digit; a trailing `-<n>` picks a history
/// entry.
pub fn split_selector(token: &str) -> (String, Selector) {
    let Some(at) = token.find(|c: char| c == '_' || c.is_ascii_digit()) else {
        return (token.to_string(), Selector::default());
    };

    let verb = token[..at].to_string();
    let mut name = token[at..].to_string();
    let mut entry = None;

    if let Some(dash) = name.rfind('-') {
        if let Ok(n) = name[dash + 1..].parse::<usize>() {
            entry = Some(n);
            name.truncate(dash);
        }
    }

    (
        verb,
        Selector {
            clipboard: if name.is_empty() { None } else { Some(name) },
            entry,
        },
    )
}

/// Match a verb against the catalogue (current locale plus the English
/// originals). Unknown verbs produce a "did you mean" diagnostic when a
/// known spelling is within an edit distance of 2.
pub fn resolve_action(verb: &str, catalog: &Catalog, invocation: &str) -> anyhow::Result<Action> {
    for &action in WIRED_ACTIONS {
        if catalog.matches(action, verb) {
            return Ok(action);
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for &action in WIRED_ACTIONS {
        for candidate in catalog.spellings(action) {
            let d = levenshtein(verb, candidate);
            if best.map(|(_, bd)| d < bd).unwrap_or(true) {
                best = Some((candidate, d));
            }
        }
    }

    match best {
        Some((candidate, distance)) if distance <= 2 => Err(anyhow!(
            "\"{verb}\" isn't an action. Did you mean \"{candidate}\"? Try \"{invocation} help\" to see the whole list."
        )),
        _ => Err(anyhow!(
            "\"{verb}\" isn't an action. Try \"{invocation} help\" to see the whole list."
        )),
    }
}

/// Which action to take when none is given on the command line.
pub fn default_action(tty: &Tty) -> Action {
    if !tty.stdin {
        Action::Copy
    } else if !tty.stdout {
        Action::Paste
    } else {
        Action::Status
    }
}

fn all_items_missing(items: &[PathBuf]) -> bool {
    !items.is_empty() && items.iter().all(|i| !i.exists())
}

/// Pure function of (action, argument shape, TTY state).
pub fn io_mode_for(action: Action, items: &[PathBuf], tty: &Tty) -> IoMode {
    use Action::*;
    match action {
        Cut | Copy | Add => {
            if all_items_missing(items) {
                IoMode::Text
            } else if !tty.stdin && items.is_empty() {
                IoMode::Pipe
            } else {
                IoMode::File
            }
        }
        Paste | Show | Clear | Edit | Status | Info | History | Search => {
            if !tty.stdout {
                IoMode::Pipe
            } else {
                IoMode::Text
            }
        }
        Remove | Note | Ignore | Swap | Load | Import | Export => {
            if !tty.stdin && items.is_empty() {
                IoMode::Pipe
            } else {
                IoMode::Text
            }
        }
        Script => {
            if items.len() == 1 && items[0].exists() {
                IoMode::File
            } else {
                IoMode::Text
            }
        }
        _ => IoMode::File,
    }
}

/// Piped invocations take their payload from the pipe, so extra
/// positional items are a user mistake (except for `show`, which uses
/// them as filters).
pub fn verify_io(action: Action, io: IoMode, item_count: usize, invocation: &str) -> anyhow::Result<()> {
    if io == IoMode::Pipe && item_count >= 2 && action != Action::Show {
        return Err(anyhow!(
            "You can't specify items when redirecting. Try removing the items or the redirection, like \"{invocation} copy\"."
        ));
    }
    Ok(())
}

pub fn is_write_action(action: Action) -> bool {
    use Action::*;
    matches!(
        action,
        Cut | Copy | Add | Clear | Remove | Swap | Load | Import | Edit
    )
}

pub fn is_clearing_action(action: Action) -> bool {
    matches!(action, Action::Copy | Action::Cut | Action::Clear)
}

/// Copy, cut and (non-`--all`) clear push a fresh entry, but only when
/// targeting the current entry.
pub fn needs_new_entry(action: Action, all: bool, entry: usize) -> bool {
    use Action::*;
    (matches!(action, Copy | Cut) || (action == Clear && !all)) && entry == crate::consts::DEFAULT_CLIPBOARD_ENTRY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locales::Catalog;

    fn tty(stdin: bool, stdout: bool) -> Tty {
        Tty {
            stdin,
            stdout,
            stderr: true,
        }
    }

    #[test]
    fn selector_parsing() {
        assert_eq!(split_selector("cp"), ("cp".into(), Selector::default()));
        assert_eq!(
            split_selector("cp5"),
            (
                "cp".into(),
                Selector {
                    clipboard: Some("5".into()),
                    entry: None
                }
            )
        );
        assert_eq!(
            split_selector("copy5-2"),
            (
                "copy".into(),
                Selector {
                    clipboard: Some("5".into()),
                    entry: Some(2)
                }
            )
        );
        assert_eq!(
            split_selector("paste_work"),
            (
                "paste".into(),
                Selector {
                    clipboard: Some("_work".into()),
                    entry: None
                }
            )
        );
        assert_eq!(
            split_selector("cp_work-3"),
            (
                "cp".into(),
                Selector {
                    clipboard: Some("_work".into()),
                    entry: Some(3)
                }
            )
        );
    }

    #[test]
    fn verbs_match_names_and_shortcuts() {
        let catalog = Catalog::for_locale("en_US");
        assert_eq!(resolve_action("copy", &catalog, "cb").unwrap(), Action::Copy);
        assert_eq!(resolve_action("p", &catalog, "cb").unwrap(), Action::Paste);
        assert_eq!(resolve_action("hs", &catalog, "cb").unwrap(), Action::History);
    }

    #[test]
    fn localized_and_english_spellings_both_work() {
        let catalog = Catalog::for_locale("es_CO");
        assert_eq!(resolve_action("pegar", &catalog, "cb").unwrap(), Action::Paste);
        assert_eq!(resolve_action("paste", &catalog, "cb").unwrap(), Action::Paste);
    }

    #[test]
    fn near_misses_suggest_a_candidate() {
        let catalog = Catalog::for_locale("en_US");
        let err = resolve_action("pastee", &catalog, "cb").unwrap_err().to_string();
        assert!(err.contains("paste"), "{err}");
        let err = resolve_action("zzzzzz", &catalog, "cb").unwrap_err().to_string();
        assert!(!err.contains("Did you mean"), "{err}");
    }

    #[test]
    fn reserved_actions_never_match() {
        let catalog = Catalog::for_locale("en_US");
        assert!(resolve_action("undo", &catalog, "cb").is_err());
    }

    #[test]
    fn copy_io_modes() {
        let missing = vec![PathBuf::from("/definitely/not/here/zzz")];
        assert_eq!(io_mode_for(Action::Copy, &missing, &tty(true, true)), IoMode::Text);
        assert_eq!(io_mode_for(Action::Copy, &[], &tty(false, true)), IoMode::Pipe);
        let existing = vec![std::env::temp_dir()];
        assert_eq!(io_mode_for(Action::Copy, &existing, &tty(true, true)), IoMode::File);
    }

    #[test]
    fn paste_class_follows_stdout() {
        assert_eq!(io_mode_for(Action::Paste, &[], &tty(true, false)), IoMode::Pipe);
        assert_eq!(io_mode_for(Action::Status, &[], &tty(true, true)), IoMode::Text);
    }

    #[test]
    fn note_class_follows_stdin() {
        assert_eq!(io_mode_for(Action::Note, &[], &tty(false, true)), IoMode::Pipe);
        assert_eq!(
            io_mode_for(Action::Note, &[PathBuf::from("hello")], &tty(true, true)),
            IoMode::Text
        );
    }

    #[test]
    fn defaults_by_tty_shape() {
        assert_eq!(default_action(&tty(false, true)), Action::Copy);
        assert_eq!(default_action(&tty(true, false)), Action::Paste);
        assert_eq!(default_action(&tty(true, true)), Action::Status);
    }

    #[test]
    fn pipe_with_items_is_rejected_except_show() {
        assert!(verify_io(Action::Copy, IoMode::Pipe, 2, "cb").is_err());
        assert!(verify_io(Action::Show, IoMode::Pipe, 2, "cb").is_ok());
        assert!(verify_io(Action::Copy, IoMode::Pipe, 1, "cb").is_ok());
    }
}
