use std::path::PathBuf;

use anyhow::bail;

use crate::consts::{PERSISTENT_DIR_NAME, TEMPORARY_DIR_NAME};
use crate::util::env_var_is_true;

/// The two storage roots every clipboard lives under.
#[derive(Debug, Clone)]
pub struct GlobalPaths {
    pub temporary: PathBuf,
    pub persistent: PathBuf,
}

pub fn global_paths() -> GlobalPaths {
    GlobalPaths {
        temporary: temporary_root(),
        persistent: persistent_root(),
    }
}

fn temporary_root() -> PathBuf {
    if let Ok(d) = std::env::var("CLIPBOARD_TMPDIR") {
        return PathBuf::from(d).join(TEMPORARY_DIR_NAME);
    }
    if let Ok(d) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(d).join(TEMPORARY_DIR_NAME);
    }
    std::env::temp_dir().join(TEMPORARY_DIR_NAME)
}

fn persistent_root() -> PathBuf {
    if let Ok(d) = std::env::var("CLIPBOARD_PERSISTDIR") {
        return PathBuf::from(d).join(PERSISTENT_DIR_NAME);
    }
    if let Ok(d) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(d).join(PERSISTENT_DIR_NAME);
    }
    home_dir().join(PERSISTENT_DIR_NAME)
}

pub fn home_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home);
    }
    if let Ok(profile) = std::env::var("USERPROFILE") {
        return PathBuf::from(profile);
    }
    // Last resort: the temp dir always exists.
    std::env::temp_dir()
}

/// Clipboards whose name contains `_` live under the persistent root,
/// as does everything when CLIPBOARD_ALWAYS_PERSIST is set.
pub fn is_persistent_name(name: &str) -> bool {
    name.contains('_') || env_var_is_true("CLIPBOARD_ALWAYS_PERSIST")
}

pub fn clipboard_root(paths: &GlobalPaths, name: &str) -> PathBuf {
    let base = if is_persistent_name(name) {
        &paths.persistent
    } else {
        &paths.temporary
    };
    base.join(name)
}

const RESERVED_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// A clipboard name becomes a directory name, so it must be a valid
/// single path component on the host.
pub fn validate_clipboard_name(name: &str) -> anyhow::Result<()> {
    if name.is_empty() {
        bail!("clipboard names can't be empty");
    }
    for c in name.chars() {
        if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') || c.is_control() {
            bail!("clipboard name \"{name}\" contains the forbidden character {c:?}");
        }
    }
    let stem = name.split('.').next().unwrap_or(name).to_ascii_uppercase();
    if RESERVED_DEVICE_NAMES.contains(&stem.as_str()) {
        bail!("clipboard name \"{name}\" is a reserved device name");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmpdir_env_wins() {
        std::env::set_var("CLIPBOARD_TMPDIR", "/somewhere/odd");
        assert_eq!(
            temporary_root(),
            PathBuf::from("/somewhere/odd/Clipboard")
        );
        std::env::remove_var("CLIPBOARD_TMPDIR");
    }

    #[test]
    fn underscore_names_are_persistent() {
        assert!(is_persistent_name("my_work"));
        assert!(is_persistent_name("_"));
        assert!(!is_persistent_name("5"));
    }

    #[test]
    fn bad_names_are_rejected() {
        assert!(validate_clipboard_name("fine-name.5").is_ok());
        assert!(validate_clipboard_name("a/b").is_err());
        assert!(validate_clipboard_name("NUL").is_err());
        assert!(validate_clipboard_name("com1.txt").is_err());
        assert!(validate_clipboard_name("").is_err());
    }

    #[test]
    fn roots_pick_sides_by_name() {
        let paths = GlobalPaths {
            temporary: PathBuf::from("/t"),
            persistent: PathBuf::from("/p"),
        };
        assert_eq!(clipboard_root(&paths, "0"), PathBuf::from("/t/0"));
        assert_eq!(clipboard_root(&paths, "a_b"), PathBuf::from("/p/a_b"));
    }
}
