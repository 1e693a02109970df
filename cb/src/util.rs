use std::fs;
use std::path::Path;

/// Truthy environment values, matching the de-facto convention used by
/// the rest of the tool's env switches.
pub fn env_var_is_true(name: &str) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(
            v.to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "on" | "enabled"
        ),
        Err(_) => false,
    }
}

/// Read a file as non-empty trimmed lines. Missing files read as empty.
pub fn file_lines(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(s) => s
            .lines()
            .map(|l| l.trim_end_matches('\r').to_string())
            .filter(|l| !l.is_empty())
            .collect(),
        Err(_) => Vec::new(),
    }
}

pub fn file_string(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok()
}

/// True when the file exists and has at least one byte.
pub fn non_empty_file(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

/// Remove duplicate items while preserving order.
pub fn deduplicate<T: PartialEq + Clone>(items: &mut Vec<T>) {
    let mut seen: Vec<T> = Vec::with_capacity(items.len());
    items.retain(|item| {
        if seen.contains(item) {
            false
        } else {
            seen.push(item.clone());
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_values_are_recognised() {
        std::env::set_var("CB_TEST_TRUTHY", "Yes");
        assert!(env_var_is_true("CB_TEST_TRUTHY"));
        std::env::set_var("CB_TEST_TRUTHY", "0");
        assert!(!env_var_is_true("CB_TEST_TRUTHY"));
        std::env::remove_var("CB_TEST_TRUTHY");
        assert!(!env_var_is_true("CB_TEST_TRUTHY"));
    }

    #[test]
    fn file_lines_skips_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("lines");
        fs::write(&p, "a\n\nb\r\n").unwrap();
        assert_eq!(file_lines(&p), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn deduplicate_keeps_first_occurrence() {
        let mut v = vec!["a", "b", "a", "c", "b"];
        deduplicate(&mut v);
        assert_eq!(v, vec!["a", "b", "c"]);
    }
}
