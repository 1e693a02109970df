use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use regex::Regex;
use walkdir::WalkDir;

use crate::content::{CopyPolicy, FailedItem, Successes};
use crate::util::file_lines;

/// Errors with this OS code mean the hardlink crossed a filesystem
/// boundary and the copy must be retried the safe way.
#[cfg(unix)]
fn is_cross_device(err: &std::io::Error) -> bool {
    err.raw_os_error() == Some(libc::EXDEV)
}

#[cfg(not(unix))]
fn is_cross_device(err: &std::io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    err.raw_os_error() == Some(17)
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    let target = std::fs::read_link(src)?;
    if dst.exists() {
        std::fs::remove_file(dst)?;
    }
    std::os::unix::fs::symlink(target, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::copy(src, dst).map(|_| ())
}

/// Copy one regular file, hardlinking when `fast_copy` is set and the
/// link can be made; falls back to a byte copy across devices.
fn copy_file(src: &Path, dst: &Path, fast_copy: bool) -> std::io::Result<()> {
    if fast_copy {
        if dst.exists() {
            std::fs::remove_file(dst)?;
        }
        match std::fs::hard_link(src, dst) {
            Ok(()) => return Ok(()),
            Err(e) if is_cross_device(&e) => {}
            Err(e) => return Err(e),
        }
    }
    std::fs::copy(src, dst).map(|_| ())
}

/// Recursive directory copy preserving symlinks, overwriting existing
/// targets. Files inside the tree still honour `fast_copy`.
pub fn copy_dir_recursive(src: &Path, dst: &Path, fast_copy: bool) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(std::io::Error::other)?;
        if entry.path() == src {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(std::io::Error::other)?;
        let target = dst.join(rel);
        let ft = entry.file_type();
        if ft.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if ft.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            copy_file(entry.path(), &target, fast_copy)?;
        }
    }
    Ok(())
}

/// What one successful `copy_item` produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    File,
    Directory,
}

fn item_target_name(item: &Path) -> PathBuf {
    match item.file_name() {
        Some(name) => PathBuf::from(name),
        // Trailing-slash spellings like `dir/` name the directory itself.
        None => item
            .parent()
            .and_then(|p| p.file_name())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("item")),
    }
}

/// Copy a single user item into `dest_dir`.
pub fn copy_item(item: &Path, dest_dir: &Path, fast_copy: bool) -> std::io::Result<ItemKind> {
    let target = dest_dir.join(item_target_name(item));
    if item.is_dir() {
        copy_dir_recursive(item, &target, false)?;
        Ok(ItemKind::Directory)
    } else {
        copy_file(item, &target, fast_copy)?;
        Ok(ItemKind::File)
    }
}

/// Batch copy with per-item failure collection and cut bookkeeping.
/// Every successfully cut item's absolute path is appended to the
/// originals file for deletion on the next paste.
pub fn copy_items(
    items: &[PathBuf],
    dest_dir: &Path,
    fast_copy: bool,
    originals: Option<&Path>,
    successes: &Successes,
) -> Vec<FailedItem> {
    let mut failed = Vec::new();
    for item in items {
        match copy_item(item, dest_dir, fast_copy) {
            Ok(kind) => {
                match kind {
                    ItemKind::File => successes.add_file(),
                    ItemKind::Directory => successes.add_directory(),
                }
                if let Some(originals) = originals {
                    if let Err(e) = record_original(originals, item) {
                        failed.push(FailedItem::new(item.display().to_string(), e));
                    }
                }
            }
            Err(e) => failed.push(FailedItem::new(item.display().to_string(), e)),
        }
    }
    failed
}

fn record_original(originals: &Path, item: &Path) -> std::io::Result<()> {
    let absolute = std::fs::canonicalize(item).unwrap_or_else(|_| item.to_path_buf());
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(originals)?;
    writeln!(f, "{}", absolute.display())
}

/// Ask the user what to do about an existing target. Robots never get
/// prompted and replace everything.
pub fn user_decision(item: &str, robot: bool) -> CopyPolicy {
    if robot {
        return CopyPolicy::ReplaceAll;
    }
    let stdin = std::io::stdin();
    loop {
        eprint!("The item \"{item}\" already exists. Replace it? [y(es)/a(ll)/n(o)/s(kip all)] ");
        let _ = std::io::stderr().flush();
        let mut line = String::new();
        if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
            return CopyPolicy::SkipAll;
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => return CopyPolicy::ReplaceOnce,
            "a" | "all" => return CopyPolicy::ReplaceAll,
            "n" | "no" => return CopyPolicy::SkipOnce,
            "s" | "skip" => return CopyPolicy::SkipAll,
            _ => eprintln!("Please enter one of y, a, n, or s."),
        }
    }
}

#[cfg(unix)]
fn same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match (std::fs::metadata(a), std::fs::metadata(b)) {
        (Ok(ma), Ok(mb)) => ma.dev() == mb.dev() && ma.ino() == mb.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn same_file(a: &Path, b: &Path) -> bool {
    std::fs::canonicalize(a).ok() == std::fs::canonicalize(b).ok()
}

/// Paste every item of an entry directory into `dest_dir`, consulting
/// (and updating) the collision policy via `decide` when a different
/// target already exists. Optional filename filters restrict which
/// items paste.
pub fn paste_entry(
    entry_dir: &Path,
    dest_dir: &Path,
    fast_copy: bool,
    policy: &mut CopyPolicy,
    filters: &[Regex],
    successes: &Successes,
    mut decide: impl FnMut(&str) -> CopyPolicy,
) -> Vec<FailedItem> {
    let mut failed = Vec::new();
    let Ok(read) = std::fs::read_dir(entry_dir) else {
        return failed;
    };

    let mut sources: Vec<PathBuf> = read.flatten().map(|e| e.path()).collect();
    sources.sort();

    for source in sources {
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !filters.is_empty() && !filters.iter().any(|f| f.is_match(&name)) {
            continue;
        }

        let target = dest_dir.join(&name);
        if target.exists() && same_file(&source, &target) {
            continue;
        }

        if target.exists() {
            let effective = match *policy {
                CopyPolicy::SkipAll => CopyPolicy::SkipAll,
                CopyPolicy::ReplaceAll => CopyPolicy::ReplaceAll,
                _ => {
                    *policy = decide(&name);
                    *policy
                }
            };
            if matches!(effective, CopyPolicy::SkipAll | CopyPolicy::SkipOnce) {
                continue;
            }
        }

        match copy_item(&source, dest_dir, fast_copy) {
            Ok(ItemKind::File) => successes.add_file(),
            Ok(ItemKind::Directory) => successes.add_directory(),
            Err(e) => failed.push(FailedItem::new(name, e)),
        }
    }
    failed
}

/// After a successful paste, every path recorded by a cut is removed.
/// The originals file itself only goes away when every removal worked.
pub fn remove_originals(originals: &Path) -> Vec<FailedItem> {
    if !originals.is_file() {
        return Vec::new();
    }
    let mut failed = Vec::new();
    for line in file_lines(originals) {
        let p = PathBuf::from(&line);
        let result = if p.is_dir() {
            std::fs::remove_dir_all(&p)
        } else {
            std::fs::remove_file(&p)
        };
        if let Err(e) = result {
            if e.kind() != std::io::ErrorKind::NotFound {
                failed.push(FailedItem::new(line, e));
            }
        }
    }
    if failed.is_empty() {
        let _ = std::fs::remove_file(originals);
    }
    failed
}

/// Total on-disk size of the items about to be copied.
pub fn total_item_size(items: &[PathBuf]) -> u64 {
    let mut total = 0u64;
    for item in items {
        if item.is_dir() {
            total += directory_size(item);
        } else if let Ok(md) = std::fs::metadata(item) {
            total += md.len();
        }
    }
    total
}

pub fn directory_size(dir: &Path) -> u64 {
    WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .map(|m| m.len())
        .sum()
}

/// Free bytes on the filesystem holding `path`.
#[cfg(unix)]
pub fn available_space(path: &Path) -> Option<u64> {
    use std::os::unix::ffi::OsStrExt;
    let c = std::ffi::CString::new(path.as_os_str().as_bytes()).ok()?;
    unsafe {
        let mut stat: libc::statvfs = std::mem::zeroed();
        if libc::statvfs(c.as_ptr(), &mut stat) != 0 {
            return None;
        }
        Some(stat.f_bavail as u64 * stat.f_frsize as u64)
    }
}

#[cfg(not(unix))]
pub fn available_space(_path: &Path) -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn successes() -> Successes {
        Successes::default()
    }

    #[test]
    fn copy_item_copies_files_and_trees() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("f.txt"), "x\n").unwrap();
        let sub = src.path().join("tree/sub");
        std::fs::create_dir_all(&sub).unwrap();
        std::fs::write(sub.join("deep.txt"), "y").unwrap();

        assert_eq!(
            copy_item(&src.path().join("f.txt"), dst.path(), false).unwrap(),
            ItemKind::File
        );
        assert_eq!(
            copy_item(&src.path().join("tree"), dst.path(), false).unwrap(),
            ItemKind::Directory
        );
        assert_eq!(
            std::fs::read_to_string(dst.path().join("f.txt")).unwrap(),
            "x\n"
        );
        assert_eq!(
            std::fs::read_to_string(dst.path().join("tree/sub/deep.txt")).unwrap(),
            "y"
        );
    }

    #[test]
    fn fast_copy_hardlinks_within_one_filesystem() {
        use std::os::unix::fs::MetadataExt;
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        std::fs::write(&src, "x").unwrap();
        let dst_dir = dir.path().join("out");
        std::fs::create_dir(&dst_dir).unwrap();
        copy_item(&src, &dst_dir, true).unwrap();
        let a = std::fs::metadata(&src).unwrap();
        let b = std::fs::metadata(dst_dir.join("src.txt")).unwrap();
        assert_eq!(a.ino(), b.ino());
    }

    #[test]
    fn cut_records_absolute_originals() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let item = src.path().join("f.txt");
        std::fs::write(&item, "x").unwrap();
        let originals = dst.path().join("originals");

        let s = successes();
        let failed = copy_items(
            &[item.clone()],
            dst.path(),
            false,
            Some(&originals),
            &s,
        );
        assert!(failed.is_empty());
        assert_eq!(s.files(), 1);
        let recorded = std::fs::read_to_string(&originals).unwrap();
        let recorded = recorded.trim();
        assert!(Path::new(recorded).is_absolute());
        assert!(recorded.ends_with("f.txt"));
    }

    #[test]
    fn failed_items_do_not_abort_the_batch() {
        let dst = tempfile::tempdir().unwrap();
        let good = dst.path().join("good.txt");
        std::fs::write(&good, "x").unwrap();
        let s = successes();
        let out = tempfile::tempdir().unwrap();
        let failed = copy_items(
            &[PathBuf::from("/definitely/missing"), good],
            out.path(),
            false,
            None,
            &s,
        );
        assert_eq!(failed.len(), 1);
        assert_eq!(s.files(), 1);
        assert!(out.path().join("good.txt").exists());
    }

    #[test]
    fn paste_skips_identical_targets() {
        let entry = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let src = entry.path().join("f.txt");
        std::fs::write(&src, "x").unwrap();
        // Hardlink into the destination: same file, must be skipped.
        std::fs::hard_link(&src, dest.path().join("f.txt")).unwrap();

        let s = successes();
        let mut policy = CopyPolicy::Unknown;
        let failed = paste_entry(
            entry.path(),
            dest.path(),
            false,
            &mut policy,
            &[],
            &s,
            |_| panic!("must not prompt for an identical file"),
        );
        assert!(failed.is_empty());
        assert_eq!(s.files(), 0);
    }

    #[test]
    fn skip_all_answers_once_and_sticks() {
        let entry = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        for name in ["f1", "f2", "f3"] {
            std::fs::write(entry.path().join(name), "new").unwrap();
            std::fs::write(dest.path().join(name), "old").unwrap();
        }

        let s = successes();
        let mut policy = CopyPolicy::Unknown;
        let mut prompts = 0;
        let failed = paste_entry(
            entry.path(),
            dest.path(),
            false,
            &mut policy,
            &[],
            &s,
            |_| {
                prompts += 1;
                CopyPolicy::SkipAll
            },
        );
        assert!(failed.is_empty());
        assert_eq!(prompts, 1);
        assert_eq!(s.files(), 0);
        assert_eq!(policy, CopyPolicy::SkipAll);
        for name in ["f1", "f2", "f3"] {
            assert_eq!(
                std::fs::read_to_string(dest.path().join(name)).unwrap(),
                "old"
            );
        }
    }

    #[test]
    fn replace_once_prompts_again() {
        let entry = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        for name in ["f1", "f2"] {
            std::fs::write(entry.path().join(name), "new").unwrap();
            std::fs::write(dest.path().join(name), "old").unwrap();
        }

        let s = successes();
        let mut policy = CopyPolicy::Unknown;
        let mut prompts = 0;
        paste_entry(
            entry.path(),
            dest.path(),
            false,
            &mut policy,
            &[],
            &s,
            |_| {
                prompts += 1;
                CopyPolicy::ReplaceOnce
            },
        );
        assert_eq!(prompts, 2);
        assert_eq!(s.files(), 2);
        assert_eq!(
            std::fs::read_to_string(dest.path().join("f1")).unwrap(),
            "new"
        );
    }

    #[test]
    fn remove_originals_deletes_listed_paths_then_itself() {
        let dir = tempfile::tempdir().unwrap();
        let victim = dir.path().join("victim.txt");
        std::fs::write(&victim, "x").unwrap();
        let originals = dir.path().join("originals");
        std::fs::write(&originals, format!("{}\n", victim.display())).unwrap();

        let failed = remove_originals(&originals);
        assert!(failed.is_empty());
        assert!(!victim.exists());
        assert!(!originals.exists());
    }

    #[test]
    fn sizes_add_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a"), vec![0u8; 100]).unwrap();
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        std::fs::write(sub.join("b"), vec![0u8; 50]).unwrap();
        assert_eq!(directory_size(dir.path()), 150);
        assert_eq!(total_item_size(&[dir.path().to_path_buf()]), 150);
    }

    #[test]
    fn available_space_reports_something() {
        assert!(available_space(&std::env::temp_dir()).unwrap() > 0);
    }
}
