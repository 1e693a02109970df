use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Advisory cross-process lock: `metadata/lock` exists iff the
/// clipboard is locked, and holds the owner's PID in decimal ASCII.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    released: bool,
}

fn read_owner_pid(path: &Path) -> Option<i32> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| s.trim().parse::<i32>().ok())
}

#[cfg(unix)]
fn pid_is_alive(pid: i32) -> bool {
    unsafe { libc::kill(pid, 0) == 0 }
}

#[cfg(not(unix))]
fn pid_is_alive(_pid: i32) -> bool {
    // Without a liveness probe, assume the owner is still around and
    // rely on the poll loop's lock-file re-check.
    true
}

#[cfg(unix)]
fn same_process_group(pid: i32) -> bool {
    unsafe { libc::getpgrp() == libc::getpgid(pid) }
}

#[cfg(not(unix))]
fn same_process_group(_pid: i32) -> bool {
    false
}

impl LockGuard {
    /// Take the lock, waiting for a live owner to finish. A missing or
    /// unreadable owner PID means the lock is stale and gets reclaimed.
    /// Owners in our own process group are treated as re-entrant so
    /// `cb | cb` pipelines don't deadlock.
    pub async fn acquire(path: &Path) -> anyhow::Result<Self> {
        loop {
            match read_owner_pid(path) {
                // Absent, or present but unreadable: free or stale.
                None => break,
                Some(pid) => {
                    if same_process_group(pid) {
                        break;
                    }
                    if !pid_is_alive(pid) {
                        break;
                    }
                    if !path.exists() {
                        break;
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }

        let pid = std::process::id();
        std::fs::write(path, pid.to_string())
            .with_context(|| format!("write lock file {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            released: false,
        })
    }

    pub fn release(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
            self.released = true;
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_writes_our_pid_and_release_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("lock");
        let mut guard = LockGuard::acquire(&lock).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&lock).unwrap(),
            std::process::id().to_string()
        );
        guard.release();
        assert!(!lock.exists());
    }

    #[tokio::test]
    async fn garbage_lock_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("lock");
        std::fs::write(&lock, "certainly not a pid").unwrap();
        let _guard = LockGuard::acquire(&lock).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&lock).unwrap(),
            std::process::id().to_string()
        );
    }

    #[tokio::test]
    async fn dead_owner_is_reclaimed() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("lock");
        // A PID from far outside the normal range; spawn-and-reap would
        // also work but this is deterministic.
        std::fs::write(&lock, "999999999").unwrap();
        let _guard = LockGuard::acquire(&lock).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(&lock).unwrap(),
            std::process::id().to_string()
        );
    }

    #[tokio::test]
    async fn drop_releases() {
        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("lock");
        {
            let _guard = LockGuard::acquire(&lock).await.unwrap();
            assert!(lock.exists());
        }
        assert!(!lock.exists());
    }
}
