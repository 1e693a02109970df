use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::content::Successes;
use crate::dispatch::IoMode;
use crate::format::format_bytes;

/// Indicator lifecycle. Transitions are compare-exchange so the signal
/// path never races the normal stop path.
pub mod state {
    pub const DONE: u8 = 0;
    pub const ACTIVE: u8 = 1;
    pub const CANCEL: u8 = 2;
}

/// Coarse invocation phase, used to pick what the percentage means.
pub mod phase {
    pub const SETUP: u8 = 0;
    pub const ACTION: u8 = 1;
    pub const ERROR: u8 = 2;
}

const FRAME_INTERVAL: Duration = Duration::from_millis(20);

const SPINNER_FRAMES: [&str; 22] = [
    "╸         ",
    "━         ",
    "╺╸        ",
    " ━        ",
    " ╺╸       ",
    "  ━       ",
    "  ╺╸      ",
    "   ━      ",
    "   ╺╸     ",
    "    ━     ",
    "    ╺╸    ",
    "     ━    ",
    "     ╺╸   ",
    "      ━   ",
    "      ╺╸  ",
    "       ━  ",
    "       ╺╸ ",
    "        ━ ",
    "        ╺╸",
    "         ━",
    "         ╺",
    "          ",
];

/// Shared between the worker, the spinner task, and the ctrl-c task.
/// Everything here is atomics plus one `Notify`; nothing on the signal
/// path takes a lock.
#[derive(Debug)]
pub struct Progress {
    state: AtomicU8,
    phase: AtomicU8,
    paused: AtomicBool,
    pub successes: Successes,
    pub failed: AtomicU64,
    pub total_items: AtomicU64,
    notify: Notify,
}

impl Progress {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: AtomicU8::new(state::DONE),
            phase: AtomicU8::new(phase::SETUP),
            paused: AtomicBool::new(false),
            successes: Successes::default(),
            failed: AtomicU64::new(0),
            total_items: AtomicU64::new(0),
            notify: Notify::new(),
        })
    }

    /// `Done → Active`. Returns whether we actually started.
    pub fn start(&self) -> bool {
        self.state
            .compare_exchange(state::DONE, state::ACTIVE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// `Active → Done`. Returns whether the indicator was running.
    pub fn finish(&self) -> bool {
        let was_active = self
            .state
            .compare_exchange(state::ACTIVE, state::DONE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.notify.notify_waiters();
        was_active
    }

    /// `Active → Cancel`, from the SIGINT path. Returns whether the
    /// indicator was running.
    pub fn cancel(&self) -> bool {
        let was_active = self
            .state
            .compare_exchange(state::ACTIVE, state::CANCEL, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.notify.notify_waiters();
        was_active
    }

    pub fn current_state(&self) -> u8 {
        self.state.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.current_state() == state::CANCEL
    }

    pub fn set_phase(&self, p: u8) {
        self.phase.store(p, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn current_phase(&self) -> u8 {
        self.phase.load(Ordering::Acquire)
    }

    /// Stop drawing while a prompt owns the terminal.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.notify.notify_waiters();
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    fn percent_done(&self) -> u64 {
        let total = self.total_items.load(Ordering::Relaxed).max(1);
        let done = self.successes.items() + self.failed.load(Ordering::Relaxed);
        (done * 100) / total
    }
}

fn display_mode(io: IoMode) -> DisplayMode {
    match io {
        IoMode::File => DisplayMode::Percent,
        IoMode::Pipe => DisplayMode::Bytes,
        IoMode::Text => DisplayMode::Plain,
    }
}

#[derive(Debug, Clone, Copy)]
enum DisplayMode {
    Percent,
    Bytes,
    Plain,
}

/// Handle for the spinner task. Dropping without `stop` leaves the
/// task to exit on its own next tick.
pub struct Indicator {
    progress: Arc<Progress>,
    handle: Option<JoinHandle<()>>,
}

impl Indicator {
    /// Spawn the spinner when enabled (stderr is a TTY, progress not
    /// suppressed) and the state machine allows it.
    pub fn start(progress: Arc<Progress>, io: IoMode, doing: &str, enabled: bool) -> Self {
        if !enabled || !progress.start() {
            return Self {
                progress,
                handle: None,
            };
        }
        let mode = display_mode(io);
        let doing = doing.to_string();
        let shared = progress.clone();
        let handle = tokio::spawn(async move {
            run_spinner(shared, mode, doing).await;
        });
        Self {
            progress,
            handle: Some(handle),
        }
    }

    pub async fn stop(&mut self) {
        self.progress.finish();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn run_spinner(progress: Arc<Progress>, mode: DisplayMode, doing: String) {
    let mut step = 0usize;
    let mut last_len = 0usize;

    loop {
        if progress.current_state() != state::ACTIVE {
            break;
        }
        if !progress.is_paused() {
            let label = match mode {
                DisplayMode::Percent if progress.current_phase() == phase::ACTION => {
                    format!("{}%", progress.percent_done())
                }
                DisplayMode::Bytes => format_bytes(progress.successes.bytes()),
                _ => String::new(),
            };
            let line = format!("\r{}... {} {}", doing, label, SPINNER_FRAMES[step]);
            last_len = last_len.max(line.len());
            let mut err = std::io::stderr();
            let _ = err.write_all(line.as_bytes());
            let _ = err.flush();
            step = (step + 1) % SPINNER_FRAMES.len();
        }

        tokio::select! {
            _ = progress.notify.notified() => {}
            _ = tokio::time::sleep(FRAME_INTERVAL) => {}
        }
    }

    // Wipe the spinner line so reports start on a clean column.
    let mut err = std::io::stderr();
    let _ = write!(err, "\r{:width$}\r", "", width = last_len);
    let _ = err.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_is_idempotent() {
        let p = Progress::new();
        assert!(p.start());
        assert!(!p.start());
        assert_eq!(p.current_state(), state::ACTIVE);
    }

    #[test]
    fn finish_only_stops_an_active_indicator() {
        let p = Progress::new();
        assert!(!p.finish());
        p.start();
        assert!(p.finish());
        assert_eq!(p.current_state(), state::DONE);
    }

    #[test]
    fn cancel_wins_over_finish() {
        let p = Progress::new();
        p.start();
        assert!(p.cancel());
        // A later finish must not resurrect the indicator.
        assert!(!p.finish());
        assert!(p.is_cancelled());
    }

    #[test]
    fn cancel_on_idle_reports_not_active() {
        let p = Progress::new();
        assert!(!p.cancel());
    }

    #[test]
    fn percentage_counts_failures_as_progress() {
        let p = Progress::new();
        p.total_items.store(4, Ordering::Relaxed);
        p.successes.add_file();
        p.failed.store(1, Ordering::Relaxed);
        assert_eq!(p.percent_done(), 50);
    }

    #[tokio::test]
    async fn stop_joins_the_task() {
        let p = Progress::new();
        let mut ind = Indicator::start(p.clone(), IoMode::Text, "Copying", true);
        assert_eq!(p.current_state(), state::ACTIVE);
        ind.stop().await;
        assert_eq!(p.current_state(), state::DONE);
    }
}
