use std::io::IsTerminal;

use crate::util::env_var_is_true;

/// TTY-ness of the three standard streams, with the CLIPBOARD_FORCETTY
/// override applied.
#[derive(Debug, Clone, Copy)]
pub struct Tty {
    pub stdin: bool,
    pub stdout: bool,
    pub stderr: bool,
}

impl Tty {
    pub fn detect() -> Self {
        if env_var_is_true("CLIPBOARD_FORCETTY") {
            return Self {
                stdin: true,
                stdout: true,
                stderr: true,
            };
        }
        Self {
            stdin: std::io::stdin().is_terminal(),
            stdout: std::io::stdout().is_terminal(),
            stderr: std::io::stderr().is_terminal(),
        }
    }

    /// A "robot" gets no interactive prompts and conservative defaults.
    pub fn user_is_robot(&self) -> bool {
        !self.stdin || !self.stdout || !self.stderr || env_var_is_true("CI")
    }
}

/// bsd-colors convention: NO_COLOR / CLICOLOR=0 disable, and the FORCE
/// variants win over both.
pub fn color_enabled() -> bool {
    let clicolor_off = std::env::var("CLICOLOR").map(|v| v == "0").unwrap_or(false);
    let no_color = std::env::var_os("NO_COLOR").is_some();
    let clicolor_force = std::env::var("CLICOLOR_FORCE")
        .map(|v| v != "0")
        .unwrap_or(false);
    let force_color = std::env::var_os("FORCE_COLOR").is_some();
    !((no_color || clicolor_off) && !force_color && !clicolor_force)
}

pub fn bold(s: &str) -> String {
    if color_enabled() {
        format!("\x1b[1m{s}\x1b[22m")
    } else {
        s.to_string()
    }
}

pub fn underline(s: &str) -> String {
    if color_enabled() {
        format!("\x1b[4m{s}\x1b[24m")
    } else {
        s.to_string()
    }
}

pub fn columns() -> usize {
    #[cfg(unix)]
    {
        let mut ws = libc::winsize {
            ws_row: 0,
            ws_col: 0,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        let rc = unsafe { libc::ioctl(libc::STDERR_FILENO, libc::TIOCGWINSZ, &mut ws) };
        if rc == 0 && ws.ws_col > 0 {
            return ws.ws_col as usize;
        }
    }
    80
}

/// Puts the controlling terminal into raw mode for the lifetime of the
/// guard. Used while reading OSC-52 replies so the response doesn't
/// echo or get line-buffered.
#[cfg(unix)]
pub struct RawModeGuard {
    saved: libc::termios,
}

#[cfg(unix)]
impl RawModeGuard {
    pub fn enter() -> Option<Self> {
        unsafe {
            let mut saved: libc::termios = std::mem::zeroed();
            if libc::tcgetattr(libc::STDIN_FILENO, &mut saved) != 0 {
                return None;
            }
            let mut raw = saved;
            libc::cfmakeraw(&mut raw);
            if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &raw) != 0 {
                return None;
            }
            Some(Self { saved })
        }
    }
}

#[cfg(unix)]
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        unsafe {
            libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, &self.saved);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn force_color_beats_no_color() {
        std::env::set_var("NO_COLOR", "1");
        std::env::set_var("CLICOLOR_FORCE", "1");
        assert!(color_enabled());
        std::env::remove_var("CLICOLOR_FORCE");
        assert!(!color_enabled());
        std::env::remove_var("NO_COLOR");
    }
}
