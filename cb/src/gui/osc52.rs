use std::io::Write;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::debug;

use crate::consts::OSC52_CHUNK;
use crate::terminal::Tty;
use crate::util::env_var_is_true;

const RESPONSE_WINDOW: Duration = Duration::from_millis(500);

/// OSC-52 only makes sense when the terminal sits on the far side of a
/// network link.
pub fn is_remote_session() -> bool {
    ["SSH_CLIENT", "SSH_TTY", "SSH_CONNECTION"]
        .iter()
        .any(|v| std::env::var_os(v).is_some())
}

pub fn enabled() -> bool {
    !env_var_is_true("CLIPBOARD_NOREMOTE")
}

/// Extract the base64 payload of an `ESC ] 52 ; c ; <b64> BEL|ST`
/// reply. Anything before the last `;` is terminal bookkeeping.
fn parse_response(raw: &[u8]) -> Option<String> {
    let s = String::from_utf8_lossy(raw);
    let after = s.rsplit(';').next()?;
    let after = after
        .trim_end_matches('\u{7}')
        .trim_end_matches('\\')
        .trim_end_matches('\u{1b}');
    if after.is_empty() {
        return None;
    }
    let decoded = BASE64.decode(after.trim()).ok()?;
    Some(String::from_utf8_lossy(&decoded).into_owned())
}

#[cfg(unix)]
fn poll_stdin(timeout_ms: i32) -> bool {
    let mut fds = libc::pollfd {
        fd: libc::STDIN_FILENO,
        events: libc::POLLIN,
        revents: 0,
    };
    unsafe { libc::poll(&mut fds, 1, timeout_ms) > 0 && (fds.revents & libc::POLLIN) != 0 }
}

#[cfg(unix)]
fn read_available(buf: &mut Vec<u8>) -> bool {
    let mut chunk = [0u8; 65536];
    let n = unsafe {
        libc::read(
            libc::STDIN_FILENO,
            chunk.as_mut_ptr() as *mut libc::c_void,
            chunk.len(),
        )
    };
    if n > 0 {
        buf.extend_from_slice(&chunk[..n as usize]);
        true
    } else {
        false
    }
}

/// Ask the terminal for its clipboard and wait briefly for the escape
/// reply. `None` when disabled, local, or the terminal stays silent.
#[cfg(unix)]
pub fn read_remote(tty: &Tty) -> Option<String> {
    if !enabled() || !is_remote_session() || !tty.stdout {
        return None;
    }

    let _raw = crate::terminal::RawModeGuard::enter()?;

    print!("\x1b]52;c;?\x07");
    let _ = std::io::stdout().flush();

    let mut response = Vec::new();
    let deadline = Instant::now() + RESPONSE_WINDOW;
    while Instant::now() < deadline {
        if poll_stdin(50) {
            if !read_available(&mut response) {
                break;
            }
            // A terminator means the reply is complete.
            if response.contains(&0x07) || response.windows(2).any(|w| w == b"\x1b\\") {
                break;
            }
        } else if !response.is_empty() {
            break;
        }
    }

    if response.is_empty() {
        debug!("no OSC-52 response from terminal");
        return None;
    }
    parse_response(&response)
}

#[cfg(not(unix))]
pub fn read_remote(_tty: &Tty) -> Option<String> {
    None
}

/// The OSC-52 sequences that publish `text`, honouring kitty's
/// 4096-byte-per-write limit.
fn write_sequences(text: &str, kitty: bool) -> Vec<String> {
    // Clear first so a partial write can't merge with stale content.
    let mut out = vec!["\x1b]52;c;\x07".to_string()];
    if kitty {
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let end = (i + OSC52_CHUNK).min(bytes.len());
            out.push(format!("\x1b]52;c;{}\x07", BASE64.encode(&bytes[i..end])));
            i = end;
        }
    } else {
        out.push(format!("\x1b]52;c;{}\x07", BASE64.encode(text)));
    }
    out
}

fn term_is_kitty() -> bool {
    std::env::var("TERM").map(|t| t == "xterm-kitty").unwrap_or(false)
}

/// Publish text through the terminal. Non-text content only clears.
pub fn write_remote(text: &str) {
    if !enabled() || !is_remote_session() {
        return;
    }
    for seq in write_sequences(text, term_is_kitty()) {
        print!("{seq}");
    }
    let _ = std::io::stdout().flush();
}

pub fn clear_remote() {
    if !enabled() || !is_remote_session() {
        return;
    }
    print!("\x1b]52;c;\x07");
    let _ = std::io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parsing_strips_framing() {
        let raw = b"\x1b]52;c;aGVsbG8gd29ybGQ=\x07";
        assert_eq!(parse_response(raw).unwrap(), "hello world");
        let st = b"\x1b]52;c;aGk=\x1b\\";
        assert_eq!(parse_response(st).unwrap(), "hi");
    }

    #[test]
    fn empty_or_garbage_responses_yield_none() {
        assert!(parse_response(b"").is_none());
        assert!(parse_response(b"\x1b]52;c;\x07").is_none());
        assert!(parse_response(b"\x1b]52;c;!!notbase64!!\x07").is_none());
    }

    #[test]
    fn base64_roundtrips_arbitrary_bytes() {
        let data: Vec<u8> = (0u8..=255).collect();
        let encoded = BASE64.encode(&data);
        assert_eq!(BASE64.decode(encoded).unwrap(), data);
    }

    #[test]
    fn kitty_chunks_payloads_at_4096() {
        let text = "x".repeat(OSC52_CHUNK * 2 + 10);
        let seqs = write_sequences(&text, true);
        // One clear plus three payload chunks.
        assert_eq!(seqs.len(), 4);
        for s in &seqs {
            assert!(s.starts_with("\x1b]52;c;"));
            assert!(s.ends_with('\x07'));
        }

        let plain = write_sequences(&text, false);
        assert_eq!(plain.len(), 2);
    }
}
