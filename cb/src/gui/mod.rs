use anyhow::bail;

use crate::content::ClipboardContent;
use crate::util::env_var_is_true;

#[cfg(all(unix, not(target_os = "macos")))]
pub mod wayland;
#[cfg(all(unix, not(target_os = "macos")))]
pub mod x11;

pub mod osc52;

/// What the core sees of a platform clipboard. Implementations live
/// behind this trait so the action routines never touch protocol
/// details.
pub trait GuiBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether the platform can represent a cut (vs copy) of files.
    fn supports_cut(&self) -> bool;

    /// Read the current selection. An unavailable or empty selection
    /// is `ClipboardContent::default()`, not an error.
    fn get(&self, preferred_mime: Option<&str>) -> anyhow::Result<ClipboardContent>;

    /// Publish content, possibly leaving a detached provider behind.
    /// Returns whether anything was published.
    fn set(&self, content: &ClipboardContent) -> anyhow::Result<bool>;
}

/// Pick the backend for this session. `CLIPBOARD_REQUIREX11` and
/// `CLIPBOARD_REQUIREWAYLAND` turn a missing display into a fatal
/// error instead of a silent no-GUI run.
pub fn pick_backend() -> anyhow::Result<Option<Box<dyn GuiBackend>>> {
    if env_var_is_true("CLIPBOARD_NOGUI") {
        return Ok(None);
    }

    let have_wayland = std::env::var_os("WAYLAND_DISPLAY").is_some();
    let have_x11 = std::env::var_os("DISPLAY").is_some();

    if env_var_is_true("CLIPBOARD_REQUIREWAYLAND") && !have_wayland {
        bail!("CLIPBOARD_REQUIREWAYLAND is set but there is no Wayland display");
    }
    if env_var_is_true("CLIPBOARD_REQUIREX11") && !have_x11 {
        bail!("CLIPBOARD_REQUIREX11 is set but there is no X11 display");
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        if have_wayland && !env_var_is_true("CLIPBOARD_REQUIREX11") {
            return Ok(Some(Box::new(wayland::WaylandBackend)));
        }
        if have_x11 {
            return Ok(Some(Box::new(x11::X11Backend)));
        }
    }

    let _ = (have_wayland, have_x11);
    Ok(None)
}
