use std::io::Read;

use log::debug;

use wl_clipboard_rs::copy;
use wl_clipboard_rs::paste;

use crate::content::ClipboardContent;
use crate::gui::GuiBackend;
use crate::mime;

/// Wayland via `wl_data_device`. The crate forks a small serve process
/// on copy, which is exactly the paste-provider lifetime we need: it
/// owns the selection until the compositor cancels it.
pub struct WaylandBackend;

impl GuiBackend for WaylandBackend {
    fn name(&self) -> &'static str {
        "wayland"
    }

    fn supports_cut(&self) -> bool {
        true
    }

    fn get(&self, preferred_mime: Option<&str>) -> anyhow::Result<ClipboardContent> {
        let offered = match paste::get_mime_types(paste::ClipboardType::Regular, paste::Seat::Unspecified)
        {
            Ok(types) => {
                let mut v: Vec<String> = types.into_iter().collect();
                v.sort();
                v
            }
            Err(e) => {
                debug!("wayland offer listing failed: {e}");
                return Ok(ClipboardContent::default());
            }
        };

        let Some(best) = mime::find_best(offered.iter().map(String::as_str), preferred_mime)
        else {
            return Ok(ClipboardContent::default());
        };

        let result = paste::get_contents(
            paste::ClipboardType::Regular,
            paste::Seat::Unspecified,
            paste::MimeType::Specific(&best),
        );
        match result {
            Ok((mut pipe, mime_name)) => {
                let mut bytes = Vec::new();
                if let Err(e) = pipe.read_to_end(&mut bytes) {
                    debug!("wayland receive failed: {e}");
                    return Ok(ClipboardContent::default());
                }
                let mut content = mime::decode_as(&mime_name, &bytes);
                content.available_types = offered;
                Ok(content)
            }
            Err(e) => {
                debug!("wayland paste failed: {e}");
                Ok(ClipboardContent::default())
            }
        }
    }

    fn set(&self, content: &ClipboardContent) -> anyhow::Result<bool> {
        let items = mime::encode_all(content);
        if items.is_empty() {
            return Ok(false);
        }

        let sources: Vec<copy::MimeSource> = items
            .into_iter()
            .map(|(name, bytes)| copy::MimeSource {
                source: copy::Source::Bytes(bytes.into_boxed_slice()),
                mime_type: copy::MimeType::Specific(name),
            })
            .collect();

        let mut opts = copy::Options::new();
        opts.clipboard(copy::ClipboardType::Regular)
            .seat(copy::Seat::All);

        match opts.copy_multi(sources) {
            Ok(()) => Ok(true),
            Err(e) => {
                debug!("wayland copy failed: {e}");
                Ok(false)
            }
        }
    }
}
