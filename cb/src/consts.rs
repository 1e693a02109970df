pub const TEMPORARY_DIR_NAME: &str = "Clipboard";
pub const PERSISTENT_DIR_NAME: &str = ".clipboard";

pub const DATA_DIR: &str = "data";
pub const METADATA_DIR: &str = "metadata";

pub const RAW_DATA_FILE: &str = "rawdata.clipboard";
pub const ORIGINALS_FILE: &str = "originals";
pub const NOTES_FILE: &str = "notes";
pub const LOCK_FILE: &str = "lock";
pub const IGNORE_FILE: &str = "ignore";
pub const MIME_FILE: &str = "mime";
pub const SCRIPT_FILE: &str = "script";

pub const DEFAULT_CLIPBOARD_NAME: &str = "0";
pub const DEFAULT_CLIPBOARD_ENTRY: usize = 0;

pub const IMPORT_EXPORT_DIR: &str = "Exported_Clipboards";

pub const URI_LIST_MIME: &str = "text/uri-list";
pub const GNOME_COPIED_FILES_MIME: &str = "x-special/gnome-copied-files";
pub const UTF8_TEXT_MIME: &str = "text/plain;charset=utf-8";
pub const PLAIN_TEXT_MIME: &str = "text/plain";

// OSC-52 payloads are truncated by most terminals at this size; the
// ingest dedupe check relies on it.
pub const OSC52_CHUNK: usize = 4096;
