use std::borrow::Cow;
use std::path::PathBuf;

use percent_encoding::{percent_decode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

use crate::consts::{GNOME_COPIED_FILES_MIME, PLAIN_TEXT_MIME, URI_LIST_MIME, UTF8_TEXT_MIME};
use crate::content::{ClipboardContent, ContentData, PathsAction};

/// RFC 3986: everything outside the unreserved set gets `%HH`-escaped.
pub const PERCENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Text,
    Paths,
}

/// One row of the registry. Lower priority is preferred.
#[derive(Debug, Clone, Copy)]
pub struct MimeType {
    pub name: &'static str,
    pub priority: u32,
    pub target: TargetKind,
    /// First line of an encoded paths list carries `copy` or `cut`.
    pub include_action: bool,
    /// Paths are serialised as percent-encoded `file://` URIs.
    pub encode_paths: bool,
}

pub const REGISTRY: &[MimeType] = &[
    MimeType {
        name: GNOME_COPIED_FILES_MIME,
        priority: 0,
        target: TargetKind::Paths,
        include_action: true,
        encode_paths: true,
    },
    MimeType {
        name: URI_LIST_MIME,
        priority: 1,
        target: TargetKind::Paths,
        include_action: false,
        encode_paths: true,
    },
    MimeType {
        name: UTF8_TEXT_MIME,
        priority: 2,
        target: TargetKind::Text,
        include_action: false,
        encode_paths: false,
    },
    MimeType {
        name: "UTF8_STRING",
        priority: 3,
        target: TargetKind::Text,
        include_action: false,
        encode_paths: false,
    },
    MimeType {
        name: PLAIN_TEXT_MIME,
        priority: 4,
        target: TargetKind::Text,
        include_action: false,
        encode_paths: false,
    },
    MimeType {
        name: "STRING",
        priority: 5,
        target: TargetKind::Text,
        include_action: false,
        encode_paths: false,
    },
    MimeType {
        name: "TEXT",
        priority: 6,
        target: TargetKind::Text,
        include_action: false,
        encode_paths: false,
    },
];

pub fn find(name: &str) -> Option<&'static MimeType> {
    REGISTRY.iter().find(|m| m.name == name)
}

/// Pick the type to request from a selection owner. A non-empty
/// preference is taken at face value as a raw text type; otherwise the
/// known offered type with the lowest priority wins.
pub fn find_best<'a, I>(offered: I, preferred: Option<&str>) -> Option<Cow<'static, str>>
where
    I: IntoIterator<Item = &'a str>,
{
    if let Some(p) = preferred {
        if !p.is_empty() {
            return Some(Cow::Owned(p.to_string()));
        }
    }
    offered
        .into_iter()
        .filter_map(find)
        .min_by_key(|m| m.priority)
        .map(|m| Cow::Borrowed(m.name))
}

/// Whether this type can carry the given content.
pub fn supports(mime: &MimeType, content: &ClipboardContent) -> bool {
    match (&content.data, mime.target) {
        (ContentData::Text { .. }, TargetKind::Text) => !mime.include_action && !mime.encode_paths,
        (ContentData::Paths { .. }, TargetKind::Paths) => true,
        _ => false,
    }
}

fn encode_path_line(path: &std::path::Path, encode: bool) -> String {
    if encode {
        match Url::from_file_path(path) {
            Ok(url) => {
                let mut s = url.as_str().to_string();
                // Many file managers expect directory URIs to end with '/'.
                if path.is_dir() && !s.ends_with('/') {
                    s.push('/');
                }
                s
            }
            Err(()) => path.to_string_lossy().into_owned(),
        }
    } else {
        path.to_string_lossy().into_owned()
    }
}

/// Encode content as this type's byte stream. `None` when unsupported.
pub fn encode(mime: &MimeType, content: &ClipboardContent) -> Option<Vec<u8>> {
    if !supports(mime, content) {
        return None;
    }
    match &content.data {
        ContentData::Text { text, .. } => Some(text.clone().into_bytes()),
        ContentData::Paths { paths, action } => {
            let mut out = String::new();
            if mime.include_action {
                out.push_str(match action {
                    PathsAction::Copy => "copy",
                    PathsAction::Cut => "cut",
                });
                out.push('\n');
            }
            for (i, p) in paths.iter().enumerate() {
                out.push_str(&encode_path_line(p, mime.encode_paths));
                if i + 1 < paths.len() {
                    out.push('\n');
                }
            }
            Some(out.into_bytes())
        }
        ContentData::Empty => None,
    }
}

/// Parse a (possibly gnome-prefixed) uri-list into paths plus the
/// declared action. Tolerates comments, blank lines, and plain paths.
fn decode_path_list(text: &str) -> (Vec<PathBuf>, PathsAction) {
    let mut action = PathsAction::Copy;
    let mut paths = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line {
            "copy" => action = PathsAction::Copy,
            "cut" => action = PathsAction::Cut,
            _ => {
                if let Ok(url) = Url::parse(line) {
                    if let Ok(p) = url.to_file_path() {
                        paths.push(p);
                        continue;
                    }
                }
                // Undecodable sequences fall through as literal paths.
                paths.push(PathBuf::from(
                    percent_decode(line.as_bytes())
                        .decode_utf8()
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| line.to_string()),
                ));
            }
        }
    }
    (paths, action)
}

/// Decode a byte stream received as this type.
pub fn decode(mime: &MimeType, bytes: &[u8]) -> ClipboardContent {
    if bytes.is_empty() {
        return ClipboardContent::default();
    }
    match mime.target {
        TargetKind::Text => ClipboardContent::text(
            String::from_utf8_lossy(bytes).into_owned(),
            mime.name.to_string(),
        ),
        TargetKind::Paths => {
            let text = String::from_utf8_lossy(bytes);
            let (paths, action) = decode_path_list(&text);
            if paths.is_empty() {
                ClipboardContent::default()
            } else {
                ClipboardContent::paths(paths, action)
            }
        }
    }
}

/// Decode bytes received as an arbitrary (possibly unknown) type name.
pub fn decode_as(name: &str, bytes: &[u8]) -> ClipboardContent {
    match find(name) {
        Some(mime) => decode(mime, bytes),
        None => {
            if bytes.is_empty() {
                ClipboardContent::default()
            } else {
                ClipboardContent::text(String::from_utf8_lossy(bytes).into_owned(), name.to_string())
            }
        }
    }
}

/// Every (name, payload) pair the registry can produce for `content`,
/// best-priority first. This is what gets advertised to the GUI.
pub fn encode_all(content: &ClipboardContent) -> Vec<(String, Vec<u8>)> {
    let mut rows: Vec<(&'static MimeType, Vec<u8>)> = REGISTRY
        .iter()
        .filter_map(|m| encode(m, content).map(|bytes| (m, bytes)))
        .collect();
    rows.sort_by_key(|(m, _)| m.priority);
    rows.into_iter()
        .map(|(m, bytes)| (m.name.to_string(), bytes))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use percent_encoding::percent_encode;

    #[test]
    fn best_type_has_lowest_priority() {
        let offered = ["TEXT", "text/plain", "text/uri-list"];
        assert_eq!(
            find_best(offered.iter().copied(), None).unwrap(),
            "text/uri-list"
        );
        let offered = ["STRING", "TEXT"];
        assert_eq!(find_best(offered.iter().copied(), None).unwrap(), "STRING");
    }

    #[test]
    fn preference_is_taken_verbatim() {
        let offered = ["text/plain"];
        assert_eq!(
            find_best(offered.iter().copied(), Some("application/x-custom")).unwrap(),
            "application/x-custom"
        );
        assert_eq!(find_best(offered.iter().copied(), Some("")).unwrap(), "text/plain");
    }

    #[test]
    fn include_action_only_applies_to_paths() {
        let gnome = find(GNOME_COPIED_FILES_MIME).unwrap();
        let text = ClipboardContent::text("hi".into(), "text/plain".into());
        assert!(!supports(gnome, &text));
        let paths = ClipboardContent::paths(vec![PathBuf::from("/tmp/x")], PathsAction::Cut);
        assert!(supports(gnome, &paths));
    }

    #[test]
    fn gnome_encoding_prefixes_the_action() {
        let gnome = find(GNOME_COPIED_FILES_MIME).unwrap();
        let content = ClipboardContent::paths(vec![PathBuf::from("/tmp/a b")], PathsAction::Cut);
        let bytes = encode(gnome, &content).unwrap();
        let s = String::from_utf8(bytes).unwrap();
        assert!(s.starts_with("cut\n"), "{s}");
        assert!(s.contains("file:///tmp/a%20b"), "{s}");
    }

    #[test]
    fn uri_list_roundtrips_paths() {
        let uri_list = find(URI_LIST_MIME).unwrap();
        let content =
            ClipboardContent::paths(vec![PathBuf::from("/tmp/hello world.txt")], PathsAction::Copy);
        let bytes = encode(uri_list, &content).unwrap();
        let decoded = decode(uri_list, &bytes);
        match decoded.data {
            ContentData::Paths { paths, action } => {
                assert_eq!(paths, vec![PathBuf::from("/tmp/hello world.txt")]);
                assert_eq!(action, PathsAction::Copy);
            }
            other => panic!("expected paths, got {other:?}"),
        }
    }

    #[test]
    fn text_roundtrips() {
        let utf8 = find(UTF8_TEXT_MIME).unwrap();
        let content = ClipboardContent::text("héllo".into(), UTF8_TEXT_MIME.into());
        let bytes = encode(utf8, &content).unwrap();
        let decoded = decode(utf8, &bytes);
        match decoded.data {
            ContentData::Text { text, .. } => assert_eq!(text, "héllo"),
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn percent_encoding_roundtrips_when_wellformed() {
        let raw = "a b/c%d\u{00e9}";
        let encoded = percent_encode(raw.as_bytes(), PERCENT_SET).to_string();
        let decoded = percent_decode(encoded.as_bytes()).decode_utf8().unwrap();
        assert_eq!(decoded, raw);
    }

    #[test]
    fn bad_percent_sequences_stay_literal() {
        let decoded = percent_decode(b"100%zz").decode_utf8().unwrap();
        assert_eq!(decoded, "100%zz");
    }

    #[test]
    fn unknown_offered_types_are_ignored() {
        let offered = ["application/x-unheard-of"];
        assert!(find_best(offered.iter().copied(), None).is_none());
    }

    #[test]
    fn encode_all_orders_by_priority() {
        let content = ClipboardContent::paths(vec![PathBuf::from("/tmp/x")], PathsAction::Copy);
        let all = encode_all(&content);
        assert_eq!(all[0].0, GNOME_COPIED_FILES_MIME);
        assert_eq!(all[1].0, URI_LIST_MIME);
        assert_eq!(all.len(), 2);

        let text = ClipboardContent::text("x".into(), PLAIN_TEXT_MIME.into());
        let all = encode_all(&text);
        assert_eq!(all[0].0, UTF8_TEXT_MIME);
        assert_eq!(all.len(), 5);
    }
}
