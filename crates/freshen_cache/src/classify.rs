//! Stateless classifiers applied to file content and paths.
//!
//! These are heuristics, not parsers: they answer "is this text?", "does this
//! look minified?", "does this live under a dependency directory?" and "does
//! this end with a source map reference?" cheaply enough to run on every
//! cache miss.

use once_cell::sync::Lazy;
use regex::Regex;

/// Number of leading bytes inspected when detecting a text encoding.
pub const ENCODING_PROBE_LEN: usize = 4096;

/// Number of leading characters inspected by the minification heuristic.
pub const MINIFY_WINDOW_CHARS: usize = 1024;

/// Average line length above which text is considered minified.
pub const MINIFY_LINE_LENGTH: usize = 80;

/// Token that introduces a trailing source map reference.
pub const SOURCE_MAP_MARKER: &str = "//# sourceMappingURL=";

/// Control-like characters tolerated before text is rejected outright.
const MAX_CONTROL_CHARS: usize = 16;

/// Control-like characters as a share of all characters, at or above which
/// text is rejected.
const MAX_CONTROL_RATIO: f64 = 0.02;

static DEPENDENCY_DIR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[\\/](?:node_modules|bower_components|[^\\/]+\.asar)[\\/]")
        .expect("dependency directory pattern is valid")
});

/// A text encoding the cache knows how to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8.
    Utf8,
    /// UTF-16, little-endian.
    Utf16Le,
}

impl TextEncoding {
    /// Encodings tried during detection, in priority order.
    pub const CANDIDATES: [TextEncoding; 2] = [TextEncoding::Utf8, TextEncoding::Utf16Le];

    fn encoding(self) -> &'static encoding_rs::Encoding {
        match self {
            TextEncoding::Utf8 => encoding_rs::UTF_8,
            TextEncoding::Utf16Le => encoding_rs::UTF_16LE,
        }
    }

    /// Returns the WHATWG label of the encoding.
    pub fn name(self) -> &'static str {
        self.encoding().name()
    }

    /// Decodes `bytes`, substituting U+FFFD for malformed sequences.
    ///
    /// A byte order mark is kept as an ordinary character so the decoded
    /// text covers the whole input.
    pub fn decode(self, bytes: &[u8]) -> String {
        let (text, _had_errors) = self.encoding().decode_without_bom_handling(bytes);
        text.into_owned()
    }
}

/// Picks the first candidate encoding under which the start of `bytes`
/// decodes to plausible text.
///
/// Returns `None` when every candidate produces binary-looking output, which
/// is what classifies a file as binary.
pub fn detect_encoding(bytes: &[u8]) -> Option<TextEncoding> {
    let probe = &bytes[..bytes.len().min(ENCODING_PROBE_LEN)];
    TextEncoding::CANDIDATES
        .into_iter()
        .find(|encoding| !looks_binary(&encoding.decode(probe)))
}

/// Returns `true` if decoded text contains too many control-like characters
/// to be real text.
///
/// Control-like means a code point in `0..=7` or the replacement character a
/// decoder emits for malformed input.
pub fn looks_binary(text: &str) -> bool {
    let mut controls = 0usize;
    let mut total = 0usize;

    for c in text.chars() {
        total += 1;
        if is_control_like(c) {
            controls += 1;
            if controls > MAX_CONTROL_CHARS {
                return true;
            }
        }
    }

    if controls == 0 {
        return false;
    }
    (controls as f64 / total as f64) >= MAX_CONTROL_RATIO
}

fn is_control_like(c: char) -> bool {
    (c as u32) <= 7 || c == char::REPLACEMENT_CHARACTER
}

/// Guesses whether text is minified from its average line length.
///
/// Only the first [`MINIFY_WINDOW_CHARS`] characters are considered. With no
/// newline in the window, the window itself must be longer than
/// [`MINIFY_LINE_LENGTH`]; otherwise the average characters per newline must
/// exceed it.
pub fn is_minified(text: &str) -> bool {
    let window = match text.char_indices().nth(MINIFY_WINDOW_CHARS) {
        Some((end, _)) => &text[..end],
        None => text,
    };
    let length = window.chars().count();
    let newlines = window.matches('\n').count();

    if newlines == 0 {
        return length > MINIFY_LINE_LENGTH;
    }
    length as f64 / newlines as f64 > MINIFY_LINE_LENGTH as f64
}

/// Returns `true` if `path` passes through a third-party dependency
/// directory (`node_modules`, `bower_components`) or a packed application
/// archive (`*.asar`).
///
/// Matching is case-insensitive and accepts both `/` and `\` separators. The
/// file itself is never touched.
pub fn is_in_dependency_directory(path: &str) -> bool {
    DEPENDENCY_DIR.is_match(path)
}

/// Returns `true` if the last source map marker in `text` sits on its final
/// line.
pub fn has_source_map_reference(text: &str) -> bool {
    match (text.rfind(SOURCE_MAP_MARKER), text.rfind('\n')) {
        (Some(marker), Some(newline)) => marker > newline,
        (Some(_), None) => true,
        (None, _) => false,
    }
}
