//! Reading text inputs, with optional encoding detection.
//!
//! Spreadsheet exports from legacy tools are frequently not UTF-8. With detection enabled, the
//! encoding is chosen as: byte-order mark if present, else UTF-8 if the bytes are valid UTF-8,
//! else Windows-1252.

use std::fs;
use std::path::Path;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

use crate::error::IngestionResult;

/// Read a text file.
///
/// - `guess_encoding = true`: detect the encoding and decode; always returns `Some`.
/// - `guess_encoding = false`: the file must be UTF-8; returns `Ok(None)` if it is not.
///
/// A leading UTF-8 byte-order mark is stripped in both modes. I/O failures are errors.
pub fn read_text(path: impl AsRef<Path>, guess_encoding: bool) -> IngestionResult<Option<String>> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;

    if !guess_encoding {
        return Ok(String::from_utf8(bytes).ok().map(strip_bom));
    }

    let encoding = detect_encoding(&bytes);
    tracing::debug!(path = %path.display(), encoding = encoding.name(), "detected encoding");
    Ok(Some(decode(&bytes, encoding)))
}

/// Pick the most likely encoding for `bytes`.
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _bom_len)) = Encoding::for_bom(bytes) {
        return encoding;
    }
    if std::str::from_utf8(bytes).is_ok() {
        UTF_8
    } else {
        WINDOWS_1252
    }
}

/// Decode `bytes` with `encoding`, replacing malformed sequences.
///
/// A byte-order mark, if present, overrides `encoding` and is removed.
pub fn decode(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (text, _used, _had_errors) = encoding.decode(bytes);
    text.into_owned()
}

fn strip_bom(s: String) -> String {
    match s.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => s,
    }
}
