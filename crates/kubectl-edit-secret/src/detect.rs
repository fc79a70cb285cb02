//! Change detection
//!
//! The edit form carries help comments and the editor may touch whitespace,
//! so "did the user change anything" compares normalized buffers rather than
//! raw bytes.

/// Normalize a YAML buffer for comparison.
///
/// A buffer that parses as YAML is re-emitted as compact JSON, which drops
/// comments, indentation and trailing newlines but keeps key order. Anything
/// else falls back to [`manual_strip`].
pub fn strip_comments(buf: &[u8]) -> Vec<u8> {
    match serde_yaml::from_slice::<serde_yaml::Value>(buf) {
        Ok(value) => match serde_json::to_vec(&value) {
            Ok(json) => json,
            Err(_) => manual_strip(buf),
        },
        Err(_) => manual_strip(buf),
    }
}

/// Remove full-line `#` comments, keeping `#!` lines.
pub fn manual_strip(buf: &[u8]) -> Vec<u8> {
    let lines: Vec<&[u8]> = buf.split(|b| *b == b'\n').collect();
    let last = lines.len().saturating_sub(1);
    let mut out = Vec::with_capacity(buf.len());

    for (i, line) in lines.iter().enumerate() {
        if is_comment(line) {
            continue;
        }
        out.extend_from_slice(line);
        if i < last {
            out.push(b'\n');
        }
    }
    out
}

fn is_comment(line: &[u8]) -> bool {
    match line.iter().position(|b| !b.is_ascii_whitespace()) {
        Some(start) => line[start] == b'#' && line.get(start + 1) != Some(&b'!'),
        None => false,
    }
}

/// True when the buffer holds nothing but whitespace and comments
pub fn is_blank(buf: &[u8]) -> bool {
    manual_strip(buf).iter().all(|b| b.is_ascii_whitespace())
}

/// Did the edit change anything meaningful?
pub fn changed(original: &[u8], edited: &[u8]) -> bool {
    strip_comments(original) != strip_comments(edited)
}
