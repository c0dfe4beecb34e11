//! Delimiter escaping for free-text protocol fields.
//!
//! Replies such as attribute values or command output may contain the field
//! delimiter. [`escape`] rewrites a text so that the delimiter no longer
//! occurs in it at all, which lets the receiver split on the delimiter
//! without any look-behind:
//!
//! - the escape marker `\` becomes `\\`
//! - the delimiter becomes `\` followed by a substitute character
//!
//! The substitute is `d` (or `D` when the delimiter itself is `d`), so the
//! output never contains the delimiter as long as the delimiter is not the
//! escape marker.

/// Escape marker.
pub const ESCAPE: char = '\\';

const fn substitute(delimiter: char) -> char {
    if delimiter == 'd' { 'D' } else { 'd' }
}

/// Escapes every occurrence of `delimiter` (and of the escape marker) in
/// `text`.
pub fn escape(text: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == ESCAPE {
            out.push(ESCAPE);
            out.push(ESCAPE);
        } else if c == delimiter {
            out.push(ESCAPE);
            out.push(substitute(delimiter));
        } else {
            out.push(c);
        }
    }
    out
}

/// Reverses [`escape`].
///
/// Escape pairs that [`escape`] never produces, and a trailing lone marker,
/// are passed through verbatim.
pub fn unescape(text: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c != ESCAPE {
            out.push(c);
            continue;
        }

        match chars.peek().copied() {
            Some(ESCAPE) => {
                chars.next();
                out.push(ESCAPE);
            },
            Some(next) if next == substitute(delimiter) => {
                chars.next();
                out.push(delimiter);
            },
            _ => out.push(ESCAPE),
        }
    }
    out
}
