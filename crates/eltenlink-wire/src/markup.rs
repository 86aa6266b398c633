//! Markup stripping helpers.
//!
//! The server-side scripts occasionally leak warning markup (`<br />` notices
//! and the like) into otherwise line-oriented payloads, and free-text fields
//! may carry markup meant for the web frontend. Two distinct treatments are
//! needed: [`strip_tags`] deletes tags wholesale so that line indices of the
//! surrounding payload do not shift, while [`flatten`] renders marked-up free
//! text for plain display.

/// Deletes every `<...>` fragment from `input`, contents included.
///
/// A fragment is an opening `<`, one or more non-`>` characters, and a
/// closing `>`. An unterminated `<` and the empty `<>` pair are left alone.
/// Nothing is substituted in place of a deleted fragment, so the byte offsets
/// of everything outside tags collapse rather than shift by padding.
#[must_use]
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('>') {
            Some(close) if close > 0 => rest = &after[close + 1..],
            Some(_) => {
                // "<>" is not a tag
                out.push('<');
                rest = after;
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Renders marked-up free text as plain text.
///
/// Line-break tags (`<br>`, `<br/>`, `<p>`, `</p>`) become real newlines,
/// all other tags are removed, common entities are decoded, and runs of three
/// or more newlines collapse to a single blank line. The result is trimmed.
#[must_use]
pub fn flatten(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('>') {
            Some(close) if close > 0 => {
                let tag = after[..close].trim().to_ascii_lowercase();
                let name = tag
                    .trim_start_matches('/')
                    .trim_end_matches('/')
                    .trim();
                if name == "br" || name == "p" {
                    out.push('\n');
                }
                rest = &after[close + 1..];
            }
            Some(_) => {
                out.push('<');
                rest = after;
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    let decoded = decode_entities(&out);
    collapse_blank_runs(&decoded).trim().to_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

fn collapse_blank_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0usize;
    for ch in text.chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines <= 2 {
                out.push('\n');
            }
        } else {
            newlines = 0;
            out.push(ch);
        }
    }
    out
}
