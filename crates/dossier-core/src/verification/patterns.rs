//! Citation marker patterns shared by verification and repair.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    /// Inline citation marker: `[citation:<id>]`
    pub static ref CITATION_MARKER: Regex = Regex::new(r"\[citation:([^\]]+)\]").unwrap();

    /// Ids a marker may name: alphanumerics, hyphen, underscore
    pub static ref CITATION_ID: Regex = Regex::new(r"^[A-Za-z0-9_\-]+$").unwrap();
}

/// Ids named by every citation marker in the text, in order of appearance.
pub fn citation_ids(text: &str) -> Vec<&str> {
    CITATION_MARKER
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Whether an id is safe to render inside a marker.
pub fn is_valid_citation_id(id: &str) -> bool {
    CITATION_ID.is_match(id)
}

/// Render the marker for one evidence id.
pub fn citation_marker(id: &str) -> String {
    format!("[citation:{}]", id)
}

/// Remove every citation marker, collapsing the whitespace left behind.
pub fn strip_citation_markers(text: &str) -> String {
    let stripped = CITATION_MARKER.replace_all(text, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop markers whose id fails `keep`, line by line.
///
/// Lines without markers are returned untouched; lines that had markers
/// keep their indentation and get their inner whitespace collapsed.
pub fn filter_citation_markers<F>(text: &str, keep: F) -> String
where
    F: Fn(&str) -> bool,
{
    text.lines()
        .map(|line| {
            if !CITATION_MARKER.is_match(line) {
                return line.to_string();
            }

            let filtered = CITATION_MARKER.replace_all(line, |caps: &Captures<'_>| {
                if keep(&caps[1]) {
                    caps[0].to_string()
                } else {
                    String::new()
                }
            });

            let indent_len = filtered.len() - filtered.trim_start().len();
            let body = filtered.split_whitespace().collect::<Vec<_>>().join(" ");
            format!("{}{}", &filtered[..indent_len], body)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
