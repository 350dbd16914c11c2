//! Document-wide footnote numbering for citations.
//!
//! Numbers are assigned by first registration and keyed on the canonical
//! citation key, so a source cited from several sections gets exactly one
//! footnote.

use std::collections::{BTreeMap, HashMap};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref METADATA_KEY_SEPARATORS: Regex = Regex::new(r"[_\s]+").unwrap();
}

/// A single source reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub key: String,
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Citation {
    pub fn new(key: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            source: source.into(),
            title: None,
            url: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Key used for deduplication: trimmed and lower-cased.
    pub fn canonical_key(&self) -> String {
        self.key.trim().to_lowercase()
    }
}

/// Builds inline footnote markers and the sources appendix.
#[derive(Debug, Default)]
pub struct CitationFormatter {
    index_by_key: HashMap<String, usize>,
    ordered: Vec<Citation>,
}

impl CitationFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign numbers to citations not seen before.
    pub fn register<'a, I>(&mut self, citations: I)
    where
        I: IntoIterator<Item = &'a Citation>,
    {
        for citation in citations {
            self.number_for(citation);
        }
    }

    fn number_for(&mut self, citation: &Citation) -> usize {
        let key = citation.canonical_key();
        if let Some(&number) = self.index_by_key.get(&key) {
            return number;
        }

        self.ordered.push(citation.clone());
        let number = self.ordered.len();
        self.index_by_key.insert(key, number);
        number
    }

    /// `[^n]` for the citation, registering it if unseen.
    pub fn inline_marker(&mut self, citation: &Citation) -> String {
        format!("[^{}]", self.number_for(citation))
    }

    /// Append markers for `citations` to `body`.
    pub fn annotate_body(&mut self, body: &str, citations: &[Citation]) -> String {
        if citations.is_empty() {
            return body.to_string();
        }

        let markers: Vec<String> = citations.iter().map(|c| self.inline_marker(c)).collect();
        let separator = if body.is_empty() || body.ends_with([' ', '\n']) {
            ""
        } else {
            " "
        };

        format!("{}{}{}", body, separator, markers.join(" "))
    }

    /// Number of distinct sources registered so far.
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn render_sources_appendix(&self) -> String {
        let mut lines = vec!["### Sources".to_string()];
        if self.ordered.is_empty() {
            lines.push("_No sources provided._".to_string());
            return lines.join("\n");
        }

        for (position, citation) in self.ordered.iter().enumerate() {
            lines.push(format!("[^{}]: {}", position + 1, descriptor(citation)));

            if !citation.metadata.is_empty() {
                lines.push("  - Metadata:".to_string());
                for (key, value) in &citation.metadata {
                    lines.push(format!("    - {}: {}", metadata_key(key), value));
                }
            }
        }

        lines.join("\n")
    }
}

fn descriptor(citation: &Citation) -> String {
    let title = citation.title.as_deref().unwrap_or("Untitled source");
    match citation.url.as_deref() {
        Some(url) => format!("{} — {} ({})", title, citation.source, url),
        None => format!("{} — {}", title, citation.source),
    }
}

fn metadata_key(key: &str) -> String {
    let sanitized = METADATA_KEY_SEPARATORS.replace_all(key, " ");
    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized.to_string()
    }
}
