//! Evidence model shared by retrieval, verification, repair and scoring.
//!
//! A single [`EvidenceItem`] record serves both retrieval (scored, tagged
//! with the backend that produced it) and scoring (dated, typed, located by
//! URI). Only `id` and `content` are mandatory.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::policy::RetrievalPolicy;

/// Errors from evidence bundle construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvidenceError {
    #[error("Duplicate evidence id in bundle: {0}")]
    DuplicateId(String),
}

/// The backend an evidence item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Vector,
    Web,
}

/// One retrieved fact or snippet with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    /// Unique within a bundle
    pub id: String,

    /// The evidence text
    pub content: String,

    /// Retrieval relevance (higher is better)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Backend identifier (table, provider, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EvidenceKind>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<String>,

    /// Source category used for diversity scoring (e.g. "web", "pdf")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,

    /// When the evidence was captured; naive timestamps are read as UTC
    #[serde(default, with = "timestamp", skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u32>,
}

impl EvidenceItem {
    /// Create an item with only the mandatory fields set.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            score: None,
            source: None,
            kind: None,
            metadata: BTreeMap::new(),
            section_id: None,
            source_type: None,
            uri: None,
            added_at: None,
            tokens: None,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_kind(mut self, kind: EvidenceKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_section_id(mut self, section_id: impl Into<String>) -> Self {
        self.section_id = Some(section_id.into());
        self
    }

    pub fn with_source_type(mut self, source_type: impl Into<String>) -> Self {
        self.source_type = Some(source_type.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_added_at(mut self, added_at: DateTime<Utc>) -> Self {
        self.added_at = Some(added_at);
        self
    }

    /// Set a timestamp that carries no zone; it is taken to be UTC.
    pub fn with_naive_added_at(mut self, added_at: NaiveDateTime) -> Self {
        self.added_at = Some(added_at.and_utc());
        self
    }

    pub fn with_tokens(mut self, tokens: u32) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Set `metadata.tags`.
    pub fn with_tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tags = tags.into_iter().map(|t| Value::String(t.into())).collect();
        self.with_metadata("tags", Value::Array(tags))
    }

    /// Tags stored under `metadata.tags`, ignoring non-string entries.
    pub fn tags(&self) -> Vec<&str> {
        match self.metadata.get("tags") {
            Some(Value::Array(values)) => values.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

/// Ordered evidence with unique ids and O(1) membership lookup.
///
/// Bundles produced by the retrieval router keep vector items ahead of web
/// items, so [`EvidenceBundle::combined`] reads vector-then-web.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBundle")]
pub struct EvidenceBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    policy: Option<RetrievalPolicy>,

    items: Vec<EvidenceItem>,

    #[serde(skip)]
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct RawBundle {
    #[serde(default)]
    policy: Option<RetrievalPolicy>,
    #[serde(default)]
    items: Vec<EvidenceItem>,
}

impl TryFrom<RawBundle> for EvidenceBundle {
    type Error = EvidenceError;

    fn try_from(raw: RawBundle) -> Result<Self, Self::Error> {
        let mut bundle = Self::new(raw.items)?;
        bundle.policy = raw.policy;
        Ok(bundle)
    }
}

impl EvidenceBundle {
    /// Build a flat bundle, rejecting duplicate ids.
    pub fn new(items: Vec<EvidenceItem>) -> Result<Self, EvidenceError> {
        let mut index = HashMap::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            if index.insert(item.id.clone(), position).is_some() {
                return Err(EvidenceError::DuplicateId(item.id.clone()));
            }
        }

        Ok(Self {
            policy: None,
            items,
            index,
        })
    }

    /// Build a bundle from per-backend partitions, vector first.
    ///
    /// Items without a kind are tagged with the partition they arrived in.
    pub fn from_partitions(
        policy: RetrievalPolicy,
        vector: Vec<EvidenceItem>,
        web: Vec<EvidenceItem>,
    ) -> Result<Self, EvidenceError> {
        let tag = |kind: EvidenceKind| {
            move |mut item: EvidenceItem| {
                item.kind.get_or_insert(kind);
                item
            }
        };

        let items = vector
            .into_iter()
            .map(tag(EvidenceKind::Vector))
            .chain(web.into_iter().map(tag(EvidenceKind::Web)))
            .collect();

        let mut bundle = Self::new(items)?;
        bundle.policy = Some(policy);
        Ok(bundle)
    }

    /// Routing policy that produced this bundle, if it came from the router.
    pub fn policy(&self) -> Option<RetrievalPolicy> {
        self.policy
    }

    pub fn has(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&EvidenceItem> {
        self.index.get(id).map(|&position| &self.items[position])
    }

    pub fn items(&self) -> &[EvidenceItem] {
        &self.items
    }

    /// All items, vector partition first for router-produced bundles.
    pub fn combined(&self) -> &[EvidenceItem] {
        &self.items
    }

    pub fn vector(&self) -> impl Iterator<Item = &EvidenceItem> {
        self.items
            .iter()
            .filter(|item| item.kind == Some(EvidenceKind::Vector))
    }

    pub fn web(&self) -> impl Iterator<Item = &EvidenceItem> {
        self.items
            .iter()
            .filter(|item| item.kind == Some(EvidenceKind::Web))
    }

    pub fn first_id(&self) -> Option<&str> {
        self.items.first().map(|item| item.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<EvidenceItem> {
        self.items
    }
}

/// Optional constraints applied during retrieval. Absent fields mean
/// "unfiltered".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalFilters {
    /// Containment match against item metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, Value>>,

    /// Allow-list of item sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ids: Option<Vec<String>>,

    /// Any-of match against `metadata.tags`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl RetrievalFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value);
        self
    }

    pub fn with_source_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// True when no field constrains anything.
    pub fn is_empty(&self) -> bool {
        self.metadata.as_ref().map_or(true, BTreeMap::is_empty)
            && self.source_ids.as_ref().map_or(true, Vec::is_empty)
            && self.tags.as_ref().map_or(true, Vec::is_empty)
    }

    /// Whether an item passes every configured constraint.
    pub fn matches(&self, item: &EvidenceItem) -> bool {
        if let Some(metadata) = self.metadata.as_ref() {
            let contained = metadata.iter().all(|(key, expected)| {
                item.metadata
                    .get(key)
                    .is_some_and(|actual| json_contains(actual, expected))
            });
            if !contained {
                return false;
            }
        }

        if let Some(source_ids) = self.source_ids.as_ref().filter(|ids| !ids.is_empty()) {
            let allowed = item
                .source
                .as_deref()
                .is_some_and(|source| source_ids.iter().any(|id| id == source));
            if !allowed {
                return false;
            }
        }

        if let Some(tags) = self.tags.as_ref().filter(|tags| !tags.is_empty()) {
            let item_tags = item.tags();
            if !tags.iter().any(|tag| item_tags.contains(&tag.as_str())) {
                return false;
            }
        }

        true
    }

    /// Canonical text form used for cache keys.
    ///
    /// Mapping keys are sorted and sequences are compared as multisets, so
    /// filters that differ only in insertion order produce the same key.
    /// Empty fields are treated the same as absent ones.
    pub fn canonical_key(&self) -> String {
        let metadata = self
            .metadata
            .as_ref()
            .filter(|m| !m.is_empty())
            .map(|m| {
                let entries: Vec<String> = m
                    .iter()
                    .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_value(v)))
                    .collect();
                format!("{{{}}}", entries.join(","))
            })
            .unwrap_or_default();

        format!(
            "m={};s={};t={}",
            metadata,
            canonical_set(self.source_ids.as_deref()),
            canonical_set(self.tags.as_deref()),
        )
    }
}

fn canonical_set(values: Option<&[String]>) -> String {
    let mut values: Vec<&str> = values.unwrap_or_default().iter().map(String::as_str).collect();
    values.sort_unstable();
    values.dedup();
    values.join("\u{1f}")
}

fn canonical_value(value: &Value) -> String {
    match value {
        Value::Array(values) => {
            let mut parts: Vec<String> = values.iter().map(canonical_value).collect();
            parts.sort();
            format!("[{}]", parts.join(","))
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, String)> =
                map.iter().map(|(k, v)| (k, canonical_value(v))).collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let parts: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), v))
                .collect();
            format!("{{{}}}", parts.join(","))
        }
        scalar => scalar.to_string(),
    }
}

/// JSON containment in the sense of `jsonb @>`: every key of an object
/// needle must be contained in the haystack, every element of an array
/// needle must be contained by some haystack element, scalars compare equal.
pub fn json_contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::Object(h), Value::Object(n)) => n
            .iter()
            .all(|(k, nv)| h.get(k).is_some_and(|hv| json_contains(hv, nv))),
        (Value::Array(h), Value::Array(n)) => {
            n.iter().all(|nv| h.iter().any(|hv| json_contains(hv, nv)))
        }
        // A scalar needle matches an array haystack holding it.
        (Value::Array(h), scalar) => h.iter().any(|hv| hv == scalar),
        (h, n) => h == n,
    }
}

mod timestamp {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
        }
    }

    /// Parse RFC 3339, or a naive date-time / date read as UTC.
    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        let s = s.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return Some(ts.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                return Some(naive.and_utc());
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }
}

pub use timestamp::parse as parse_timestamp;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(id: &str) -> EvidenceItem {
        EvidenceItem::new(id, format!("content of {}", id))
    }

    #[test]
    fn test_bundle_rejects_duplicate_ids() {
        let result = EvidenceBundle::new(vec![item("a"), item("b"), item("a")]);
        assert_eq!(result, Err(EvidenceError::DuplicateId("a".to_string())));
    }

    #[test]
    fn test_bundle_membership() {
        let bundle = EvidenceBundle::new(vec![item("a"), item("b")]).unwrap();
        assert!(bundle.has("a"));
        assert!(!bundle.has("c"));
        assert_eq!(bundle.get("b").unwrap().content, "content of b");
        assert_eq!(bundle.first_id(), Some("a"));
    }

    #[test]
    fn test_partitions_combine_vector_then_web() {
        let bundle = EvidenceBundle::from_partitions(
            RetrievalPolicy::WebOnly,
            vec![item("1")],
            vec![item("2")],
        )
        .unwrap();

        let ids: Vec<_> = bundle.combined().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(bundle.vector().count(), 1);
        assert_eq!(bundle.web().next().unwrap().kind, Some(EvidenceKind::Web));
        assert_eq!(bundle.policy(), Some(RetrievalPolicy::WebOnly));
    }

    #[test]
    fn test_bundle_deserialize_validates_ids() {
        let ok: EvidenceBundle =
            serde_json::from_value(json!({"items": [{"id": "a", "content": "x"}]})).unwrap();
        assert!(ok.has("a"));

        let dup = serde_json::from_value::<EvidenceBundle>(json!({
            "items": [{"id": "a", "content": "x"}, {"id": "a", "content": "y"}]
        }));
        assert!(dup.is_err());
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        let parsed: EvidenceItem = serde_json::from_value(json!({
            "id": "a",
            "content": "x",
            "added_at": "2024-03-01T12:00:00"
        }))
        .unwrap();
        let aware = parse_timestamp("2024-03-01T12:00:00+00:00").unwrap();
        assert_eq!(parsed.added_at, Some(aware));
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_filters_match_metadata_sources_and_tags() {
        let evidence = item("a")
            .with_source("pg")
            .with_metadata("tenant", json!("acme"))
            .with_tags(["finance", "q3"]);

        assert!(RetrievalFilters::new().matches(&evidence));
        assert!(RetrievalFilters::new()
            .with_metadata("tenant", json!("acme"))
            .with_source_ids(["pg", "other"])
            .with_tags(["q3", "missing"])
            .matches(&evidence));
        assert!(!RetrievalFilters::new()
            .with_metadata("tenant", json!("globex"))
            .matches(&evidence));
        assert!(!RetrievalFilters::new().with_source_ids(["web"]).matches(&evidence));
        assert!(!RetrievalFilters::new().with_tags(["legal"]).matches(&evidence));
    }

    #[test]
    fn test_canonical_key_ignores_order() {
        let a = RetrievalFilters::new()
            .with_metadata("region", json!({"country": "DE", "city": "Berlin"}))
            .with_metadata("tenant", json!("acme"))
            .with_tags(["b", "a"]);
        let b = RetrievalFilters::new()
            .with_metadata("tenant", json!("acme"))
            .with_metadata("region", json!({"city": "Berlin", "country": "DE"}))
            .with_tags(["a", "b"]);

        assert_eq!(a.canonical_key(), b.canonical_key());
        assert_ne!(
            a.canonical_key(),
            RetrievalFilters::new().with_tags(["a"]).canonical_key()
        );
        assert_eq!(
            RetrievalFilters::new().canonical_key(),
            RetrievalFilters::new().with_tags(Vec::<String>::new()).canonical_key()
        );
    }

    #[test]
    fn test_json_containment() {
        assert!(json_contains(&json!({"a": 1, "b": [1, 2]}), &json!({"b": [2]})));
        assert!(!json_contains(&json!({"a": 1}), &json!({"a": 2})));
        assert!(json_contains(&json!(["x", "y"]), &json!("y")));
    }
}
