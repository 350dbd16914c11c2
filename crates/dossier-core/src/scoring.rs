//! Scoring engine: four independent quality metrics over an evidence bundle.
//!
//! Every metric is rounded to 3 decimals, clamped to [0, 1] and paired with
//! a plain-language explanation. Scoring never fails: an empty bundle scores
//! 0.0 on every metric.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use url::Url;

use crate::config::ScoringConfig;
use crate::evidence::EvidenceBundle;
use crate::types::{SectionRun, SectionScores};

pub const COVERAGE: &str = "coverage";
pub const DIVERSITY: &str = "diversity";
pub const RECENCY: &str = "recency";
pub const REDUNDANCY: &str = "redundancy";

/// The metric names, in reporting order.
pub const METRICS: [&str; 4] = [COVERAGE, DIVERSITY, RECENCY, REDUNDANCY];

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Round to 3 decimals, then clamp into [0, 1].
pub fn clamp_score(value: f64) -> f64 {
    ((value * 1000.0).round() / 1000.0).clamp(0.0, 1.0)
}

fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Host of a URI, falling back to its scheme, then to `"unknown"`.
pub fn host_of(uri: Option<&str>) -> String {
    let Some(parsed) = uri.and_then(|u| Url::parse(u).ok()) else {
        return "unknown".to_string();
    };

    match parsed.host_str() {
        Some(host) if !host.is_empty() => host.to_lowercase(),
        _ => parsed.scheme().to_string(),
    }
}

/// Share of requirements found in the evidence, or of the evidence target
/// met when there are no requirements.
pub fn compute_coverage(
    bundle: &EvidenceBundle,
    requirements: &[String],
    target_evidence: usize,
    config: &ScoringConfig,
) -> (f64, String) {
    if bundle.is_empty() {
        return (0.0, "No evidence captured for this section.".to_string());
    }

    if requirements.is_empty() {
        let baseline = if target_evidence > 0 {
            target_evidence
        } else {
            config.default_baseline.max(1)
        };
        let score = (bundle.len() as f64 / baseline as f64).min(1.0);
        return (
            clamp_score(score),
            format!(
                "Using heuristic coverage: {} evidence items against baseline of {}.",
                bundle.len(),
                baseline
            ),
        );
    }

    let contents: Vec<String> = bundle
        .items()
        .iter()
        .map(|item| normalize_text(&item.content))
        .collect();

    let hits = requirements
        .iter()
        .map(|requirement| normalize_text(requirement))
        .filter(|requirement| contents.iter().any(|content| content.contains(requirement.as_str())))
        .count();

    (
        clamp_score(hits as f64 / requirements.len() as f64),
        format!(
            "Matched {}/{} requirements within evidence content.",
            hits,
            requirements.len()
        ),
    )
}

/// Share of distinct `(source_type, host)` buckets among the items.
pub fn compute_diversity(bundle: &EvidenceBundle) -> (f64, String) {
    if bundle.is_empty() {
        return (0.0, "No evidence available to evaluate diversity.".to_string());
    }

    let buckets: HashSet<(Option<&str>, String)> = bundle
        .items()
        .iter()
        .map(|item| (item.source_type.as_deref(), host_of(item.uri.as_deref())))
        .collect();

    (
        clamp_score(buckets.len() as f64 / bundle.len() as f64),
        format!(
            "{} unique source buckets across {} items.",
            buckets.len(),
            bundle.len()
        ),
    )
}

/// `1 - mean_age / window`, measured at `now`.
///
/// Items without a timestamp do not contribute.
pub fn compute_recency(
    bundle: &EvidenceBundle,
    recency_window_days: u32,
    now: DateTime<Utc>,
) -> (f64, String) {
    if bundle.is_empty() {
        return (0.0, "No evidence available to evaluate recency.".to_string());
    }

    let ages: Vec<f64> = bundle
        .items()
        .iter()
        .filter_map(|item| item.added_at)
        .map(|added_at| (now - added_at).num_milliseconds() as f64 / 1000.0 / SECONDS_PER_DAY)
        .collect();

    if ages.is_empty() {
        return (0.0, "No evidence timestamps available to evaluate recency.".to_string());
    }

    let window = f64::from(recency_window_days.max(1));
    let average_age = ages.iter().sum::<f64>() / ages.len() as f64;

    (
        clamp_score(1.0 - average_age / window),
        format!(
            "Average evidence age is {:.1} days (window {} days).",
            average_age, recency_window_days
        ),
    )
}

/// Share of items with distinct normalized content; 1.0 means no repeats.
pub fn compute_redundancy(bundle: &EvidenceBundle) -> (f64, String) {
    if bundle.is_empty() {
        return (0.0, "No evidence available to evaluate redundancy.".to_string());
    }

    let unique: HashSet<String> = bundle
        .items()
        .iter()
        .map(|item| normalize_text(&item.content))
        .collect();

    (
        clamp_score(unique.len() as f64 / bundle.len() as f64),
        format!(
            "{} unique evidence items out of {} implies low redundancy when closer to 1.0.",
            unique.len(),
            bundle.len()
        ),
    )
}

/// Score a section against the current time.
pub fn score_section(section: &SectionRun, config: &ScoringConfig) -> SectionScores {
    score_section_at(section, config, Utc::now())
}

/// Score a section with recency measured at `now`.
pub fn score_section_at(
    section: &SectionRun,
    config: &ScoringConfig,
    now: DateTime<Utc>,
) -> SectionScores {
    let bundle = &section.evidence_bundle;

    let (coverage, coverage_explanation) =
        compute_coverage(bundle, &section.requirements, section.target_evidence, config);
    let (diversity, diversity_explanation) = compute_diversity(bundle);
    let (recency, recency_explanation) = compute_recency(bundle, config.recency_window_days, now);
    let (redundancy, redundancy_explanation) = compute_redundancy(bundle);

    tracing::debug!(
        section = %section.id,
        items = bundle.len(),
        coverage,
        diversity,
        recency,
        redundancy,
        "Section scored"
    );

    let explanations = BTreeMap::from([
        (COVERAGE.to_string(), coverage_explanation),
        (DIVERSITY.to_string(), diversity_explanation),
        (RECENCY.to_string(), recency_explanation),
        (REDUNDANCY.to_string(), redundancy_explanation),
    ]);

    SectionScores {
        coverage,
        diversity,
        recency,
        redundancy,
        explanations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::EvidenceItem;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn bundle(items: Vec<EvidenceItem>) -> EvidenceBundle {
        EvidenceBundle::new(items).unwrap()
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(0.66666), 0.667);
        assert_eq!(clamp_score(1.2), 1.0);
        assert_eq!(clamp_score(-0.5), 0.0);
    }

    #[test]
    fn test_coverage_against_requirements() {
        let evidence = bundle(vec![
            EvidenceItem::new("a", "Revenue   GREW in Q3"),
            EvidenceItem::new("b", "Headcount was flat"),
        ]);
        let requirements = vec![
            "revenue grew".to_string(),
            "headcount".to_string(),
            "churn".to_string(),
        ];

        let (score, explanation) =
            compute_coverage(&evidence, &requirements, 0, &ScoringConfig::default());

        assert_eq!(score, 0.667);
        assert_eq!(explanation, "Matched 2/3 requirements within evidence content.");
    }

    #[test]
    fn test_heuristic_coverage_and_redundancy() {
        let section = SectionRun::new(
            "s1",
            "Market",
            bundle(vec![
                EvidenceItem::new("a", "Same text"),
                EvidenceItem::new("b", "same   text"),
                EvidenceItem::new("c", "Other text"),
            ]),
        )
        .with_target_evidence(4);

        let scores = score_section_at(&section, &ScoringConfig::default(), now());

        assert_eq!(scores.coverage, 0.75);
        assert_eq!(scores.redundancy, 0.667);
        assert!(scores.redundancy < 1.0);
    }

    #[test]
    fn test_default_baseline() {
        let evidence = bundle(vec![EvidenceItem::new("a", "x")]);
        let (score, explanation) = compute_coverage(&evidence, &[], 0, &ScoringConfig::default());
        assert_eq!(score, 0.333);
        assert!(explanation.ends_with("baseline of 3."));
    }

    #[test]
    fn test_diversity_buckets_by_type_and_host() {
        let evidence = bundle(vec![
            EvidenceItem::new("a", "1")
                .with_source_type("web")
                .with_uri("https://example.com/a"),
            EvidenceItem::new("b", "2")
                .with_source_type("web")
                .with_uri("https://EXAMPLE.com/b"),
            EvidenceItem::new("c", "3").with_source_type("pdf"),
            EvidenceItem::new("d", "4").with_source_type("pdf").with_uri("not a url"),
        ]);

        let (score, explanation) = compute_diversity(&evidence);

        assert_eq!(score, 0.5);
        assert_eq!(explanation, "2 unique source buckets across 4 items.");
    }

    #[test]
    fn test_host_of_fallbacks() {
        assert_eq!(host_of(Some("https://docs.rs/x")), "docs.rs");
        assert_eq!(host_of(Some("mailto:team@example.com")), "mailto");
        assert_eq!(host_of(Some("garbage")), "unknown");
        assert_eq!(host_of(None), "unknown");
    }

    #[test]
    fn test_recency_mean_age() {
        let evidence = bundle(vec![
            EvidenceItem::new("a", "1").with_added_at(now() - Duration::days(30)),
            EvidenceItem::new("b", "2").with_added_at(now() - Duration::days(60)),
            EvidenceItem::new("c", "3"),
        ]);

        let (score, explanation) = compute_recency(&evidence, 180, now());

        assert_eq!(score, 0.75);
        assert_eq!(explanation, "Average evidence age is 45.0 days (window 180 days).");
    }

    #[test]
    fn test_recency_clamps_at_both_ends() {
        let old = bundle(vec![
            EvidenceItem::new("a", "1").with_added_at(now() - Duration::days(400))
        ]);
        assert_eq!(compute_recency(&old, 180, now()).0, 0.0);

        let future = bundle(vec![
            EvidenceItem::new("a", "1").with_added_at(now() + Duration::days(3))
        ]);
        assert_eq!(compute_recency(&future, 180, now()).0, 1.0);
    }

    #[test]
    fn test_recency_without_timestamps() {
        let evidence = bundle(vec![EvidenceItem::new("a", "1")]);
        let (score, explanation) = compute_recency(&evidence, 180, now());
        assert_eq!(score, 0.0);
        assert!(explanation.contains("No evidence timestamps"));
    }

    #[test]
    fn test_empty_bundle_scores_zero() {
        let section = SectionRun::new("s", "Empty", EvidenceBundle::default());
        let scores = score_section_at(&section, &ScoringConfig::default(), now());

        assert_eq!(
            (scores.coverage, scores.diversity, scores.recency, scores.redundancy),
            (0.0, 0.0, 0.0, 0.0)
        );
        assert_eq!(scores.explanations.len(), 4);
        assert!(scores.explanations[COVERAGE].starts_with("No evidence"));
    }
}
