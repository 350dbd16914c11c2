//! Report-level aggregation of section scores.
//!
//! The aggregate applies one fixed rule per metric: the arithmetic mean
//! across sections, re-clamped. Explanations are concatenated so every
//! number in the dashboard can be traced back to the section that moved it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::scoring::{clamp_score, score_section, METRICS};
use crate::types::{ReportRun, SectionRun, SectionScores};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRow {
    pub id: String,
    pub name: String,
    pub scores: SectionScores,
}

/// Plain data handed to dashboard renderers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub report: ReportSummary,
    pub sections: Vec<SectionRow>,
    pub aggregated_scores: SectionScores,
}

/// Stored scores when present, otherwise freshly computed ones.
fn scores_of(section: &SectionRun, config: &ScoringConfig) -> SectionScores {
    section
        .scores
        .clone()
        .unwrap_or_else(|| score_section(section, config))
}

/// Average each metric across sections.
///
/// Explanations are joined as `"{section name}: {explanation}"` with `" | "`.
pub fn aggregate_report_scores(sections: &[SectionRun], config: &ScoringConfig) -> SectionScores {
    let scored: Vec<SectionScores> = sections.iter().map(|s| scores_of(s, config)).collect();
    aggregate(sections, &scored)
}

fn aggregate(sections: &[SectionRun], scored: &[SectionScores]) -> SectionScores {
    if scored.is_empty() {
        let explanations = METRICS
            .iter()
            .map(|metric| (metric.to_string(), "No sections available to aggregate.".to_string()))
            .collect();
        return SectionScores {
            explanations,
            ..SectionScores::default()
        };
    }

    let count = scored.len() as f64;
    let mean = |pick: fn(&SectionScores) -> f64| {
        clamp_score(scored.iter().map(pick).sum::<f64>() / count)
    };

    let mut explanations: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (section, scores) in sections.iter().zip(scored) {
        for (metric, explanation) in &scores.explanations {
            explanations
                .entry(metric.clone())
                .or_default()
                .push(format!("{}: {}", section.name, explanation));
        }
    }

    SectionScores {
        coverage: mean(|s| s.coverage),
        diversity: mean(|s| s.diversity),
        recency: mean(|s| s.recency),
        redundancy: mean(|s| s.redundancy),
        explanations: explanations
            .into_iter()
            .map(|(metric, parts)| (metric, parts.join(" | ")))
            .collect(),
    }
}

/// Build the dashboard structure for a report.
pub fn build_dashboard(report: &ReportRun, config: &ScoringConfig) -> Dashboard {
    let scored: Vec<SectionScores> = report
        .sections
        .iter()
        .map(|section| scores_of(section, config))
        .collect();

    let aggregated_scores = aggregate(&report.sections, &scored);

    tracing::info!(
        report = %report.id,
        sections = report.sections.len(),
        coverage = aggregated_scores.coverage,
        "Dashboard built"
    );

    let sections = report
        .sections
        .iter()
        .zip(scored)
        .map(|(section, scores)| SectionRow {
            id: section.id.clone(),
            name: section.name.clone(),
            scores,
        })
        .collect();

    Dashboard {
        report: ReportSummary {
            id: report.id.clone(),
            title: report.title.clone(),
        },
        sections,
        aggregated_scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{EvidenceBundle, EvidenceItem};
    use crate::scoring::COVERAGE;

    fn scored_section(id: &str, name: &str, coverage: f64) -> SectionRun {
        let mut section = SectionRun::new(id, name, EvidenceBundle::default());
        section.scores = Some(SectionScores {
            coverage,
            diversity: 1.0,
            recency: 0.5,
            redundancy: 1.0,
            explanations: BTreeMap::from([(COVERAGE.to_string(), format!("{} covered", name))]),
        });
        section
    }

    #[test]
    fn test_empty_report_aggregates_to_zero() {
        let scores = aggregate_report_scores(&[], &ScoringConfig::default());
        assert_eq!(scores.coverage, 0.0);
        assert_eq!(scores.explanations.len(), 4);
        assert_eq!(scores.explanations[COVERAGE], "No sections available to aggregate.");
    }

    #[test]
    fn test_average_and_explanations() {
        let sections = vec![
            scored_section("s1", "Intro", 1.0),
            scored_section("s2", "Market", 0.5),
        ];

        let scores = aggregate_report_scores(&sections, &ScoringConfig::default());

        assert_eq!(scores.coverage, 0.75);
        assert_eq!(scores.recency, 0.5);
        assert_eq!(
            scores.explanations[COVERAGE],
            "Intro: Intro covered | Market: Market covered"
        );
    }

    #[test]
    fn test_dashboard_shape() {
        let bundle = EvidenceBundle::new(vec![EvidenceItem::new("a", "alpha")]).unwrap();
        let report = ReportRun {
            id: "r1".to_string(),
            title: "Quarterly".to_string(),
            sections: vec![
                scored_section("s1", "Intro", 1.0),
                SectionRun::new("s2", "Market", bundle).with_target_evidence(2),
            ],
        };

        let dashboard = build_dashboard(&report, &ScoringConfig::default());
        let value = serde_json::to_value(&dashboard).unwrap();

        assert_eq!(value["report"]["title"], "Quarterly");
        assert_eq!(value["sections"][1]["id"], "s2");
        assert_eq!(value["sections"][1]["scores"]["coverage"], 0.5);
        assert_eq!(value["aggregated_scores"]["coverage"], 0.75);
    }
}
