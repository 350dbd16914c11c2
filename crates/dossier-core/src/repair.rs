//! Repair engine: turns verification findings into corrective edits.
//!
//! Repair is a single best-effort pass. It fixes what can be fixed
//! mechanically (citation markers, claim evidence ids) and leaves the rest
//! (contradictions, length, headings) to the caller, who is expected to
//! re-run verification.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::evidence::EvidenceBundle;
use crate::policy::CitationPolicy;
use crate::types::{Claim, IssueCode, SectionDraft, VerificationIssue};
use crate::verification::patterns::{
    citation_marker, filter_citation_markers, strip_citation_markers,
};

lazy_static! {
    /// Bullet (`-`, `*`, `+`) or ordered (`1.`, `1)`) list marker with indentation
    static ref LIST_MARKER: Regex = Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+").unwrap();
}

/// Codes that trigger rewriting claim lines with citation markers.
const CITATION_REPAIR_CODES: [IssueCode; 3] = [
    IssueCode::CitationsMissing,
    IssueCode::CitationMismatch,
    IssueCode::EvidenceMissing,
];

/// Render a checklist of issues grouped by code, in first-seen code order.
///
/// ```text
/// Repair Checklist:
/// - EVIDENCE_MISSING:
///   - Claim 'x' lacks evidence ids.
/// - Re-run verification after applying fixes.
/// ```
pub fn generate_repair_instructions(issues: &[VerificationIssue]) -> String {
    let mut grouped: Vec<(IssueCode, Vec<&str>)> = Vec::new();
    for issue in issues {
        match grouped.iter_mut().find(|(code, _)| *code == issue.code) {
            Some((_, messages)) => messages.push(&issue.message),
            None => grouped.push((issue.code, vec![&issue.message])),
        }
    }

    let mut lines = vec!["Repair Checklist:".to_string()];
    for (code, messages) in grouped {
        lines.push(format!("- {}:", code));
        lines.extend(messages.into_iter().map(|message| format!("  - {}", message)));
    }
    lines.push("- Re-run verification after applying fixes.".to_string());

    lines.join("\n")
}

/// Apply automatic fixes to a draft.
///
/// Under a citation-requiring policy:
/// - claims keep only evidence ids present in `evidence`
/// - markers naming ids absent from `evidence` are removed from the markdown
/// - when a citation issue is present, every claim line is rewritten as
///   `{list marker}{text} {markers}`; claims without a matching line are
///   appended as bullets
///
/// Under any other policy every claim loses its evidence ids and every
/// citation marker is removed, whatever the issues are.
pub fn repair_section(
    draft: &SectionDraft,
    issues: &[VerificationIssue],
    evidence: &EvidenceBundle,
    policy: CitationPolicy,
) -> SectionDraft {
    if !policy.requires_citations() {
        tracing::debug!(policy = %policy, claims = draft.claims.len(), "Stripping citations");
        return SectionDraft {
            markdown: filter_citation_markers(&draft.markdown, |_| false),
            claims: draft.claims.iter().map(|claim| Claim::new(claim.text.clone())).collect(),
            open_questions: draft.open_questions.clone(),
        };
    }

    let claims: Vec<Claim> = draft
        .claims
        .iter()
        .map(|claim| Claim {
            text: claim.text.clone(),
            evidence_ids: claim
                .evidence_ids
                .iter()
                .filter(|id| evidence.has(id))
                .cloned()
                .collect(),
        })
        .collect();

    let needs_citations = issues
        .iter()
        .any(|issue| CITATION_REPAIR_CODES.contains(&issue.code));

    let markdown = if needs_citations {
        tracing::debug!(policy = %policy, claims = claims.len(), "Rewriting claim citations");
        ensure_citations(&draft.markdown, &claims)
    } else {
        draft.markdown.clone()
    };

    SectionDraft {
        markdown: filter_citation_markers(&markdown, |id| evidence.has(id)),
        claims,
        open_questions: draft.open_questions.clone(),
    }
}

/// Rewrite each claim's line in place; append claims that have no line.
fn ensure_citations(markdown: &str, claims: &[Claim]) -> String {
    let mut placed: HashSet<usize> = HashSet::new();
    let wanted: Vec<String> = claims.iter().map(|claim| collapse(&claim.text)).collect();

    let mut lines: Vec<String> = markdown
        .lines()
        .map(|line| {
            let (marker, text) = split_list_marker(line);
            let position = wanted
                .iter()
                .enumerate()
                .position(|(i, claim)| !placed.contains(&i) && *claim == text);

            match position {
                Some(i) => {
                    placed.insert(i);
                    render_claim_line(marker, &claims[i])
                }
                None => line.to_string(),
            }
        })
        .collect();

    lines.extend(
        claims
            .iter()
            .enumerate()
            .filter(|(i, _)| !placed.contains(i))
            .map(|(_, claim)| render_claim_line("- ", claim)),
    );

    lines.join("\n")
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split a line into its list marker (with indentation) and the claim it
/// states, markers removed and whitespace collapsed.
fn split_list_marker(line: &str) -> (&str, String) {
    match LIST_MARKER.find(line) {
        Some(m) => (m.as_str(), strip_citation_markers(&line[m.end()..])),
        None => ("", strip_citation_markers(line)),
    }
}

fn render_claim_line(marker: &str, claim: &Claim) -> String {
    let markers: Vec<String> = claim.evidence_ids.iter().map(|id| citation_marker(id)).collect();
    format!("{}{} {}", marker, claim.text, markers.join(" "))
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::EvidenceItem;
    use crate::verification::patterns::citation_ids;

    fn bundle() -> EvidenceBundle {
        EvidenceBundle::new(vec![
            EvidenceItem::new("ev1", "first"),
            EvidenceItem::new("ev2", "second"),
        ])
        .unwrap()
    }

    #[test]
    fn test_instructions_grouped_in_first_seen_order() {
        let issues = vec![
            VerificationIssue::new(IssueCode::TooShort, "short"),
            VerificationIssue::new(IssueCode::EvidenceMissing, "claim a"),
            VerificationIssue::new(IssueCode::TooShort, "still short"),
        ];

        assert_eq!(
            generate_repair_instructions(&issues),
            "Repair Checklist:\n\
             - TOO_SHORT:\n  - short\n  - still short\n\
             - EVIDENCE_MISSING:\n  - claim a\n\
             - Re-run verification after applying fixes."
        );
    }

    #[test]
    fn test_instructions_without_issues() {
        assert_eq!(
            generate_repair_instructions(&[]),
            "Repair Checklist:\n- Re-run verification after applying fixes."
        );
    }

    #[test]
    fn test_citation_repair_rewrites_claim_lines_in_place() {
        let draft = SectionDraft::new(
            "# Summary\n- Revenue grew\n- Costs fell [citation:ev9]",
            vec![
                Claim::cited("Revenue grew", ["ev1", "ghost"]),
                Claim::cited("Costs fell", ["ev2"]),
                Claim::cited("Margins held", ["ev1"]),
            ],
        );
        let issues = vec![VerificationIssue::new(IssueCode::CitationsMissing, "none")];

        let repaired = repair_section(&draft, &issues, &bundle(), CitationPolicy::VectorOnly);

        assert_eq!(
            repaired.markdown,
            "# Summary\n\
             - Revenue grew [citation:ev1]\n\
             - Costs fell [citation:ev2]\n\
             - Margins held [citation:ev1]"
        );
        assert_eq!(repaired.claims[0].evidence_ids, vec!["ev1"]);
    }

    #[test]
    fn test_citation_repair_matches_spacing_and_numbered_items() {
        let draft = SectionDraft::new(
            "# Summary\n- Revenue  grew\n1. Costs fell\n  2) Margins   held [citation:ghost]",
            vec![
                Claim::cited("Revenue grew", ["ev1"]),
                Claim::cited("Costs fell", ["ev1"]),
                Claim::cited("Margins  held", ["ev2"]),
            ],
        );
        let issues = vec![VerificationIssue::new(IssueCode::CitationMismatch, "m")];

        let repaired = repair_section(&draft, &issues, &bundle(), CitationPolicy::All);

        assert_eq!(
            repaired.markdown,
            "# Summary\n\
             - Revenue grew [citation:ev1]\n\
             1. Costs fell [citation:ev1]\n  \
             2) Margins held [citation:ev2]"
        );
        assert_eq!(repaired.markdown.lines().count(), 4);
    }

    #[test]
    fn test_unknown_markers_dropped_without_citation_issues() {
        let draft = SectionDraft::new(
            "- Revenue grew [citation:ev1] [citation:ghost]",
            vec![Claim::cited("Revenue grew", ["ev1", "ghost"])],
        );
        let issues = vec![VerificationIssue::new(IssueCode::EvidenceUnknown, "ghost")];

        let repaired = repair_section(&draft, &issues, &bundle(), CitationPolicy::All);

        assert_eq!(citation_ids(&repaired.markdown), vec!["ev1"]);
        assert_eq!(repaired.claims[0].evidence_ids, vec!["ev1"]);
    }

    #[test]
    fn test_non_citation_policy_strips_everything() {
        let draft = SectionDraft::new(
            "# Summary\n- Revenue grew [citation:ev1]",
            vec![Claim::cited("Revenue grew", ["ev1"])],
        );

        let repaired = repair_section(&draft, &[], &bundle(), CitationPolicy::LlmOnly);

        assert_eq!(repaired.markdown, "# Summary\n- Revenue grew");
        assert!(repaired.claims.iter().all(|c| c.evidence_ids.is_empty()));
    }

    #[test]
    fn test_contradiction_left_alone() {
        let draft = SectionDraft::new("Do not mention outage.", vec![]);
        let issues = vec![VerificationIssue::new(IssueCode::Contradiction, "x")];

        let repaired = repair_section(&draft, &issues, &bundle(), CitationPolicy::All);

        assert_eq!(repaired.markdown, draft.markdown);
    }
}
