use chrono::{Duration, TimeZone, Utc};
use dossier_core::verification::patterns::{citation_ids, citation_marker};
use dossier_core::*;
use proptest::prelude::*;

const POOL: [&str; 6] = ["ev0", "ev1", "ev2", "ev3", "ghost-a", "ghost_b"];

fn arb_citation_policy() -> impl Strategy<Value = CitationPolicy> {
    proptest::sample::select(CitationPolicy::ALL.to_vec())
}

fn arb_issue_code() -> impl Strategy<Value = IssueCode> {
    prop_oneof![
        Just(IssueCode::CitationsMissing),
        Just(IssueCode::CitationMismatch),
        Just(IssueCode::EvidenceMissing),
        Just(IssueCode::EvidenceUnknown),
        Just(IssueCode::Contradiction),
        Just(IssueCode::TooShort),
    ]
}

fn arb_claim() -> impl Strategy<Value = Claim> {
    (
        "[A-Za-z][A-Za-z ]{0,24}",
        proptest::collection::vec(proptest::sample::select(POOL.to_vec()), 0..4),
    )
        .prop_map(|(text, ids)| Claim::cited(text.trim_end().to_string(), ids))
}

/// Bundle holding the first `n` real ids of the pool.
fn bundle_of(n: usize) -> EvidenceBundle {
    let items = POOL[..n.min(4)]
        .iter()
        .map(|id| EvidenceItem::new(*id, format!("content {}", id)))
        .collect();
    EvidenceBundle::new(items).unwrap()
}

fn render(claims: &[Claim], heading: &str) -> String {
    let mut lines = vec![format!("# {}", heading)];
    for claim in claims {
        let markers: Vec<String> =
            claim.evidence_ids.iter().map(|id| citation_marker(id)).collect();
        lines.push(format!("- {} {}", claim.text, markers.join(" ")));
    }
    lines.join("\n")
}

fn arb_item() -> impl Strategy<Value = EvidenceItem> {
    (
        "[a-z ]{0,12}",
        proptest::option::of(prop_oneof![Just("web"), Just("pdf"), Just("db")]),
        proptest::option::of(prop_oneof![
            Just("https://a.example.com/x"),
            Just("https://b.example.org"),
            Just("file:///tmp/report.pdf"),
            Just("nonsense"),
        ]),
        proptest::option::of(-30i64..900),
    )
        .prop_map(|(content, source_type, uri, age_days)| {
            let mut item = EvidenceItem::new("placeholder", content);
            item.source_type = source_type.map(str::to_string);
            item.uri = uri.map(str::to_string);
            item.added_at = age_days.map(|days| reference_now() - Duration::days(days));
            item
        })
}

fn reference_now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
}

proptest! {
    #[test]
    fn repair_never_invents_ids(
        claims in proptest::collection::vec(arb_claim(), 0..5),
        codes in proptest::collection::vec(arb_issue_code(), 0..4),
        known in 0usize..5,
        heading in "[A-Za-z ]{1,12}",
        policy in arb_citation_policy(),
    ) {
        let evidence = bundle_of(known);
        let draft = SectionDraft::new(render(&claims, &heading), claims);
        let issues: Vec<VerificationIssue> = codes
            .into_iter()
            .map(|code| VerificationIssue::new(code, "generated"))
            .collect();

        let repaired = repair_section(&draft, &issues, &evidence, policy);

        for id in citation_ids(&repaired.markdown) {
            prop_assert!(evidence.has(id), "invented marker {}", id);
        }
        for claim in &repaired.claims {
            for id in &claim.evidence_ids {
                prop_assert!(evidence.has(id), "invented claim id {}", id);
            }
        }
        prop_assert_eq!(repaired.claims.len(), draft.claims.len());
    }

    #[test]
    fn non_citation_repair_strips_all_ids(
        claims in proptest::collection::vec(arb_claim(), 0..5),
        known in 0usize..5,
        policy in prop_oneof![Just(CitationPolicy::LlmOnly), Just(CitationPolicy::SynthesisOnly)],
    ) {
        let evidence = bundle_of(known);
        let draft = SectionDraft::new(render(&claims, "Summary"), claims);

        let repaired = repair_section(&draft, &[], &evidence, policy);

        prop_assert!(repaired.claims.iter().all(|c| c.evidence_ids.is_empty()));
        prop_assert!(citation_ids(&repaired.markdown).is_empty());
    }

    #[test]
    fn evidence_policy_flags_each_claim_once(
        text in "[A-Za-z ]{1,20}",
        ids in proptest::collection::vec(proptest::sample::select(POOL.to_vec()), 1..4),
        policy in arb_citation_policy(),
    ) {
        let evidence = bundle_of(4);
        let claim = if policy.requires_citations() {
            Claim::new(text)
        } else {
            Claim::cited(text, ids)
        };
        let expected = if policy.requires_citations() {
            IssueCode::EvidenceMissing
        } else {
            IssueCode::UnexpectedEvidence
        };

        let issues = EvidencePolicyCheck::check(&[claim], policy, &evidence);

        prop_assert_eq!(issues.iter().filter(|i| i.code == expected).count(), 1);
    }

    #[test]
    fn scoring_is_pure_and_bounded(
        items in proptest::collection::vec(arb_item(), 0..8),
        requirements in proptest::collection::vec("[a-z]{1,5}", 0..4),
        target in 0usize..6,
    ) {
        let items = items
            .into_iter()
            .enumerate()
            .map(|(i, mut item)| {
                item.id = format!("item-{}", i);
                item
            })
            .collect();
        let section = SectionRun::new("s", "Section", EvidenceBundle::new(items).unwrap())
            .with_requirements(requirements)
            .with_target_evidence(target);
        let config = ScoringConfig::default();

        let first = score_section_at(&section, &config, reference_now());
        let second = score_section_at(&section, &config, reference_now());

        prop_assert_eq!(&first, &second);
        for value in [first.coverage, first.diversity, first.recency, first.redundancy] {
            prop_assert!((0.0..=1.0).contains(&value));
        }
        prop_assert_eq!(first.explanations.len(), 4);
    }
}
