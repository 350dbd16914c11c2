//! Contradiction and redundancy detection.
//!
//! Contradictions are literal, case-insensitive occurrences of the
//! blueprint's contradictory phrases. Redundancy works on sentence-like
//! segments obtained by splitting on `.`.

use std::collections::{HashMap, HashSet};

use crate::config::Blueprint;
use crate::types::{IssueCode, VerificationIssue};

use super::{Check, VerificationRequest};

pub struct ContradictionCheck;

impl ContradictionCheck {
    pub fn new() -> Self {
        Self
    }

    pub fn check(
        markdown: &str,
        blueprint: &Blueprint,
        prior_sections: &[String],
    ) -> Vec<VerificationIssue> {
        let mut issues = Vec::new();
        let lowered = markdown.to_lowercase();

        for phrase in blueprint.contradictory_phrases() {
            if lowered.contains(&phrase) {
                issues.push(VerificationIssue::new(
                    IssueCode::Contradiction,
                    format!("Detected contradiction with blueprint guidance: '{}'.", phrase),
                ));
            }
        }

        let sentences = split_sentences(markdown);

        // Every occurrence after the first is reported.
        let mut seen: HashMap<String, usize> = HashMap::new();
        for sentence in &sentences {
            let count = seen.entry(sentence.to_lowercase()).or_insert(0);
            *count += 1;
            if *count > 1 {
                issues.push(VerificationIssue::new(
                    IssueCode::RedundancyInternal,
                    format!("Sentence repeated: '{}'.", sentence),
                ));
            }
        }

        for prior in prior_sections {
            let prior_sentences: HashSet<String> = split_sentences(prior)
                .into_iter()
                .map(|s| s.to_lowercase())
                .collect();

            let mut reported = HashSet::new();
            for sentence in &sentences {
                let lowered = sentence.to_lowercase();
                if prior_sentences.contains(&lowered) && reported.insert(lowered.clone()) {
                    issues.push(VerificationIssue::new(
                        IssueCode::RedundancyPrior,
                        format!("Sentence duplicates prior section: '{}'.", lowered),
                    ));
                }
            }
        }

        issues
    }
}

fn split_sentences(text: &str) -> Vec<&str> {
    text.split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

impl Default for ContradictionCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl Check for ContradictionCheck {
    fn name(&self) -> &'static str {
        "contradictions"
    }

    fn run(&self, request: &VerificationRequest<'_>) -> Vec<VerificationIssue> {
        Self::check(request.markdown, request.blueprint, request.prior_sections)
    }
}
