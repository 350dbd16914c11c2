//! Formatting gates: minimum length and required headings.

use crate::config::FormattingRequirements;
use crate::types::{IssueCode, VerificationIssue};

use super::{Check, VerificationRequest};

pub struct FormattingCheck;

impl FormattingCheck {
    pub fn new() -> Self {
        Self
    }

    pub fn check(markdown: &str, requirements: &FormattingRequirements) -> Vec<VerificationIssue> {
        let mut issues = Vec::new();

        let word_count = markdown.split_whitespace().count();
        if word_count < requirements.min_words {
            issues.push(VerificationIssue::new(
                IssueCode::TooShort,
                format!(
                    "Section has {} words; expected at least {}.",
                    word_count, requirements.min_words
                ),
            ));
        }

        for heading in &requirements.required_headings {
            if !markdown.contains(&format!("# {}", heading)) {
                issues.push(VerificationIssue::new(
                    IssueCode::MissingHeading,
                    format!("Missing required heading '{}'.", heading),
                ));
            }
        }

        issues
    }
}

impl Default for FormattingCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl Check for FormattingCheck {
    fn name(&self) -> &'static str {
        "formatting"
    }

    fn run(&self, request: &VerificationRequest<'_>) -> Vec<VerificationIssue> {
        Self::check(request.markdown, request.formatting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_short() {
        let requirements = FormattingRequirements {
            required_headings: vec![],
            min_words: 5,
        };
        let issues = FormattingCheck::check("only three words", &requirements);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::TooShort);
        assert!(issues[0].message.contains("3 words"));
    }

    #[test]
    fn test_missing_heading() {
        let requirements = FormattingRequirements {
            required_headings: vec!["Summary".to_string(), "Risks".to_string()],
            min_words: 0,
        };
        let issues = FormattingCheck::check("## Summary\ntext", &requirements);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::MissingHeading);
        assert!(issues[0].message.contains("Risks"));
    }

    #[test]
    fn test_no_gates() {
        assert!(FormattingCheck::check("", &FormattingRequirements::none()).is_empty());
    }
}
