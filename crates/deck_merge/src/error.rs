//! Error types for template merge operations

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single structural problem found while compiling a template part.
///
/// The `id` is a stable machine-readable code so callers can point at the
/// offending tag; `message` is meant for humans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateIssue {
    pub id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part: Option<String>,
}

impl TemplateIssue {
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self { id: id.into(), message: message.into(), part: None }
    }

    /// Attach the container part the issue was found in
    pub fn in_part(mut self, part: impl Into<String>) -> Self {
        self.part = Some(part.into());
        self
    }
}

/// Errors that can occur while merging data into a template
#[derive(Debug, Error)]
pub enum MergeError {
    /// Unbalanced or mismatched loop tags
    #[error("Template syntax error: {}", summarize(.0))]
    TemplateSyntax(Vec<TemplateIssue>),

    /// Strict mode lookup miss
    #[error("Unknown tag: {name}")]
    UnknownTag { name: String },

    /// Field catalog definition could not be read
    #[error("Invalid field catalog: {0}")]
    InvalidCatalog(#[from] serde_json::Error),
}

impl MergeError {
    /// Structured details suitable for an API error body
    pub fn issues(&self) -> Vec<TemplateIssue> {
        match self {
            MergeError::TemplateSyntax(issues) => issues.clone(),
            MergeError::UnknownTag { name } => vec![TemplateIssue::new(
                "unknown_tag",
                format!("No data found for tag \"{}\"", name),
            )],
            MergeError::InvalidCatalog(_) => Vec::new(),
        }
    }

    /// Tag every issue with the part it came from
    pub fn in_part(self, part: &str) -> Self {
        match self {
            MergeError::TemplateSyntax(issues) => MergeError::TemplateSyntax(
                issues.into_iter().map(|i| i.in_part(part)).collect(),
            ),
            other => other,
        }
    }
}

fn summarize(issues: &[TemplateIssue]) -> String {
    match issues {
        [] => "no details".to_string(),
        [only] => only.message.clone(),
        [first, rest @ ..] => format!("{} (and {} more)", first.message, rest.len()),
    }
}

/// Result type for merge operations
pub type Result<T> = std::result::Result<T, MergeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MergeError::TemplateSyntax(vec![
            TemplateIssue::new("unclosed_tag", "Unclosed loop \"a\""),
            TemplateIssue::new("unopened_tag", "Unopened loop \"b\""),
        ]);
        assert_eq!(
            err.to_string(),
            "Template syntax error: Unclosed loop \"a\" (and 1 more)"
        );

        let err = MergeError::UnknownTag { name: "serial".into() };
        assert_eq!(err.to_string(), "Unknown tag: serial");
    }

    #[test]
    fn test_issues_tagged_with_part() {
        let err = MergeError::TemplateSyntax(vec![TemplateIssue::new("unclosed_tag", "x")])
            .in_part("ppt/slides/slide1.xml");
        let issues = err.issues();
        assert_eq!(issues[0].part.as_deref(), Some("ppt/slides/slide1.xml"));
    }

    #[test]
    fn test_unknown_tag_issue() {
        let issues = MergeError::UnknownTag { name: "x".into() }.issues();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "unknown_tag");
    }
}
