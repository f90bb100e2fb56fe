//! Builder API for diagnostic messages.

use crate::diagnostic::{DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent};
use hearth_yaml::SourceInfo;

/// Builder for diagnostic messages following tidyverse guidelines.
///
/// ```
/// use hearth_error_reporting::DiagnosticMessageBuilder;
///
/// let error = DiagnosticMessageBuilder::error("Package merge failed")
///     .with_code("H-2-1")
///     .problem("integration 'sensor' has duplicate key 'threshold'")
///     .add_detail("Package `pool` sets `threshold` again")
///     .add_hint("Remove one of the two definitions?")
///     .build();
///
/// assert_eq!(error.code.as_deref(), Some("H-2-1"));
/// assert_eq!(error.details.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct DiagnosticMessageBuilder {
    kind: DiagnosticKind,
    title: String,
    code: Option<String>,
    problem: Option<MessageContent>,
    details: Vec<DetailItem>,
    hints: Vec<MessageContent>,
    location: Option<SourceInfo>,
}

impl DiagnosticMessageBuilder {
    pub fn new(kind: DiagnosticKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            code: None,
            problem: None,
            details: Vec::new(),
            hints: Vec::new(),
            location: None,
        }
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Error, title)
    }

    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Warning, title)
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Info, title)
    }

    /// Set the error code (`H-<subsystem>-<number>`).
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Set the problem statement: what went wrong, in one sentence.
    pub fn problem(mut self, problem: impl Into<MessageContent>) -> Self {
        self.problem = Some(problem.into());
        self
    }

    /// Add an error detail (✖ bullet).
    pub fn add_detail(self, detail: impl Into<MessageContent>) -> Self {
        self.push_detail(DetailKind::Error, detail.into(), None)
    }

    /// Add an error detail pointing at a specific location.
    pub fn add_detail_at(self, detail: impl Into<MessageContent>, location: SourceInfo) -> Self {
        self.push_detail(DetailKind::Error, detail.into(), Some(location))
    }

    /// Add an info detail (ℹ bullet).
    pub fn add_info(self, info: impl Into<MessageContent>) -> Self {
        self.push_detail(DetailKind::Info, info.into(), None)
    }

    /// Add a note detail (plain bullet).
    pub fn add_note(self, note: impl Into<MessageContent>) -> Self {
        self.push_detail(DetailKind::Note, note.into(), None)
    }

    /// Add a hint. Hints are phrased as questions.
    pub fn add_hint(mut self, hint: impl Into<MessageContent>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn with_location(mut self, location: SourceInfo) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_optional_location(mut self, location: Option<SourceInfo>) -> Self {
        self.location = location;
        self
    }

    pub fn build(self) -> DiagnosticMessage {
        DiagnosticMessage {
            code: self.code,
            title: self.title,
            kind: self.kind,
            problem: self.problem,
            details: self.details,
            hints: self.hints,
            location: self.location,
        }
    }

    fn push_detail(mut self, kind: DetailKind, content: MessageContent, location: Option<SourceInfo>) -> Self {
        self.details.push(DetailItem {
            kind,
            content,
            location,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_detail_kinds() {
        let msg = DiagnosticMessageBuilder::warning("Invalid customize")
            .add_detail("bad")
            .add_info("context")
            .add_note("aside")
            .build();
        let kinds: Vec<_> = msg.details.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DetailKind::Error, DetailKind::Info, DetailKind::Note]);
        assert_eq!(msg.kind, DiagnosticKind::Warning);
    }

    #[test]
    fn test_detail_location() {
        let at = SourceInfo::new(Some("configuration.yaml".into()), 0, 9, 1, 0);
        let msg = DiagnosticMessageBuilder::error("Duplicate key")
            .add_detail_at("first set here", at.clone())
            .build();
        assert_eq!(msg.details[0].location, Some(at));
        assert!(msg.location.is_none());
    }
}
