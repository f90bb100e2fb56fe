//! Core diagnostic message types.

use hearth_yaml::SourceInfo;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    /// An error that prevents completion
    Error,
    /// A problem that doesn't prevent completion
    Warning,
    Info,
    Note,
}

impl DiagnosticKind {
    fn label(self) -> &'static str {
        match self {
            DiagnosticKind::Error => "Error",
            DiagnosticKind::Warning => "Warning",
            DiagnosticKind::Info => "Info",
            DiagnosticKind::Note => "Note",
        }
    }
}

/// How detail items are presented (tidyverse x/i bullet style).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailKind {
    /// ✖ bullet
    Error,
    /// ℹ bullet
    Info,
    /// plain bullet
    Note,
}

impl DetailKind {
    fn bullet(self) -> &'static str {
        match self {
            DetailKind::Error => "✖",
            DetailKind::Info => "ℹ",
            DetailKind::Note => "•",
        }
    }
}

/// The content of a message or detail item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageContent {
    Plain(String),
    Markdown(String),
}

impl MessageContent {
    pub fn as_str(&self) -> &str {
        match self {
            MessageContent::Plain(s) | MessageContent::Markdown(s) => s,
        }
    }

    /// Convert to JSON value with type information
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            MessageContent::Plain(s) => json!({ "type": "plain", "content": s }),
            MessageContent::Markdown(s) => json!({ "type": "markdown", "content": s }),
        }
    }
}

impl From<String> for MessageContent {
    fn from(s: String) -> Self {
        MessageContent::Markdown(s)
    }
}

impl From<&str> for MessageContent {
    fn from(s: &str) -> Self {
        MessageContent::Markdown(s.to_string())
    }
}

/// A bulleted detail of a diagnostic message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailItem {
    pub kind: DetailKind,
    pub content: MessageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceInfo>,
}

/// A diagnostic message following tidyverse-style structure.
///
/// 1. **Code**: optional error code (e.g., "H-3-3") for searchability
/// 2. **Title**: brief error message
/// 3. **Kind**: Error, Warning, Info
/// 4. **Problem**: what went wrong
/// 5. **Details**: specific information, bulleted
/// 6. **Hints**: optional guidance for fixing (ends with ?)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    pub title: String,

    pub kind: DiagnosticKind,

    pub problem: Option<MessageContent>,

    pub details: Vec<DetailItem>,

    pub hints: Vec<MessageContent>,

    /// Where in the configuration the issue occurred
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceInfo>,
}

impl DiagnosticMessage {
    pub fn new(kind: DiagnosticKind, title: impl Into<String>) -> Self {
        Self {
            code: None,
            title: title.into(),
            kind,
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

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Documentation URL for this diagnostic's error code, if any.
    pub fn docs_url(&self) -> Option<&str> {
        self.code
            .as_ref()
            .and_then(|code| crate::catalog::get_docs_url(code))
    }

    /// Render as tidyverse-style text.
    ///
    /// ```text
    /// Error [H-3-3]: title
    ///   --> configuration.yaml:4:3
    /// Problem statement here
    /// ✖ Error detail
    /// ℹ Info detail
    /// ? Hint
    /// ```
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Render as a JSON value.
    ///
    /// ```
    /// use hearth_error_reporting::DiagnosticMessage;
    ///
    /// let json = DiagnosticMessage::error("Something went wrong").to_json();
    /// assert_eq!(json["kind"], "error");
    /// assert_eq!(json["title"], "Something went wrong");
    /// ```
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;

        let mut obj = json!({
            "kind": self.kind,
            "title": self.title,
        });

        if let Some(code) = &self.code {
            obj["code"] = json!(code);
            if let Some(url) = self.docs_url() {
                obj["docs_url"] = json!(url);
            }
        }

        if let Some(problem) = &self.problem {
            obj["problem"] = problem.to_json();
        }

        if !self.details.is_empty() {
            let details: Vec<_> = self
                .details
                .iter()
                .map(|d| {
                    let mut detail_obj = json!({
                        "kind": d.kind,
                        "content": d.content.to_json()
                    });
                    if let Some(location) = &d.location {
                        detail_obj["location"] = json!(location);
                    }
                    detail_obj
                })
                .collect();
            obj["details"] = json!(details);
        }

        if !self.hints.is_empty() {
            let hints: Vec<_> = self.hints.iter().map(MessageContent::to_json).collect();
            obj["hints"] = json!(hints);
        }

        if let Some(location) = &self.location {
            obj["location"] = json!(location);
        }

        obj
    }
}

impl fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => writeln!(f, "{} [{}]: {}", self.kind.label(), code, self.title)?,
            None => writeln!(f, "{}: {}", self.kind.label(), self.title)?,
        }

        if let Some(location) = &self.location {
            match &location.file {
                Some(file) => writeln!(f, "  --> {}:{}:{}", file, location.line, location.col)?,
                None => writeln!(f, "  --> line {}:{}", location.line, location.col)?,
            }
        }

        if let Some(problem) = &self.problem {
            writeln!(f, "{}", problem.as_str())?;
        }

        for detail in &self.details {
            writeln!(f, "{} {}", detail.kind.bullet(), detail.content.as_str())?;
        }

        for hint in &self.hints {
            writeln!(f, "? {}", hint.as_str())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiagnosticMessageBuilder;

    #[test]
    fn test_to_text_layout() {
        let msg = DiagnosticMessageBuilder::error("Invalid config")
            .with_code("H-3-6")
            .problem("expected int for dictionary value 'port', got 'abc'")
            .add_info("Platform `sensor.template`")
            .add_hint("Use a number for `port`?")
            .with_location(SourceInfo::new(Some("configuration.yaml".into()), 0, 4, 3, 0))
            .build();

        assert_eq!(
            msg.to_text(),
            "Error [H-3-6]: Invalid config\n\
             \x20 --> configuration.yaml:4:3\n\
             expected int for dictionary value 'port', got 'abc'\n\
             ℹ Platform `sensor.template`\n\
             ? Use a number for `port`?\n"
        );
    }

    #[test]
    fn test_to_json_includes_docs_url() {
        let msg = DiagnosticMessage::error("Invalid config").with_code("H-3-3");
        let json = msg.to_json();
        assert_eq!(json["code"], "H-3-3");
        assert_eq!(json["docs_url"], "https://hearth.dev/docs/errors/H-3-3");
        assert!(json.get("location").is_none());
    }

    #[test]
    fn test_warning_kind_serializes_lowercase() {
        let msg = DiagnosticMessage::warning("Package contains invalid customize");
        assert_eq!(msg.to_json()["kind"], "warning");
    }
}
