// Error types for schema parsing and validation

use hearth_config::ConfigPath;
use hearth_yaml::SourceInfo;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur while building a schema from YAML.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Invalid schema type: {0}")]
    InvalidType(String),

    #[error("Invalid schema structure: {message} ({location})")]
    InvalidStructure { message: String, location: SourceInfo },

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] hearth_yaml::Error),
}

/// Result type for schema parsing operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// The shape of a single validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ValidationErrorKind {
    /// Key not allowed by a closed mapping
    ExtraKey,

    /// Required key absent from the mapping
    MissingRequiredKey,

    /// Value has the wrong type
    TypeMismatch { expected: String },

    /// Value has the right type but is not acceptable
    InvalidValue { message: String },
}

/// One structured validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,

    /// Path to the offending node, relative to the validated value
    pub path: ConfigPath,

    /// What the offending node is to its parent (e.g. "dictionary value")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, path: ConfigPath) -> Self {
        Self {
            kind,
            path,
            error_type: None,
        }
    }

    /// A free-form failure at the root of the validated value.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(
            ValidationErrorKind::InvalidValue {
                message: message.into(),
            },
            ConfigPath::new(),
        )
    }

    pub fn with_error_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    pub fn at(mut self, path: ConfigPath) -> Self {
        self.path = path;
        self
    }

    /// The bare message, without path or error type.
    pub fn message(&self) -> String {
        match &self.kind {
            ValidationErrorKind::ExtraKey => "extra keys not allowed".to_string(),
            ValidationErrorKind::MissingRequiredKey => "required key not provided".to_string(),
            ValidationErrorKind::TypeMismatch { expected } => format!("expected {}", expected),
            ValidationErrorKind::InvalidValue { message } => message.clone(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())?;
        if let Some(error_type) = &self.error_type {
            write!(f, " for {}", error_type)?;
        }
        if !self.path.is_empty() {
            write!(f, " @ {}", self.path)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// One or more validation failures for a single value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invalid {
    pub errors: Vec<ValidationError>,
}

impl Invalid {
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    pub fn single(error: ValidationError) -> Self {
        Self { errors: vec![error] }
    }

    /// Re-root every error path under `prefix`.
    pub fn prefixed(mut self, prefix: &ConfigPath) -> Self {
        for error in &mut self.errors {
            error.path = error.path.prefixed(prefix);
        }
        self
    }
}

impl fmt::Display for Invalid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for Invalid {}

impl From<ValidationError> for Invalid {
    fn from(error: ValidationError) -> Self {
        Invalid::single(error)
    }
}

/// Outcome of running a schema that did not accept its input.
///
/// `Invalid` is the structured kind the reporter knows how to annotate.
/// `Unexpected` covers anything else a schema or hand-written validator can
/// fail with.
#[derive(Debug, Error)]
pub enum SchemaFailure {
    #[error(transparent)]
    Invalid(#[from] Invalid),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let path = ConfigPath::from_keys(["sensor", "port"]);
        let err = ValidationError::new(
            ValidationErrorKind::TypeMismatch {
                expected: "int".into(),
            },
            path,
        )
        .with_error_type("dictionary value");
        assert_eq!(err.message(), "expected int");
        assert_eq!(err.to_string(), "expected int for dictionary value @ sensor->port");
    }

    #[test]
    fn test_prefixed() {
        let invalid = Invalid::single(ValidationError::new(
            ValidationErrorKind::ExtraKey,
            ConfigPath::from_keys(["pool"]),
        ))
        .prefixed(&ConfigPath::from_keys(["core", "packages"]));
        assert_eq!(invalid.errors[0].path.to_string(), "core->packages->pool");
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_value(ValidationErrorKind::MissingRequiredKey).unwrap();
        assert_eq!(json["type"], "MissingRequiredKey");
    }
}
