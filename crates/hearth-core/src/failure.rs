//! Failures collected while validating a domain.

use crate::integration::{LoadError, ValidatorError};
use hearth_config::ConfigValue;
use hearth_schema::{Invalid, SchemaFailure};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Closed taxonomy of domain validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    ComponentImportErr,
    ConfigPlatformImportErr,
    ConfigValidationErr,
    ConfigValidatorUnknownErr,
    ConfigSchemaUnknownErr,
    PlatformConfigValidationErr,
    PlatformValidatorUnknownErr,
    PlatformComponentLoadErr,
    PlatformComponentLoadExc,
    PlatformSchemaValidatorErr,

    /// Two or more failures for one domain, bundled when raised
    IntegrationConfigError,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 11] = [
        ErrorCategory::ComponentImportErr,
        ErrorCategory::ConfigPlatformImportErr,
        ErrorCategory::ConfigValidationErr,
        ErrorCategory::ConfigValidatorUnknownErr,
        ErrorCategory::ConfigSchemaUnknownErr,
        ErrorCategory::PlatformConfigValidationErr,
        ErrorCategory::PlatformValidatorUnknownErr,
        ErrorCategory::PlatformComponentLoadErr,
        ErrorCategory::PlatformComponentLoadExc,
        ErrorCategory::PlatformSchemaValidatorErr,
        ErrorCategory::IntegrationConfigError,
    ];

    /// Stable identifier, also used as translation key.
    pub fn key(self) -> &'static str {
        match self {
            ErrorCategory::ComponentImportErr => "component_import_err",
            ErrorCategory::ConfigPlatformImportErr => "config_platform_import_err",
            ErrorCategory::ConfigValidationErr => "config_validation_err",
            ErrorCategory::ConfigValidatorUnknownErr => "config_validator_unknown_err",
            ErrorCategory::ConfigSchemaUnknownErr => "config_schema_unknown_err",
            ErrorCategory::PlatformConfigValidationErr => "platform_config_validation_err",
            ErrorCategory::PlatformValidatorUnknownErr => "platform_validator_unknown_err",
            ErrorCategory::PlatformComponentLoadErr => "platform_component_load_err",
            ErrorCategory::PlatformComponentLoadExc => "platform_component_load_exc",
            ErrorCategory::PlatformSchemaValidatorErr => "platform_schema_validator_err",
            ErrorCategory::IntegrationConfigError => "integration_config_error",
        }
    }

    /// Catalog code of this category.
    pub fn code(self) -> &'static str {
        match self {
            ErrorCategory::ComponentImportErr => "H-3-1",
            ErrorCategory::ConfigPlatformImportErr => "H-3-2",
            ErrorCategory::ConfigValidationErr => "H-3-3",
            ErrorCategory::ConfigValidatorUnknownErr => "H-3-4",
            ErrorCategory::ConfigSchemaUnknownErr => "H-3-5",
            ErrorCategory::PlatformConfigValidationErr => "H-3-6",
            ErrorCategory::PlatformValidatorUnknownErr => "H-3-7",
            ErrorCategory::PlatformComponentLoadErr => "H-3-8",
            ErrorCategory::PlatformComponentLoadExc => "H-3-9",
            ErrorCategory::PlatformSchemaValidatorErr => "H-3-10",
            ErrorCategory::IntegrationConfigError => "H-3-11",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// What went wrong.
#[derive(Debug, Clone, Error)]
pub enum FailureCause {
    /// Structured validation failure with paths
    #[error(transparent)]
    Invalid(Invalid),

    /// A validator rejected the configuration without a path
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Load(LoadError),

    /// Anything else a schema or validator raised
    #[error("{0}")]
    Unexpected(Arc<anyhow::Error>),
}

impl FailureCause {
    pub fn unexpected(err: anyhow::Error) -> Self {
        FailureCause::Unexpected(Arc::new(err))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, FailureCause::Invalid(_))
    }
}

impl From<ValidatorError> for FailureCause {
    fn from(err: ValidatorError) -> Self {
        match err {
            ValidatorError::Invalid(invalid) => FailureCause::Invalid(invalid),
            ValidatorError::Rejected(message) => FailureCause::Rejected(message),
            ValidatorError::Unexpected(err) => FailureCause::unexpected(err),
        }
    }
}

impl From<SchemaFailure> for FailureCause {
    fn from(err: SchemaFailure) -> Self {
        match err {
            SchemaFailure::Invalid(invalid) => FailureCause::Invalid(invalid),
            SchemaFailure::Unexpected(err) => FailureCause::unexpected(err),
        }
    }
}

impl From<LoadError> for FailureCause {
    fn from(err: LoadError) -> Self {
        FailureCause::Load(err)
    }
}

/// One failure of a domain or of one of its platform entries.
#[derive(Debug, Clone)]
pub struct ConfigFailure {
    pub cause: FailureCause,
    pub category: ErrorCategory,
    pub domain: String,

    /// Platform the failing entry names, for per-entry failures
    pub platform: Option<String>,

    /// The configuration that failed: the whole document for domain-level
    /// failures, the entry for per-entry failures
    pub config: ConfigValue,

    pub integration_link: Option<String>,
}

impl ConfigFailure {
    pub fn new(
        cause: impl Into<FailureCause>,
        category: ErrorCategory,
        domain: impl Into<String>,
        config: ConfigValue,
    ) -> Self {
        Self {
            cause: cause.into(),
            category,
            domain: domain.into(),
            platform: None,
            config,
            integration_link: None,
        }
    }

    pub fn with_platform(mut self, platform: Option<String>) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_link(mut self, link: Option<String>) -> Self {
        self.integration_link = link;
        self
    }

    /// Name messages are reported under: `domain.platform` for per-entry
    /// failures, the domain otherwise.
    pub fn subject(&self) -> String {
        match &self.platform {
            Some(platform) => format!("{}.{}", self.domain, platform),
            None => self.domain.clone(),
        }
    }
}

/// Result of validating one domain.
#[derive(Debug, Clone, Default)]
pub struct IntegrationConfigInfo {
    /// Validated document, or `None` when the domain failed as a whole
    pub config: Option<ConfigValue>,
    pub failures: Vec<ConfigFailure>,
}

impl IntegrationConfigInfo {
    pub fn ok(config: ConfigValue) -> Self {
        Self {
            config: Some(config),
            failures: Vec::new(),
        }
    }

    pub fn failed(failure: ConfigFailure) -> Self {
        Self {
            config: None,
            failures: vec![failure],
        }
    }
}
