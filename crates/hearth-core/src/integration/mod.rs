//! What the loader collaborator hands back for a domain.
//!
//! An [`Integration`] bundles the capabilities a domain may declare. Each
//! one is optional and typed; the validator dispatches on which are present
//! rather than probing modules at runtime:
//!
//! - a component (always present unless it fails to load), carrying an
//!   optional whole-document schema, an optional platform-entry schema and an
//!   optional merge hint;
//! - a companion config platform with a custom [`ConfigValidator`];
//! - platforms it provides for other domains, each with an optional schema.

mod registry;

pub use registry::{IntegrationRegistry, ManifestError, SchemaValidator};

use async_trait::async_trait;
use hearth_config::{ConfigValue, MergePolicy};
use hearth_schema::{ConfigSchema, Invalid};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure to resolve or load a piece of an integration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("Integration '{0}' not found.")]
    NotFound(String),

    #[error("Requirements for {domain} not found: {}.", format_requirements(.requirements))]
    RequirementsNotFound {
        domain: String,
        requirements: Vec<String>,
    },

    /// The code exists but could not be loaded.
    #[error("{0}")]
    Import(String),
}

impl LoadError {
    /// Not-found and missing-requirement failures have their own
    /// categories and messages; import failures do not.
    pub fn is_integration_error(&self) -> bool {
        matches!(
            self,
            LoadError::NotFound(_) | LoadError::RequirementsNotFound { .. }
        )
    }
}

fn format_requirements(requirements: &[String]) -> String {
    let quoted: Vec<String> = requirements.iter().map(|r| format!("'{}'", r)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Failure reported by a custom config validator.
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// Structured validation failure with paths into the document
    #[error(transparent)]
    Invalid(#[from] Invalid),

    /// The validator rejected the configuration with a plain message
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// Custom validation entry point of a domain's config platform.
///
/// Receives the whole document and returns the whole validated document.
/// May suspend, e.g. to read files the configuration refers to.
#[async_trait]
pub trait ConfigValidator: Send + Sync {
    async fn validate_config(&self, config: &ConfigValue) -> Result<ConfigValue, ValidatorError>;
}

/// Resolves domain names to integrations.
#[async_trait]
pub trait IntegrationLoader: Send + Sync {
    /// Resolve `domain`, installing nothing. Missing requirements are
    /// reported as [`LoadError::RequirementsNotFound`].
    async fn resolve(&self, domain: &str) -> Result<Arc<Integration>, LoadError>;
}

/// A domain's main code.
#[derive(Clone, Default)]
pub struct Component {
    /// Validates the whole document
    pub config_schema: Option<Arc<dyn ConfigSchema>>,

    /// Validates each platform entry addressed to the domain
    pub platform_schema: Option<Arc<dyn ConfigSchema>>,

    /// Declared accumulation policy across packages
    pub merge_hint: Option<MergePolicy>,
}

impl Component {
    pub fn with_config_schema(mut self, schema: Arc<dyn ConfigSchema>) -> Self {
        self.config_schema = Some(schema);
        self
    }

    pub fn with_platform_schema(mut self, schema: Arc<dyn ConfigSchema>) -> Self {
        self.platform_schema = Some(schema);
        self
    }

    pub fn with_merge_hint(mut self, hint: MergePolicy) -> Self {
        self.merge_hint = Some(hint);
        self
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("config_schema", &self.config_schema.is_some())
            .field("platform_schema", &self.platform_schema.is_some())
            .field("merge_hint", &self.merge_hint)
            .finish()
    }
}

/// Companion module holding a custom validator.
#[derive(Clone, Default)]
pub struct ConfigPlatform {
    pub validator: Option<Arc<dyn ConfigValidator>>,

    /// Accumulation policy for package merging. Required in practice when a
    /// validator is present, since the validator hides the schema's shape.
    pub merge_hint: Option<MergePolicy>,
}

impl fmt::Debug for ConfigPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigPlatform")
            .field("validator", &self.validator.is_some())
            .field("merge_hint", &self.merge_hint)
            .finish()
    }
}

/// Code an integration provides for another domain, e.g. the `hue`
/// platform of `light`.
#[derive(Clone, Default)]
pub struct Platform {
    pub schema: Option<Arc<dyn ConfigSchema>>,
}

impl fmt::Debug for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Platform")
            .field("schema", &self.schema.is_some())
            .finish()
    }
}

/// A resolved domain.
#[derive(Debug, Clone)]
pub struct Integration {
    pub domain: String,
    pub documentation: Option<String>,
    component: Result<Component, LoadError>,
    config_platform: Result<Option<ConfigPlatform>, LoadError>,
    platforms: HashMap<String, Result<Platform, LoadError>>,
}

impl Integration {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            documentation: None,
            component: Ok(Component::default()),
            config_platform: Ok(None),
            platforms: HashMap::new(),
        }
    }

    pub fn with_documentation(mut self, link: impl Into<String>) -> Self {
        self.documentation = Some(link.into());
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.component = Ok(component);
        self
    }

    /// Make loading the component fail.
    pub fn with_component_error(mut self, error: LoadError) -> Self {
        self.component = Err(error);
        self
    }

    pub fn with_config_platform(mut self, platform: ConfigPlatform) -> Self {
        self.config_platform = Ok(Some(platform));
        self
    }

    /// The config platform exists but fails to load.
    pub fn with_config_platform_error(mut self, error: LoadError) -> Self {
        self.config_platform = Err(error);
        self
    }

    /// Provide a platform for `domain`.
    pub fn with_platform(mut self, domain: impl Into<String>, platform: Platform) -> Self {
        self.platforms.insert(domain.into(), Ok(platform));
        self
    }

    pub fn with_platform_error(mut self, domain: impl Into<String>, error: LoadError) -> Self {
        self.platforms.insert(domain.into(), Err(error));
        self
    }

    pub fn component(&self) -> Result<&Component, LoadError> {
        self.component.as_ref().map_err(Clone::clone)
    }

    /// The companion config platform. `Ok(None)` when there is none.
    pub fn config_platform(&self) -> Result<Option<&ConfigPlatform>, LoadError> {
        match &self.config_platform {
            Ok(platform) => Ok(platform.as_ref()),
            Err(err) => Err(err.clone()),
        }
    }

    /// The platform this integration provides for `domain`.
    pub fn platform(&self, domain: &str) -> Result<&Platform, LoadError> {
        match self.platforms.get(domain) {
            Some(Ok(platform)) => Ok(platform),
            Some(Err(err)) => Err(err.clone()),
            None => Err(LoadError::Import(format!(
                "Platform {}.{} not found",
                self.domain, domain
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_error_messages() {
        assert_eq!(
            LoadError::NotFound("hue".into()).to_string(),
            "Integration 'hue' not found."
        );
        let err = LoadError::RequirementsNotFound {
            domain: "hue".into(),
            requirements: vec!["aiohue==4.7".into()],
        };
        assert_eq!(err.to_string(), "Requirements for hue not found: ['aiohue==4.7'].");
        assert!(err.is_integration_error());
        assert!(!LoadError::Import("boom".into()).is_integration_error());
    }

    #[test]
    fn test_missing_platform() {
        let integration = Integration::new("hue").with_platform("light", Platform::default());
        assert!(integration.platform("light").is_ok());
        assert_eq!(
            integration.platform("sensor").unwrap_err().to_string(),
            "Platform hue.sensor not found"
        );
    }
}
