//! In-memory integration loader.
//!
//! Integrations are registered in code or read from a YAML manifest:
//!
//! ```yaml
//! hue:
//!   documentation: https://hearth.dev/integrations/hue
//!   missing_requirements: []
//!   config_schema:
//!     object:
//!       closed: false
//!       properties:
//!         hue: {object: {properties: {bridges: {arrayOf: string}}}}
//!   platforms:
//!     light:
//!       schema:
//!         object: {closed: false, properties: {allow_unreachable: boolean}}
//! light:
//!   platform_schema:
//!     object: {closed: false, properties: {platform: string}}
//! ```

use super::{
    Component, ConfigPlatform, ConfigValidator, Integration, IntegrationLoader, LoadError,
    Platform, ValidatorError,
};
use async_trait::async_trait;
use hearth_config::{ConfigValue, MergePolicy};
use hearth_schema::{ConfigSchema, Schema, SchemaError, SchemaFailure};
use hearth_yaml::{SourceInfo, YamlWithSourceInfo};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Runs a schema as a config platform's custom validator.
pub struct SchemaValidator(pub Arc<dyn ConfigSchema>);

#[async_trait]
impl ConfigValidator for SchemaValidator {
    async fn validate_config(&self, config: &ConfigValue) -> Result<ConfigValue, ValidatorError> {
        self.0.validate(config).map_err(|err| match err {
            SchemaFailure::Invalid(invalid) => ValidatorError::Invalid(invalid),
            SchemaFailure::Unexpected(err) => ValidatorError::Unexpected(err),
        })
    }
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Yaml(#[from] hearth_yaml::Error),

    #[error("Invalid schema for integration '{domain}': {source}")]
    Schema {
        domain: String,
        #[source]
        source: SchemaError,
    },

    #[error("Invalid manifest: {message} ({location})")]
    Structure { message: String, location: SourceInfo },
}

#[derive(Debug, Default, Clone)]
pub struct IntegrationRegistry {
    integrations: HashMap<String, Arc<Integration>>,
    missing_requirements: HashMap<String, Vec<String>>,
}

impl IntegrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, integration: Integration) {
        self.integrations
            .insert(integration.domain.clone(), Arc::new(integration));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, integration: Integration) -> Self {
        self.register(integration);
        self
    }

    /// Make resolving `domain` fail as if its requirements were not installed.
    pub fn with_missing_requirements(
        mut self,
        domain: impl Into<String>,
        requirements: Vec<String>,
    ) -> Self {
        self.missing_requirements.insert(domain.into(), requirements);
        self
    }

    pub fn len(&self) -> usize {
        self.integrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.integrations.is_empty()
    }

    pub fn load_manifest(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let yaml = hearth_yaml::parse_file(&content, &name)?;
        Self::from_manifest(&yaml)
    }

    pub fn from_manifest(yaml: &YamlWithSourceInfo) -> Result<Self, ManifestError> {
        let mut registry = Self::new();
        if yaml.is_null() {
            return Ok(registry);
        }
        let entries = yaml.as_hash().ok_or_else(|| structure_error("expected a mapping of integrations", yaml))?;

        for entry in entries {
            let domain = entry
                .key
                .as_str()
                .ok_or_else(|| structure_error("integration names must be strings", &entry.key))?
                .to_string();
            let (integration, missing) = parse_integration(&domain, &entry.value)?;
            if !missing.is_empty() {
                registry.missing_requirements.insert(domain, missing);
            }
            registry.register(integration);
        }
        Ok(registry)
    }
}

#[async_trait]
impl IntegrationLoader for IntegrationRegistry {
    async fn resolve(&self, domain: &str) -> Result<Arc<Integration>, LoadError> {
        let integration = self
            .integrations
            .get(domain)
            .ok_or_else(|| LoadError::NotFound(domain.to_string()))?;
        if let Some(requirements) = self.missing_requirements.get(domain) {
            return Err(LoadError::RequirementsNotFound {
                domain: domain.to_string(),
                requirements: requirements.clone(),
            });
        }
        Ok(Arc::clone(integration))
    }
}

fn structure_error(message: &str, yaml: &YamlWithSourceInfo) -> ManifestError {
    ManifestError::Structure {
        message: message.to_string(),
        location: yaml.source_info.clone(),
    }
}

fn parse_integration(
    domain: &str,
    yaml: &YamlWithSourceInfo,
) -> Result<(Integration, Vec<String>), ManifestError> {
    let mut integration = Integration::new(domain);
    if yaml.is_null() {
        return Ok((integration, Vec::new()));
    }
    if !yaml.is_hash() {
        return Err(structure_error("integration entries must be mappings", yaml));
    }

    if let Some(link) = yaml.get_hash_value("documentation") {
        let link = link
            .as_str()
            .ok_or_else(|| structure_error("documentation must be a string", link))?;
        integration = integration.with_documentation(link);
    }

    let component = Component {
        config_schema: parse_schema(domain, yaml.get_hash_value("config_schema"))?,
        platform_schema: parse_schema(domain, yaml.get_hash_value("platform_schema"))?,
        merge_hint: parse_merge_hint(yaml.get_hash_value("merge_hint"))?,
    };
    integration = match import_error(yaml)? {
        Some(message) => integration.with_component_error(LoadError::Import(message)),
        None => integration.with_component(component),
    };

    if let Some(config_platform) = yaml.get_hash_value("config_platform") {
        integration = match import_error(config_platform)? {
            Some(message) => integration.with_config_platform_error(LoadError::Import(message)),
            None => integration.with_config_platform(ConfigPlatform {
                validator: parse_schema(domain, config_platform.get_hash_value("schema"))?
                    .map(|schema| Arc::new(SchemaValidator(schema)) as Arc<dyn ConfigValidator>),
                merge_hint: parse_merge_hint(config_platform.get_hash_value("merge_hint"))?,
            }),
        };
    }

    if let Some(platforms) = yaml.get_hash_value("platforms") {
        let entries = platforms
            .as_hash()
            .ok_or_else(|| structure_error("platforms must be a mapping", platforms))?;
        for entry in entries {
            let target = entry
                .key
                .as_str()
                .ok_or_else(|| structure_error("platform names must be strings", &entry.key))?;
            integration = match import_error(&entry.value)? {
                Some(message) => integration.with_platform_error(target, LoadError::Import(message)),
                None => {
                    let schema = if entry.value.is_null() {
                        None
                    } else {
                        parse_schema(domain, entry.value.get_hash_value("schema"))?
                    };
                    integration.with_platform(target, Platform { schema })
                }
            };
        }
    }

    let missing = match yaml.get_hash_value("missing_requirements") {
        Some(items) => items
            .as_array()
            .ok_or_else(|| structure_error("missing_requirements must be a list", items))?
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| structure_error("requirements must be strings", item))
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    Ok((integration, missing))
}

fn parse_schema(
    domain: &str,
    yaml: Option<&YamlWithSourceInfo>,
) -> Result<Option<Arc<dyn ConfigSchema>>, ManifestError> {
    let Some(yaml) = yaml else {
        return Ok(None);
    };
    let schema = Schema::from_yaml(yaml).map_err(|source| ManifestError::Schema {
        domain: domain.to_string(),
        source,
    })?;
    Ok(Some(Arc::new(schema)))
}

fn parse_merge_hint(yaml: Option<&YamlWithSourceInfo>) -> Result<Option<MergePolicy>, ManifestError> {
    let Some(yaml) = yaml else {
        return Ok(None);
    };
    match yaml.as_str() {
        Some("dict") => Ok(Some(MergePolicy::Dict)),
        Some("list") => Ok(Some(MergePolicy::List)),
        _ => Err(structure_error("merge_hint must be 'dict' or 'list'", yaml)),
    }
}

fn import_error(yaml: &YamlWithSourceInfo) -> Result<Option<String>, ManifestError> {
    match yaml.get_hash_value("import_error") {
        Some(message) => message
            .as_str()
            .map(|m| Some(m.to_string()))
            .ok_or_else(|| structure_error("import_error must be a string", message)),
        None => Ok(None),
    }
}
