//! Loading the configuration document from disk.
//!
//! The primary file is parsed with source tracking, local tags are resolved
//! (`!secret`, `!env_var`, `!include`) and falsy top-level values are
//! replaced with empty mappings. File names in annotations and errors are
//! relative to the configuration directory.

use crate::consts::{MAX_INCLUDE_DEPTH, SAFE_MODE_FILENAME, SECRETS_FILE, YAML_CONFIG_FILE};
use crate::report::catalog_title;
use hearth_config::{ConfigValue, ConfigValueKind, config_value_from_yaml};
use hearth_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder};
use hearth_yaml::SourceInfo;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Unable to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Yaml(#[from] hearth_yaml::Error),

    #[error("The configuration file {file} does not contain a dictionary")]
    NotADictionary {
        file: String,
        location: Option<SourceInfo>,
    },

    #[error("Secret {name} not defined")]
    SecretNotDefined {
        name: String,
        location: Option<SourceInfo>,
    },

    #[error("Environment variable {name} not defined")]
    EnvVarNotDefined {
        name: String,
        location: Option<SourceInfo>,
    },

    #[error("Unable to include {file}: {message}")]
    Include {
        file: String,
        message: String,
        location: Option<SourceInfo>,
    },

    #[error("Unknown tag !{tag}")]
    UnknownTag {
        tag: String,
        location: Option<SourceInfo>,
    },
}

impl DocumentError {
    pub fn location(&self) -> Option<&SourceInfo> {
        match self {
            DocumentError::Io { .. } => None,
            DocumentError::Yaml(err) => err.location(),
            DocumentError::NotADictionary { location, .. }
            | DocumentError::SecretNotDefined { location, .. }
            | DocumentError::EnvVarNotDefined { location, .. }
            | DocumentError::Include { location, .. }
            | DocumentError::UnknownTag { location, .. } => location.as_ref(),
        }
    }

    /// Catalog code for this error, if it has one.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            DocumentError::Io { .. } => None,
            DocumentError::Yaml(_) => Some("H-1-1"),
            DocumentError::NotADictionary { .. } => Some("H-1-2"),
            DocumentError::SecretNotDefined { .. } => Some("H-1-3"),
            DocumentError::Include { .. } => Some("H-1-4"),
            DocumentError::UnknownTag { .. } => Some("H-1-5"),
            DocumentError::EnvVarNotDefined { .. } => Some("H-1-6"),
        }
    }

    pub fn to_diagnostic(&self) -> DiagnosticMessage {
        let mut builder = match self.code() {
            Some(code) => DiagnosticMessageBuilder::error(catalog_title(code)).with_code(code),
            None => DiagnosticMessageBuilder::error("Unable To Read Configuration"),
        };
        builder = builder
            .problem(self.to_string())
            .with_optional_location(self.location().cloned());
        if let DocumentError::SecretNotDefined { .. } = self {
            builder = builder.add_hint(format!("Is the secret defined in {}?", SECRETS_FILE));
        }
        builder.build()
    }
}

/// A loaded document and the warnings raised while converting it.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document: ConfigValue,
    pub warnings: Vec<DiagnosticMessage>,
}

/// Reads configuration files from one configuration directory.
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    config_dir: PathBuf,

    /// Replaces the process environment for `!env_var` when set
    env: Option<HashMap<String, String>>,
}

impl DocumentLoader {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            env: None,
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Load the primary configuration file.
    pub fn load(&self) -> Result<LoadedDocument, DocumentError> {
        self.load_config_file(YAML_CONFIG_FILE)
    }

    /// Load `name` (relative to the configuration directory) as a
    /// configuration document: the root must be a mapping and falsy
    /// top-level values become empty mappings.
    pub fn load_config_file(&self, name: &str) -> Result<LoadedDocument, DocumentError> {
        let mut session = LoadSession::new(self);
        let document = session.load_file(&self.config_dir.join(name), 0)?;
        let document = if document.is_null() {
            ConfigValue::empty_map().with_source_info(document.source_info)
        } else {
            document
        };

        let source_info = document.source_info.clone();
        let Some(entries) = document.into_map() else {
            return Err(DocumentError::NotADictionary {
                file: name.to_string(),
                location: source_info,
            });
        };

        let entries = entries
            .into_iter()
            .map(|(key, mut entry)| {
                if entry.value.is_falsy() {
                    entry.value =
                        ConfigValue::empty_map().with_source_info(entry.value.source_info.clone());
                }
                (key, entry)
            })
            .collect();

        Ok(LoadedDocument {
            document: ConfigValue::new_map(entries).with_source_info(source_info),
            warnings: session.warnings,
        })
    }

    fn relative_name(&self, path: &Path) -> String {
        path.strip_prefix(&self.config_dir)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    fn env_var(&self, name: &str) -> Option<String> {
        match &self.env {
            Some(env) => env.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }
}

/// Load the primary configuration file of `config_dir`.
pub fn load_config_file(config_dir: &Path) -> Result<LoadedDocument, DocumentError> {
    DocumentLoader::new(config_dir).load()
}

/// State of one load: secrets are read at most once.
struct LoadSession<'a> {
    loader: &'a DocumentLoader,
    secrets: Option<IndexMap<String, ConfigValue>>,
    warnings: Vec<DiagnosticMessage>,
}

impl<'a> LoadSession<'a> {
    fn new(loader: &'a DocumentLoader) -> Self {
        Self {
            loader,
            secrets: None,
            warnings: Vec::new(),
        }
    }

    fn read_yaml(&mut self, path: &Path) -> Result<ConfigValue, DocumentError> {
        let name = self.loader.relative_name(path);
        let content = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
            path: name.clone(),
            source,
        })?;
        let yaml = hearth_yaml::parse_file(&content, &name).map_err(|err| err.relabel(&name))?;
        Ok(config_value_from_yaml(yaml, &mut self.warnings))
    }

    fn load_file(&mut self, path: &Path, depth: usize) -> Result<ConfigValue, DocumentError> {
        tracing::debug!(file = %self.loader.relative_name(path), "loading configuration file");
        let value = self.read_yaml(path)?;
        let dir = path.parent().unwrap_or(&self.loader.config_dir).to_path_buf();
        self.resolve(value, &dir, depth)
    }

    fn resolve(
        &mut self,
        mut value: ConfigValue,
        dir: &Path,
        depth: usize,
    ) -> Result<ConfigValue, DocumentError> {
        if let Some(tag) = value.tag.take() {
            return self.resolve_tag(&tag, value, dir, depth);
        }

        value.value = match value.value {
            ConfigValueKind::Array(items) => ConfigValueKind::Array(
                items
                    .into_iter()
                    .map(|item| self.resolve(item, dir, depth))
                    .collect::<Result<_, _>>()?,
            ),
            ConfigValueKind::Map(entries) => {
                let mut resolved = IndexMap::with_capacity(entries.len());
                for (key, mut entry) in entries {
                    entry.value = self.resolve(entry.value, dir, depth)?;
                    resolved.insert(key, entry);
                }
                ConfigValueKind::Map(resolved)
            }
            scalar => scalar,
        };
        Ok(value)
    }

    fn resolve_tag(
        &mut self,
        tag: &str,
        value: ConfigValue,
        dir: &Path,
        depth: usize,
    ) -> Result<ConfigValue, DocumentError> {
        let location = value.source_info.clone();
        let argument = value.as_str().map(str::to_string);

        match (tag, argument) {
            ("secret", Some(name)) => {
                let secret = self.secret(&name, location.clone())?;
                Ok(secret.with_source_info(location))
            }
            ("env_var", Some(argument)) => {
                let mut parts = argument.split_whitespace();
                let name = parts.next().unwrap_or_default();
                let default: Vec<&str> = parts.collect();
                match self.loader.env_var(name) {
                    Some(found) => Ok(ConfigValue::string(found).with_source_info(location)),
                    None if !default.is_empty() => {
                        Ok(ConfigValue::string(default.join(" ")).with_source_info(location))
                    }
                    None => Err(DocumentError::EnvVarNotDefined {
                        name: name.to_string(),
                        location,
                    }),
                }
            }
            ("include", Some(file)) => {
                if depth >= MAX_INCLUDE_DEPTH {
                    return Err(DocumentError::Include {
                        file,
                        message: format!("includes nested deeper than {}", MAX_INCLUDE_DEPTH),
                        location,
                    });
                }
                let included = self.load_file(&dir.join(&file), depth + 1)?;
                if included.is_null() {
                    Ok(ConfigValue::empty_map().with_source_info(included.source_info))
                } else {
                    Ok(included)
                }
            }
            ("secret" | "env_var" | "include", None) => Err(DocumentError::Include {
                file: String::new(),
                message: format!("!{} expects a string argument", tag),
                location,
            }),
            (other, _) => Err(DocumentError::UnknownTag {
                tag: other.to_string(),
                location,
            }),
        }
    }

    fn secret(&mut self, name: &str, location: Option<SourceInfo>) -> Result<ConfigValue, DocumentError> {
        if self.secrets.is_none() {
            self.secrets = Some(self.load_secrets()?);
        }
        self.secrets
            .as_ref()
            .and_then(|secrets| secrets.get(name))
            .cloned()
            .ok_or_else(|| DocumentError::SecretNotDefined {
                name: name.to_string(),
                location,
            })
    }

    fn load_secrets(&mut self) -> Result<IndexMap<String, ConfigValue>, DocumentError> {
        let path = self.loader.config_dir.join(SECRETS_FILE);
        if !path.is_file() {
            return Ok(IndexMap::new());
        }
        let secrets = self.read_yaml(&path)?;
        if secrets.is_null() {
            return Ok(IndexMap::new());
        }
        let source_info = secrets.source_info.clone();
        let Some(entries) = secrets.into_map() else {
            return Err(DocumentError::NotADictionary {
                file: SECRETS_FILE.to_string(),
                location: source_info,
            });
        };
        Ok(entries
            .into_iter()
            .map(|(key, entry)| (key, entry.value))
            .collect())
    }
}

/// Whether safe mode was requested. The marker file is consumed.
pub fn safe_mode_enabled(config_dir: &Path) -> Result<bool, DocumentError> {
    let path = config_dir.join(SAFE_MODE_FILENAME);
    if !path.exists() {
        return Ok(false);
    }
    std::fs::remove_file(&path).map_err(|source| DocumentError::Io {
        path: SAFE_MODE_FILENAME.to_string(),
        source,
    })?;
    Ok(true)
}

/// Request safe mode for the next start.
pub fn enable_safe_mode(config_dir: &Path) -> Result<(), DocumentError> {
    std::fs::write(config_dir.join(SAFE_MODE_FILENAME), "").map_err(|source| DocumentError::Io {
        path: SAFE_MODE_FILENAME.to_string(),
        source,
    })
}
