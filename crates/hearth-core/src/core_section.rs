//! Validation and processing of the `core` section.
//!
//! The section is validated against an embedded schema plus a handful of
//! value checks ([`CoreConfigSchema`]), then turned into a [`CoreConfig`]
//! with defaults applied, customizations from packages folded in and repair
//! issues raised or cleared.

use crate::consts::{
    CORE_KEY, CUSTOMIZE_DOMAIN_KEY, CUSTOMIZE_GLOB_KEY, CUSTOMIZE_KEY, DEFAULT_CURRENCY,
    DEFAULT_LANGUAGE, HISTORIC_CURRENCIES, PACKAGES_KEY,
};
use crate::issues::{Issue, IssueRegistry, IssueSeverity};
use crate::packages::packages_shape;
use hearth_config::{ConfigPath, ConfigValue};
use hearth_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder};
use hearth_schema::{
    ConfigSchema, Invalid, Property, Schema, SchemaFailure, ValidationError, ValidationErrorKind,
};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use url::Url;

const LEARN_MORE_URL: &str = "https://hearth.dev/docs/configuration/basic";

/// Keys whose presence marks the location as configured in YAML.
const LOCATION_KEYS: &[&str] = &[
    "name",
    "latitude",
    "longitude",
    "elevation",
    "time_zone",
    "unit_system",
    "internal_url",
    "external_url",
    "currency",
    "country",
    "language",
];

static CUSTOMIZE_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    embedded_schema(
        include_str!("../resources/customize_schema.yaml"),
        "customize_schema.yaml",
    )
});

static CORE_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    let mut schema = embedded_schema(
        include_str!("../resources/core_schema.yaml"),
        "core_schema.yaml",
    );
    if let Schema::Object(object) = &mut schema {
        object.properties.insert(
            PACKAGES_KEY.to_string(),
            Property::optional(packages_shape()).with_default(ConfigValue::empty_map()),
        );
        if let Schema::Object(customize) = &*CUSTOMIZE_SCHEMA {
            object.properties.extend(customize.properties.clone());
        }
    }
    schema
});

static CURRENCY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("Invalid regex pattern for currency"));

static COUNTRY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2}$").expect("Invalid regex pattern for country"));

static LANGUAGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z]{2,3}(-[A-Za-z0-9]{2,8})*$").expect("Invalid regex pattern for language")
});

static ENTITY_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[a-z0-9]+_)*[a-z0-9]+\.[a-z0-9_]+$").expect("Invalid regex pattern for entity id")
});

/// # Panics
///
/// Panics if the embedded definition is invalid.
fn embedded_schema(source: &str, name: &str) -> Schema {
    let yaml = hearth_yaml::parse_file(source, name)
        .unwrap_or_else(|err| panic!("Invalid {name} - this is a bug in hearth: {err}"));
    Schema::from_yaml(&yaml)
        .unwrap_or_else(|err| panic!("Invalid {name} - this is a bug in hearth: {err}"))
}

/// Validator for the `core` section.
///
/// Directory values are resolved against `config_dir` and must exist.
#[derive(Debug, Clone)]
pub struct CoreConfigSchema {
    config_dir: PathBuf,
}

impl CoreConfigSchema {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    fn check_values(&self, validated: &ConfigValue) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (key, pattern, message) in [
            ("currency", &*CURRENCY_PATTERN, "Invalid ISO 4217 formatted currency"),
            ("country", &*COUNTRY_PATTERN, "Invalid ISO 3166 formatted country"),
            ("language", &*LANGUAGE_PATTERN, "Invalid language"),
        ] {
            if let Some(value) = validated.get(key).and_then(ConfigValue::as_str) {
                if !pattern.is_match(value) {
                    errors.push(
                        invalid_at(message, ConfigPath::from_keys([key]))
                            .with_error_type("dictionary value"),
                    );
                }
            }
        }

        for key in ["allowlist_external_dirs", "whitelist_external_dirs"] {
            let Some(items) = validated.get(key).and_then(ConfigValue::as_array) else {
                continue;
            };
            for (index, item) in items.iter().enumerate() {
                if let Some(dir) = item.as_str() {
                    if !self.is_dir(dir) {
                        let path = ConfigPath::from_keys([key]).child(index);
                        errors.push(invalid_at("not a directory", path));
                    }
                }
            }
        }

        if let Some(media_dirs) = validated.get("media_dirs").and_then(ConfigValue::as_map) {
            for (slug, entry) in media_dirs {
                if let Some(dir) = entry.value.as_str() {
                    if !self.is_dir(dir) {
                        let path = ConfigPath::from_keys(["media_dirs", slug.as_str()]);
                        errors.push(
                            invalid_at("not a directory", path).with_error_type("dictionary value"),
                        );
                    }
                }
            }
        }

        errors.extend(check_entity_ids(validated));
        errors
    }

    fn is_dir(&self, dir: &str) -> bool {
        self.config_dir.join(dir).is_dir()
    }
}

impl ConfigSchema for CoreConfigSchema {
    fn validate(&self, config: &ConfigValue) -> Result<ConfigValue, SchemaFailure> {
        let validated = CORE_SCHEMA.validate(config)?;
        let errors = self.check_values(&validated);
        if errors.is_empty() {
            Ok(validated)
        } else {
            Err(Invalid::new(errors).into())
        }
    }
}

fn invalid_at(message: &str, path: ConfigPath) -> ValidationError {
    ValidationError::new(
        ValidationErrorKind::InvalidValue {
            message: message.to_string(),
        },
        path,
    )
}

fn check_entity_ids(validated: &ConfigValue) -> Vec<ValidationError> {
    let Some(exact) = validated.get(CUSTOMIZE_KEY).and_then(ConfigValue::as_map) else {
        return Vec::new();
    };
    exact
        .keys()
        .filter(|entity_id| !ENTITY_ID_PATTERN.is_match(entity_id))
        .map(|entity_id| {
            invalid_at(
                &format!("Entity ID {} is an invalid entity ID", entity_id),
                ConfigPath::from_keys([CUSTOMIZE_KEY, entity_id.as_str()]),
            )
        })
        .collect()
}

fn validate_customize(config: &ConfigValue) -> Result<ConfigValue, Invalid> {
    let validated = CUSTOMIZE_SCHEMA.validate(config).map_err(|failure| match failure {
        SchemaFailure::Invalid(invalid) => invalid,
        SchemaFailure::Unexpected(err) => Invalid::single(ValidationError::invalid(err.to_string())),
    })?;
    let errors = check_entity_ids(&validated);
    if errors.is_empty() {
        Ok(validated)
    } else {
        Err(Invalid::new(errors))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    Yaml,
}

/// Attribute overrides, keyed by entity id, domain and glob pattern.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Customize {
    pub exact: IndexMap<String, serde_json::Value>,
    pub domain: IndexMap<String, serde_json::Value>,
    pub glob: IndexMap<String, serde_json::Value>,
}

impl Customize {
    /// Later entries win.
    fn update(&mut self, customize: &ConfigValue) {
        for (key, target) in [
            (CUSTOMIZE_KEY, &mut self.exact),
            (CUSTOMIZE_DOMAIN_KEY, &mut self.domain),
            (CUSTOMIZE_GLOB_KEY, &mut self.glob),
        ] {
            if let Some(entries) = customize.get(key).and_then(ConfigValue::as_map) {
                for (name, entry) in entries {
                    target.insert(name.clone(), entry.value.to_json());
                }
            }
        }
    }
}

/// The processed `core` section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoreConfig {
    pub location_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<i64>,
    pub time_zone: Option<String>,
    pub unit_system: Option<String>,
    pub internal_url: Option<String>,
    pub external_url: Option<String>,
    pub media_dirs: IndexMap<String, String>,
    pub allowlist_external_dirs: BTreeSet<String>,
    pub allowlist_external_urls: BTreeSet<String>,
    pub legacy_templates: bool,
    pub currency: String,
    pub country: Option<String>,
    pub language: String,
    pub customize: Customize,
    pub config_source: ConfigSource,
}

/// A processed `core` section and the warnings raised along the way.
#[derive(Debug, Clone)]
pub struct CoreOutcome {
    pub config: CoreConfig,
    pub warnings: Vec<DiagnosticMessage>,
}

/// Validate and apply the `core` section.
///
/// Errors are relative to the section itself. Problems that do not stop
/// processing are logged and returned as warnings; the currency and country
/// repair issues are created or deleted on `issues`.
pub fn process_core_config(
    core: &ConfigValue,
    config_dir: &Path,
    issues: &dyn IssueRegistry,
) -> Result<CoreOutcome, Invalid> {
    let mut warnings = Vec::new();
    let core = if core.is_null() {
        ConfigValue::empty_map()
    } else {
        core.clone()
    };

    let validated = match CoreConfigSchema::new(config_dir).validate(&core) {
        Ok(validated) => validated,
        Err(SchemaFailure::Invalid(invalid)) => return Err(invalid),
        Err(SchemaFailure::Unexpected(err)) => {
            return Err(Invalid::single(ValidationError::invalid(err.to_string())));
        }
    };

    for key in ["internal_url", "external_url"] {
        if let Some(url) = validated.get(key).and_then(ConfigValue::as_str) {
            if url_has_path(url) {
                let message = format!("Invalid {} set. It's not allowed to have a path (/bla)", key);
                tracing::warn!("{}", message);
                warnings.push(
                    DiagnosticMessageBuilder::warning("URL With Path")
                        .with_code("H-4-2")
                        .problem(message)
                        .with_optional_location(core.key_source(key).cloned())
                        .build(),
                );
            }
        }
    }

    let string = |key: &str| {
        validated
            .get(key)
            .and_then(ConfigValue::as_str)
            .map(str::to_string)
    };

    let config_source = if LOCATION_KEYS.iter().any(|key| validated.get(key).is_some()) {
        ConfigSource::Yaml
    } else {
        ConfigSource::Default
    };

    let media_dirs = match validated.get("media_dirs").and_then(ConfigValue::as_map) {
        Some(dirs) => dirs
            .iter()
            .filter_map(|(slug, entry)| Some((slug.clone(), entry.value.as_str()?.to_string())))
            .collect(),
        None => IndexMap::from([(
            "local".to_string(),
            config_dir.join("media").display().to_string(),
        )]),
    };

    let mut allowlist_external_dirs: BTreeSet<String> =
        BTreeSet::from([config_dir.join("www").display().to_string()]);
    allowlist_external_dirs.extend(media_dirs.values().cloned());
    if let Some(dirs) = validated.get("allowlist_external_dirs") {
        allowlist_external_dirs.extend(strings(dirs));
    } else if let Some(dirs) = validated.get("whitelist_external_dirs") {
        let message = "Key whitelist_external_dirs has been replaced with \
                       allowlist_external_dirs. Please update your config";
        tracing::warn!("{}", message);
        warnings.push(
            DiagnosticMessageBuilder::warning("Deprecated Key")
                .problem(message)
                .with_optional_location(core.key_source("whitelist_external_dirs").cloned())
                .build(),
        );
        allowlist_external_dirs.extend(strings(dirs));
    }

    let allowlist_external_urls = validated
        .get("allowlist_external_urls")
        .map(|urls| {
            strings(urls)
                .map(|url| if url.ends_with('/') { url } else { format!("{url}/") })
                .collect()
        })
        .unwrap_or_default();

    let mut customize = Customize::default();
    customize.update(&validated);
    if let Some(packages) = validated.get(PACKAGES_KEY).and_then(ConfigValue::as_map) {
        for (name, package) in packages {
            let Some(package_core) = package.value.get(CORE_KEY) else {
                continue;
            };
            match validate_customize(package_core) {
                Ok(package_customize) => customize.update(&package_customize),
                Err(_) => {
                    let message = format!("Package {} contains invalid customize", name);
                    tracing::warn!("{}", message);
                    warnings.push(
                        DiagnosticMessageBuilder::warning("Invalid Customize")
                            .problem(message)
                            .with_optional_location(package.key_source.clone())
                            .build(),
                    );
                }
            }
        }
    }

    let currency = string("currency").unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    if HISTORIC_CURRENCIES.contains(&currency.as_str()) {
        issues.create_issue(core_issue(
            "historic_currency",
            BTreeMap::from([("currency".to_string(), currency.clone())]),
        ));
    } else {
        issues.delete_issue(CORE_KEY, "historic_currency");
    }

    let country = string("country");
    if country.is_none() {
        issues.create_issue(core_issue("country_not_configured", BTreeMap::new()));
    } else {
        issues.delete_issue(CORE_KEY, "country_not_configured");
    }

    let config = CoreConfig {
        location_name: string("name"),
        latitude: validated.get("latitude").and_then(ConfigValue::as_f64),
        longitude: validated.get("longitude").and_then(ConfigValue::as_f64),
        elevation: validated.get("elevation").and_then(ConfigValue::as_i64),
        time_zone: string("time_zone"),
        unit_system: string("unit_system").map(|system| match system.as_str() {
            "imperial" => "us_customary".to_string(),
            _ => system,
        }),
        internal_url: string("internal_url"),
        external_url: string("external_url"),
        media_dirs,
        allowlist_external_dirs,
        allowlist_external_urls,
        legacy_templates: validated
            .get("legacy_templates")
            .and_then(ConfigValue::as_bool)
            .unwrap_or(false),
        currency,
        country,
        language: string("language").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
        customize,
        config_source,
    };
    Ok(CoreOutcome { config, warnings })
}

fn strings(value: &ConfigValue) -> impl Iterator<Item = String> + '_ {
    value
        .as_array()
        .unwrap_or_default()
        .iter()
        .filter_map(|item| item.as_str().map(str::to_string))
}

fn core_issue(issue_id: &str, placeholders: BTreeMap<String, String>) -> Issue {
    Issue {
        domain: CORE_KEY.to_string(),
        issue_id: issue_id.to_string(),
        is_fixable: false,
        learn_more_url: Some(LEARN_MORE_URL.to_string()),
        severity: IssueSeverity::Warning,
        translation_key: issue_id.to_string(),
        translation_placeholders: placeholders,
    }
}

/// Whether `url` points below the root of its host.
fn url_has_path(url: &str) -> bool {
    Url::parse(url).is_ok_and(|url| !matches!(url.path(), "" | "/"))
}
