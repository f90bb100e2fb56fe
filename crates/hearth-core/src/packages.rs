//! Folding packages into the main document.
//!
//! Packages live under `core.packages` as a slug-keyed mapping of
//! `domain key -> fragment`. Each fragment is merged into the top-level key of
//! the same name, following the domain's [`MergePolicy`]. A fragment that
//! cannot be merged is reported and skipped; the rest of the packages are
//! still merged, so the result is never all-or-nothing.

use crate::consts::{CORE_KEY, PACKAGES_KEY};
use crate::integration::IntegrationLoader;
use crate::platforms::domain_of;
use crate::policy::effective_merge_policy;
use hearth_config::merge::concat_lists;
use hearth_config::{
    Annotation, ConfigMapEntry, ConfigPath, ConfigValue, MergePolicy, find_annotation, recursive_merge,
};
use hearth_schema::{ConfigSchema, Invalid, ObjectSchema, Schema, SchemaFailure};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// A (package, domain key) pair that could not be merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageFailure {
    pub package: String,

    /// Top-level key the fragment was addressed to
    pub key: String,

    pub message: String,

    /// Where the package is declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
}

impl fmt::Display for PackageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Setup of package '{}'", self.package)?;
        if let Some(annotation) = &self.annotation {
            write!(f, " at {}", annotation)?;
        }
        write!(f, " failed: {}", self.message)
    }
}

/// The packages block does not have the expected shape. Nothing was merged.
#[derive(Debug, Clone, Error)]
#[error("Invalid packages configuration: {invalid}")]
pub struct PackagesInvalid {
    /// Errors with paths rooted at the document
    pub invalid: Invalid,
}

/// Document with every mergeable package fragment folded in.
#[derive(Debug, Clone)]
pub struct MergedDocument {
    pub document: ConfigValue,
    pub failures: Vec<PackageFailure>,
}

/// Slug-named packages of string-keyed fragments that are mappings,
/// sequences or null.
pub(crate) fn packages_shape() -> Schema {
    let fragment = Schema::AnyOf(vec![
        Schema::Object(ObjectSchema {
            closed: false,
            ..ObjectSchema::default()
        }),
        Schema::Array(Box::new(Schema::Any)),
        Schema::Null,
    ]);
    Schema::SlugMap(Box::new(Schema::Object(ObjectSchema {
        closed: false,
        additional: Some(Box::new(fragment)),
        ..ObjectSchema::default()
    })))
}

/// Check the shape of the packages block, with error paths rooted at the
/// document.
pub fn check_packages(packages: &ConfigValue) -> Result<(), PackagesInvalid> {
    if packages.is_null() {
        return Ok(());
    }
    let prefix = ConfigPath::from_keys([CORE_KEY, PACKAGES_KEY]);
    match packages_shape().validate(packages) {
        Ok(_) => Ok(()),
        Err(SchemaFailure::Invalid(invalid)) => Err(PackagesInvalid {
            invalid: invalid.prefixed(&prefix),
        }),
        Err(SchemaFailure::Unexpected(err)) => Err(PackagesInvalid {
            invalid: Invalid::single(hearth_schema::ValidationError::invalid(err.to_string()).at(prefix)),
        }),
    }
}

/// Merge every package of `packages` into `document`.
///
/// Fragments under the core key are skipped. The shape of `packages` is
/// checked first; a malformed block aborts before anything is merged.
pub async fn merge_packages(
    document: ConfigValue,
    packages: &ConfigValue,
    loader: &dyn IntegrationLoader,
) -> Result<MergedDocument, PackagesInvalid> {
    check_packages(packages)?;
    let Some(package_map) = packages.as_map() else {
        return Ok(MergedDocument {
            document,
            failures: Vec::new(),
        });
    };

    let annotations: HashMap<&str, Option<Annotation>> = package_map
        .keys()
        .map(|name| {
            let path = ConfigPath::from_keys([CORE_KEY, PACKAGES_KEY, name.as_str()]);
            (name.as_str(), find_annotation(&document, path.segments()))
        })
        .collect();

    let source_info = document.source_info.clone();
    let tag = document.tag.clone();
    let mut root = document.into_map().unwrap_or_default();
    let mut failures = Vec::new();

    for (package, fragments) in package_map {
        let Some(fragments) = fragments.value.as_map() else {
            continue;
        };
        for (key, fragment) in fragments {
            if key == CORE_KEY {
                continue;
            }
            let mut fail = |message: String| {
                let failure = PackageFailure {
                    package: package.clone(),
                    key: key.clone(),
                    message,
                    annotation: annotations.get(package.as_str()).cloned().flatten(),
                };
                tracing::error!(package = %package, key = %key, "{}", failure);
                failures.push(failure);
            };

            let domain = domain_of(key);
            let integration = match loader.resolve(domain).await {
                Ok(integration) => integration,
                Err(err) => {
                    fail(err.to_string());
                    continue;
                }
            };
            let component = match integration.component() {
                Ok(component) => component,
                Err(err) => {
                    fail(format!("Integration {} caused error: {}", key, err));
                    continue;
                }
            };

            match effective_merge_policy(&integration, component) {
                MergePolicy::List => {
                    merge_list(&mut root, key, fragment);
                }
                MergePolicy::Dict => {
                    for message in merge_dict(&mut root, key, fragment) {
                        fail(message);
                    }
                }
            }
        }
    }

    let mut document = ConfigValue::new_map(root).with_source_info(source_info);
    document.tag = tag;
    Ok(MergedDocument { document, failures })
}

fn merge_list(root: &mut IndexMap<String, ConfigMapEntry>, key: &str, fragment: &ConfigMapEntry) {
    match root.get_mut(key) {
        Some(slot) => {
            let existing = std::mem::replace(&mut slot.value, ConfigValue::null());
            slot.value = concat_lists(Some(existing), fragment.value.clone());
        }
        None => {
            let merged = concat_lists(None, fragment.value.clone());
            root.insert(
                key.to_string(),
                ConfigMapEntry::new(merged).with_key_source(fragment.key_source.clone()),
            );
        }
    }
}

/// Returns one message per problem; an empty result means the fragment was
/// merged completely.
fn merge_dict(
    root: &mut IndexMap<String, ConfigMapEntry>,
    key: &str,
    fragment: &ConfigMapEntry,
) -> Vec<String> {
    let incoming = if fragment.value.is_null() {
        IndexMap::new()
    } else {
        match fragment.value.as_map() {
            Some(entries) => entries.clone(),
            None => {
                return vec![format!("integration '{}' cannot be merged, expected a dict", key)];
            }
        }
    };

    let slot = root.entry(key.to_string()).or_insert_with(|| {
        ConfigMapEntry::new(ConfigValue::null()).with_key_source(fragment.key_source.clone())
    });
    if slot.value.is_null() {
        slot.value = ConfigValue::empty_map().with_source_info(fragment.value.source_info.clone());
    }
    let Some(target) = slot.value.as_map_mut() else {
        return vec![format!(
            "integration '{}' cannot be merged, dict expected in main config",
            key
        )];
    };

    recursive_merge(target, incoming)
        .into_iter()
        .map(|duplicate| format!("integration '{}' has duplicate key '{}'", key, duplicate))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::{Component, Integration, IntegrationRegistry, LoadError};
    use hearth_config::config_value_from_yaml;
    use std::sync::Arc;

    fn registry() -> IntegrationRegistry {
        IntegrationRegistry::new()
            .with(
                Integration::new("light")
                    .with_component(Component::default().with_platform_schema(Arc::new(Schema::Any))),
            )
            .with(Integration::new("sensor").with_component(
                Component::default().with_merge_hint(MergePolicy::Dict),
            ))
            .with(Integration::new("notify").with_component(
                Component::default().with_config_schema(Arc::new(notify_schema())),
            ))
            .with(Integration::new("broken").with_component_error(LoadError::Import(
                "No module named 'broken'".into(),
            )))
    }

    /// A deprecation wrapper ahead of the mapping schema.
    fn notify_schema() -> Schema {
        let yaml = hearth_yaml::parse(
            "allOf:\n  - any\n  - object:\n      closed: false\n      properties:\n        notify:\n          ensureList: any\n",
        )
        .unwrap();
        Schema::from_yaml(&yaml).unwrap()
    }

    fn load(src: &str) -> ConfigValue {
        let yaml = hearth_yaml::parse_file(src, "configuration.yaml").unwrap();
        config_value_from_yaml(yaml, &mut Vec::new())
    }

    async fn merge(src: &str) -> MergedDocument {
        let document = load(src);
        let packages = document
            .get_path(ConfigPath::from_keys([CORE_KEY, PACKAGES_KEY]).segments())
            .cloned()
            .unwrap_or_else(ConfigValue::null);
        merge_packages(document, &packages, &registry()).await.unwrap()
    }

    #[tokio::test]
    async fn test_list_fragments_concatenate_in_package_order() {
        let merged = merge(
            r#"
core:
  packages:
    pkg1:
      light:
        - platform: hue
        -
    pkg2:
      light:
        platform: lifx
light:
  - platform: tradfri
"#,
        )
        .await;
        assert!(merged.failures.is_empty());
        let platforms: Vec<_> = merged
            .document
            .get("light")
            .and_then(ConfigValue::as_array)
            .unwrap()
            .iter()
            .filter_map(|entry| entry.get("platform").and_then(ConfigValue::as_str))
            .collect();
        assert_eq!(platforms, vec!["tradfri", "hue", "lifx"]);
    }

    #[tokio::test]
    async fn test_list_into_empty_document() {
        let merged = merge("core:\n  packages:\n    pkg1:\n      light:\n        - platform: hue\n").await;
        let light = merged.document.get("light").unwrap();
        assert_eq!(
            light.without_source_info(),
            ConfigValue::new_array(vec![ConfigValue::map_from([(
                "platform",
                ConfigValue::string("hue")
            )])])
        );
    }

    #[tokio::test]
    async fn test_all_of_list_domain_accumulates_entries() {
        let merged = merge(
            r#"
core:
  packages:
    pkg1:
      notify:
        - platform: a
notify:
  - platform: b
"#,
        )
        .await;
        assert!(merged.failures.is_empty(), "{:?}", merged.failures);
        let platforms: Vec<_> = merged
            .document
            .get("notify")
            .and_then(ConfigValue::as_array)
            .unwrap()
            .iter()
            .filter_map(|entry| entry.get("platform").and_then(ConfigValue::as_str))
            .collect();
        assert_eq!(platforms, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_duplicate_scalar_keeps_first_value() {
        let merged = merge(
            r#"
core:
  packages:
    pkg1:
      sensor:
        threshold: 1
    pkg2:
      sensor:
        threshold: 2
"#,
        )
        .await;
        let threshold = merged
            .document
            .get("sensor")
            .and_then(|s| s.get("threshold"))
            .and_then(ConfigValue::as_i64);
        assert_eq!(threshold, Some(1));
        assert_eq!(merged.failures.len(), 1);
        insta::assert_snapshot!(
            merged.failures[0].to_string(),
            @"Setup of package 'pkg2' at configuration.yaml, line 7 failed: integration 'sensor' has duplicate key 'threshold'"
        );
    }

    #[tokio::test]
    async fn test_failed_pairs_do_not_stop_others() {
        let merged = merge(
            r#"
sensor: 5
core:
  packages:
    pkg1:
      sensor:
        threshold: 1
      broken:
        x: 1
      missing:
        x: 1
      sensor extra: [1]
      light:
        - platform: hue
"#,
        )
        .await;
        let messages: Vec<_> = merged.failures.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "integration 'sensor' cannot be merged, dict expected in main config",
                "Integration broken caused error: No module named 'broken'",
                "Integration 'missing' not found.",
                "integration 'sensor extra' cannot be merged, expected a dict",
            ]
        );
        assert!(merged.document.get("light").is_some());
        assert!(merged.failures.iter().all(|f| f.package == "pkg1"));
    }

    #[tokio::test]
    async fn test_core_fragments_skipped() {
        let merged = merge("core:\n  packages:\n    pkg1:\n      core:\n        name: x\n").await;
        assert!(merged.failures.is_empty());
        assert!(merged.document.get("core").and_then(|c| c.get("name")).is_none());
    }

    #[tokio::test]
    async fn test_null_fragment_creates_empty_dict() {
        let merged = merge("core:\n  packages:\n    pkg1:\n      sensor:\n").await;
        let sensor = merged.document.get("sensor").unwrap();
        assert!(sensor.is_map());
        assert!(sensor.is_falsy());
    }

    #[tokio::test]
    async fn test_invalid_shape_aborts() {
        let document = load("core:\n  packages:\n    Not A Slug:\n      light: 5\n");
        let packages = document.get("core").and_then(|c| c.get("packages")).cloned().unwrap();
        let err = merge_packages(document, &packages, &registry()).await.unwrap_err();
        let paths: Vec<String> = err.invalid.errors.iter().map(|e| e.path.to_string()).collect();
        assert!(paths.iter().all(|p| p.starts_with("core->packages")), "{:?}", paths);
    }
}
