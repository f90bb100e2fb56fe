//! Conversion from YAML trees to ConfigValue.

use crate::types::{ConfigMapEntry, ConfigValue, ConfigValueKind};
use hearth_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder};
use hearth_yaml::YamlWithSourceInfo;
use indexmap::IndexMap;
use yaml_rust2::Yaml;

/// Convert a `YamlWithSourceInfo` to a `ConfigValue`.
///
/// Mapping keys must be scalars; they are stored as strings (`1` becomes
/// `"1"`). Collection keys cannot be addressed by a [`crate::ConfigPath`]
/// and are dropped with a warning pushed to `diagnostics`. A key written
/// twice keeps its first position and its last value.
///
/// Local tags are carried over on [`ConfigValue::tag`] for the loader to
/// resolve.
pub fn config_value_from_yaml(
    yaml: YamlWithSourceInfo,
    diagnostics: &mut Vec<DiagnosticMessage>,
) -> ConfigValue {
    let tag = yaml.tag.as_ref().map(|(name, _)| name.clone());
    let source_info = Some(yaml.source_info.clone());

    let value = if yaml.is_array() {
        let items = yaml.into_array().map(|(items, _)| items).unwrap_or_default();
        ConfigValueKind::Array(
            items
                .into_iter()
                .map(|item| config_value_from_yaml(item, diagnostics))
                .collect(),
        )
    } else if yaml.is_hash() {
        let entries = yaml.into_hash().map(|(entries, _)| entries).unwrap_or_default();
        let mut map = IndexMap::with_capacity(entries.len());
        for entry in entries {
            let Some(key) = scalar_key(&entry.key.yaml) else {
                diagnostics.push(
                    DiagnosticMessageBuilder::warning("Unsupported mapping key")
                        .with_code("H-2-3")
                        .problem("Only scalar values can be used as mapping keys")
                        .add_hint("Quote the key or restructure the mapping?")
                        .with_location(entry.key_span.clone())
                        .build(),
                );
                continue;
            };
            let value = config_value_from_yaml(entry.value, diagnostics);
            map.insert(
                key,
                ConfigMapEntry::new(value).with_key_source(Some(entry.key_span)),
            );
        }
        ConfigValueKind::Map(map)
    } else {
        ConfigValueKind::Scalar(yaml.yaml)
    };

    ConfigValue {
        value,
        source_info,
        tag,
    }
}

fn scalar_key(yaml: &Yaml) -> Option<String> {
    match yaml {
        Yaml::String(s) | Yaml::Real(s) => Some(s.clone()),
        Yaml::Integer(i) => Some(i.to_string()),
        Yaml::Boolean(b) => Some(b.to_string()),
        Yaml::Null => Some("null".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(content: &str) -> (ConfigValue, Vec<DiagnosticMessage>) {
        let yaml = hearth_yaml::parse_file(content, "configuration.yaml").unwrap();
        let mut diagnostics = Vec::new();
        let value = config_value_from_yaml(yaml, &mut diagnostics);
        (value, diagnostics)
    }

    #[test]
    fn test_map_key_source_tracking() {
        let (config, diagnostics) = convert("core:\n  name: Home\nsensor:\n  threshold: 1\n");
        assert!(diagnostics.is_empty());
        assert_eq!(config.key_source("sensor").map(|s| s.line), Some(3));
        let sensor = config.get("sensor").unwrap();
        assert_eq!(sensor.key_source("threshold").map(|s| s.line), Some(4));
        assert_eq!(sensor.get("threshold").and_then(ConfigValue::as_i64), Some(1));
    }

    #[test]
    fn test_numeric_keys_become_strings() {
        let (config, _) = convert("1: one\ntrue: yes\n");
        assert_eq!(config.get("1").and_then(ConfigValue::as_str), Some("one"));
        assert_eq!(config.get("true").and_then(ConfigValue::as_bool), Some(true));
    }

    #[test]
    fn test_tag_is_carried() {
        let (config, _) = convert("api_key: !secret weather_key\n");
        let value = config.get("api_key").unwrap();
        assert_eq!(value.tag.as_deref(), Some("secret"));
        assert_eq!(value.as_str(), Some("weather_key"));
    }

    #[test]
    fn test_complex_key_produces_warning() {
        let (config, diagnostics) = convert("? [a, b]\n: 1\nok: 2\n");
        assert_eq!(config.as_map().unwrap().len(), 1);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code.as_deref(), Some("H-2-3"));
    }
}
