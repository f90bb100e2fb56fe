//! Locating the configuration addressed to a domain.
//!
//! A domain may be configured under several top-level keys: `light` and any
//! `light <suffix>` key, where the suffix only tells the operator's blocks
//! apart. Each key holds one platform entry or a list of them.

use crate::consts::PLATFORM_KEY;
use hearth_config::{ConfigMapEntry, ConfigValue, ConfigValueKind};
use indexmap::IndexMap;

/// The domain a top-level key addresses: everything before the first space.
pub fn domain_of(key: &str) -> &str {
    key.split_once(' ').map_or(key, |(domain, _)| domain)
}

/// Top-level keys of `config` addressed to `domain`, in document order.
pub fn extract_domain_configs<'a>(config: &'a ConfigValue, domain: &str) -> Vec<&'a str> {
    config
        .as_map()
        .map(|entries| {
            entries
                .keys()
                .filter(|key| domain_of(key) == domain)
                .map(String::as_str)
                .collect()
        })
        .unwrap_or_default()
}

/// One platform entry addressed to a domain.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformEntry {
    /// Value of the entry's `platform` key, when it is a string
    pub platform: Option<String>,
    pub config: ConfigValue,
}

/// Every platform entry addressed to `domain`.
///
/// Falsy blocks are skipped. A block that is not a list is a single entry.
pub fn config_per_platform(config: &ConfigValue, domain: &str) -> Vec<PlatformEntry> {
    let mut entries = Vec::new();
    for key in extract_domain_configs(config, domain) {
        let Some(block) = config.get(key) else {
            continue;
        };
        if block.is_falsy() {
            continue;
        }
        let items = match &block.value {
            ConfigValueKind::Array(items) => items.as_slice(),
            _ => std::slice::from_ref(block),
        };
        entries.extend(items.iter().map(|item| PlatformEntry {
            platform: item
                .get(PLATFORM_KEY)
                .and_then(ConfigValue::as_str)
                .map(str::to_string),
            config: item.clone(),
        }));
    }
    entries
}

/// `config` without any key addressed to `domain`.
pub fn config_without_domain(config: &ConfigValue, domain: &str) -> ConfigValue {
    let entries: IndexMap<String, ConfigMapEntry> = config
        .as_map()
        .map(|entries| {
            entries
                .iter()
                .filter(|(key, _)| domain_of(key) != domain)
                .map(|(key, entry)| (key.clone(), entry.clone()))
                .collect()
        })
        .unwrap_or_default();
    ConfigValue::new_map(entries).with_source_info(config.source_info.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> ConfigValue {
        let yaml = hearth_yaml::parse_file(
            r#"
light:
  - platform: hue
  - platform: lifx
light kitchen:
  platform: tradfri
light empty:
lighting:
  platform: nope
sensor:
  - platform: template
"#,
            "configuration.yaml",
        )
        .unwrap();
        hearth_config::config_value_from_yaml(yaml, &mut Vec::new())
    }

    #[test]
    fn test_domain_of() {
        assert_eq!(domain_of("light"), "light");
        assert_eq!(domain_of("light kitchen lamps"), "light");
    }

    #[test]
    fn test_extract_domain_configs() {
        let doc = document();
        assert_eq!(
            extract_domain_configs(&doc, "light"),
            vec!["light", "light kitchen", "light empty"]
        );
        assert!(extract_domain_configs(&doc, "switch").is_empty());
    }

    #[test]
    fn test_config_per_platform() {
        let doc = document();
        let platforms: Vec<_> = config_per_platform(&doc, "light")
            .into_iter()
            .map(|entry| entry.platform)
            .collect();
        assert_eq!(
            platforms,
            vec![Some("hue".into()), Some("lifx".into()), Some("tradfri".into())]
        );
    }

    #[test]
    fn test_entry_without_platform() {
        let doc = ConfigValue::map_from([("notify", ConfigValue::string("plain"))]);
        let entries = config_per_platform(&doc, "notify");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].platform, None);
    }

    #[test]
    fn test_config_without_domain() {
        let doc = config_without_domain(&document(), "light");
        let keys: Vec<_> = doc.as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["lighting", "sensor"]);
    }
}
