//! Package merging and domain validation against integrations declared in
//! a manifest.

use hearth_config::{ConfigValue, PathSegment, SourceInfo, find_annotation};
use hearth_core::report::format_failure;
use hearth_core::{
    ErrorCategory, IntegrationLoader, IntegrationRegistry, merge_packages, process_component_config,
};
use serde_json::json;

const MANIFEST: &str = r#"
light:
  documentation: https://hearth.dev/integrations/light
  platform_schema:
    object:
      closed: false
      properties:
        platform: string
sensor:
  documentation: https://hearth.dev/integrations/sensor
  merge_hint: dict
  config_schema:
    object:
      closed: false
      properties:
        sensor:
          object:
            properties:
              threshold: integer
              bar: string
            required: [bar]
a:
  platforms:
    light:
      schema:
        object:
          closed: false
          properties:
            host: string
          required: [host]
b:
  platforms:
    light:
      schema:
        object:
          closed: false
          properties:
            host: string
          required: [host]
c:
  platforms:
    light: ~
hue:
  platforms:
    light: ~
"#;

fn registry() -> IntegrationRegistry {
    let yaml = hearth_yaml::parse_file(MANIFEST, "integrations.yaml").unwrap();
    IntegrationRegistry::from_manifest(&yaml).unwrap()
}

fn load(src: &str) -> ConfigValue {
    let yaml = hearth_yaml::parse_file(src, "configuration.yaml").unwrap();
    hearth_config::config_value_from_yaml(yaml, &mut Vec::new())
}

fn packages_of(document: &ConfigValue) -> ConfigValue {
    document
        .get_path(&["core".into(), "packages".into()])
        .cloned()
        .unwrap_or_default()
}

async fn merged(src: &str) -> hearth_core::MergedDocument {
    let document = load(src);
    let packages = packages_of(&document);
    merge_packages(document, &packages, &registry()).await.unwrap()
}

#[tokio::test]
async fn list_fragments_concatenate_in_package_order() {
    let result = merged(
        r#"
core:
  packages:
    pkg1:
      light:
        - platform: hue
        - {}
    pkg2:
      light:
        platform: c
"#,
    )
    .await;

    assert!(result.failures.is_empty());
    assert_eq!(
        result.document.get("light").unwrap().to_json(),
        json!([{"platform": "hue"}, {"platform": "c"}])
    );
}

#[tokio::test]
async fn single_package_list_lands_in_empty_document() {
    let result = merged(
        r#"
core:
  packages:
    pkg1:
      light:
        - platform: hue
"#,
    )
    .await;

    assert!(result.failures.is_empty());
    assert_eq!(
        result.document.get("light").unwrap().to_json(),
        json!([{"platform": "hue"}])
    );
}

#[tokio::test]
async fn duplicate_scalar_keeps_first_value() {
    let result = merged(
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

    let threshold = result
        .document
        .get_path(&["sensor".into(), "threshold".into()])
        .and_then(ConfigValue::as_i64);
    assert_eq!(threshold, Some(1));

    assert_eq!(result.failures.len(), 1);
    let failure = &result.failures[0];
    assert_eq!(failure.package, "pkg2");
    assert!(failure.message.contains("'threshold'"));
    insta::assert_snapshot!(failure.to_string(), @"Setup of package 'pkg2' at configuration.yaml, line 7 failed: integration 'sensor' has duplicate key 'threshold'");
}

#[test]
fn annotation_of_tagged_package_key() {
    let mut document = ConfigValue::map_from([(
        "core",
        ConfigValue::map_from([(
            "packages",
            ConfigValue::map_from([(
                "demo",
                ConfigValue::map_from([(
                    "light",
                    ConfigValue::new_array(vec![ConfigValue::map_from([(
                        "platform",
                        ConfigValue::string("hue"),
                    )])]),
                )]),
            )]),
        )]),
    )]);
    let packages = document
        .get_mut("core")
        .and_then(|core| core.get_mut("packages"))
        .and_then(ConfigValue::as_map_mut)
        .unwrap();
    packages.get_mut("demo").unwrap().key_source = Some(SourceInfo::new(
        Some("packages.yaml".into()),
        0,
        7,
        3,
        4,
    ));

    let demo: Vec<PathSegment> = vec!["core".into(), "packages".into(), "demo".into()];
    let mut through = demo.clone();
    through.extend([
        PathSegment::from("light"),
        PathSegment::from(0usize),
        PathSegment::from("platform"),
    ]);

    for path in [&demo, &through] {
        let annotation = find_annotation(&document, path).unwrap();
        assert_eq!(annotation.to_string(), "packages.yaml, line 7");
    }
    assert!(find_annotation(&document, &["core".into(), "name".into()]).is_none());
}

#[tokio::test]
async fn missing_required_key_is_named() {
    let registry = registry();
    let document = load("sensor:\n  threshold: 1\n");
    let integration = registry.resolve("sensor").await.unwrap();
    let info = process_component_config(&document, &integration, &registry).await;

    assert!(info.config.is_none());
    assert_eq!(info.failures.len(), 1);
    assert_eq!(info.failures[0].category, ErrorCategory::ConfigValidationErr);
    assert!(format_failure(&info.failures[0], 500).contains("required key 'bar' not provided"));
}

#[tokio::test]
async fn failing_platform_entry_is_dropped() {
    let registry = registry();
    let document = load(
        r#"
light:
  - platform: a
    host: 10.0.0.1
  - platform: b
  - platform: c
"#,
    );
    let integration = registry.resolve("light").await.unwrap();
    let info = process_component_config(&document, &integration, &registry).await;

    let light = info.config.as_ref().and_then(|c| c.get("light")).unwrap();
    let platforms: Vec<&str> = light
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|entry| entry.get("platform").and_then(ConfigValue::as_str))
        .collect();
    assert_eq!(platforms, vec!["a", "c"]);

    assert_eq!(info.failures.len(), 1);
    let failure = &info.failures[0];
    assert_eq!(failure.category, ErrorCategory::PlatformConfigValidationErr);
    assert_eq!(failure.platform.as_deref(), Some("b"));
    insta::assert_snapshot!(format_failure(failure, 500), @"Invalid config for 'light.b' at configuration.yaml, line 5: required key 'host' not provided");
}

#[tokio::test]
async fn whole_schema_validation_is_idempotent() {
    let registry = registry();
    let document = load("sensor:\n  threshold: '5'\n  bar: x\n");
    let integration = registry.resolve("sensor").await.unwrap();

    let first = process_component_config(&document, &integration, &registry).await;
    assert!(first.failures.is_empty());
    let first = first.config.unwrap();

    let second = process_component_config(&first, &integration, &registry).await;
    assert!(second.failures.is_empty());
    assert_eq!(second.config.unwrap(), first);
}
