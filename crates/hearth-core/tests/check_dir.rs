//! End-to-end checks of a configuration directory.

use hearth_core::{
    CheckOptions, ConfigChecker, ErrorCategory, InMemoryIssueRegistry, IntegrationRegistry,
    PipelineError, check_config,
};
use std::sync::Arc;
use tempfile::TempDir;

const MANIFEST: &str = r#"
http:
  documentation: https://hearth.dev/integrations/http
  config_schema:
    object:
      closed: false
      properties:
        http:
          object:
            properties:
              server_port:
                schema: integer
                default: 8123
              api_password: string
light:
  platform_schema:
    object:
      closed: false
      properties:
        platform: string
hue:
  documentation: https://hearth.dev/integrations/hue
  platforms:
    light:
      schema:
        object:
          closed: false
          properties:
            host: string
          required: [host]
zwave:
  missing_requirements: [zwave-js==1.0]
"#;

fn registry() -> Arc<IntegrationRegistry> {
    let yaml = hearth_yaml::parse_file(MANIFEST, "integrations.yaml").unwrap();
    Arc::new(IntegrationRegistry::from_manifest(&yaml).unwrap())
}

fn config_dir(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
    dir
}

#[tokio::test]
async fn valid_directory() {
    let dir = config_dir(&[
        (
            "configuration.yaml",
            r#"core:
  name: Home
  country: NL
  currency: EUR
  packages:
    lights: !include packages/lights.yaml
http:
  api_password: !secret http_password
light:
  - platform: hue
    host: 10.0.0.2
"#,
        ),
        ("packages/lights.yaml", "light:\n  - platform: hue\n    host: 10.0.0.3\n"),
        ("secrets.yaml", "http_password: hunter2\n"),
    ]);

    let issues = Arc::new(InMemoryIssueRegistry::new());
    let result = ConfigChecker::new(registry())
        .with_issue_registry(issues.clone())
        .check_dir(dir.path())
        .await
        .unwrap();

    assert!(result.is_ok(), "{:#?}", result.diagnostics);
    assert!(issues.issues().is_empty());

    let core = result.core.as_ref().unwrap();
    assert_eq!(core.config.location_name.as_deref(), Some("Home"));

    let config = result.validated_config();
    let hosts: Vec<&str> = config
        .get("light")
        .and_then(|light| light.as_array())
        .unwrap()
        .iter()
        .filter_map(|entry| entry.get("host").and_then(|host| host.as_str()))
        .collect();
    assert_eq!(hosts, vec!["10.0.0.2", "10.0.0.3"]);

    let http = config.get("http").unwrap();
    assert_eq!(http.get("server_port").and_then(|p| p.as_i64()), Some(8123));
    assert_eq!(http.get("api_password").and_then(|p| p.as_str()), Some("hunter2"));
}

#[tokio::test]
async fn failures_are_collected_per_domain() {
    let dir = config_dir(&[(
        "configuration.yaml",
        r#"core:
  country: NL
http:
  server_port: many
light:
  - platform: hue
  - platform: hue
    host: 10.0.0.2
zwave:
  usb_path: /dev/ttyACM0
"#,
    )]);

    let result = ConfigChecker::new(registry())
        .check_dir(dir.path())
        .await
        .unwrap();

    assert!(!result.is_ok());
    assert!(result.domains["http"].config.is_none());
    assert_eq!(
        result.domains["zwave"].failures[0].category,
        ErrorCategory::ComponentImportErr
    );

    let light = &result.domains["light"];
    assert_eq!(light.failures.len(), 1);
    let entries = light
        .config
        .as_ref()
        .and_then(|config| config.get("light"))
        .and_then(|light| light.as_array())
        .unwrap();
    assert_eq!(entries.len(), 1);

    let mut problems: Vec<String> = result
        .diagnostics
        .iter()
        .filter_map(|d| d.problem.as_ref().map(|p| p.as_str().to_string()))
        .collect();
    problems.sort();
    insta::assert_debug_snapshot!(problems, @r#"
    [
        "Invalid config for 'http' at configuration.yaml, line 4: expected int for dictionary value 'http->server_port', got 'many', please check the docs at https://hearth.dev/integrations/http",
        "Invalid config for 'light.hue' at configuration.yaml, line 6: required key 'host' not provided, please check the docs at https://hearth.dev/integrations/hue",
        "Unable to import zwave: Requirements for zwave not found: ['zwave-js==1.0'].",
    ]
    "#);
}

#[tokio::test]
async fn raise_on_failure_returns_first_failing_domain() {
    let dir = config_dir(&[(
        "configuration.yaml",
        "http:\n  server_port: many\nzwave: {}\n",
    )]);

    let err = ConfigChecker::new(registry())
        .with_options(CheckOptions {
            raise_on_failure: true,
            skip_core: true,
            ..CheckOptions::default()
        })
        .check_dir(dir.path())
        .await
        .unwrap_err();

    let PipelineError::Validation(err) = err else {
        panic!("expected a validation error, got {err:?}");
    };
    assert_eq!(err.translation_key, ErrorCategory::ConfigValidationErr);
    assert_eq!(err.placeholders.get("domain").map(String::as_str), Some("http"));
}

#[tokio::test]
async fn malformed_packages_abort_the_check() {
    let dir = config_dir(&[(
        "configuration.yaml",
        "core:\n  packages:\n    Bad Name:\n      light: []\n",
    )]);

    let err = ConfigChecker::new(registry())
        .check_dir(dir.path())
        .await
        .unwrap_err();
    let diagnostic = err.to_diagnostic();
    assert!(matches!(err, PipelineError::Packages { .. }));
    assert_eq!(diagnostic.code.as_deref(), Some("H-2-2"));
}

#[tokio::test]
async fn invalid_core_is_reported() {
    let dir = config_dir(&[(
        "configuration.yaml",
        "core:\n  latitude: 120\n  country: NL\nhttp: {}\n",
    )]);

    let result = ConfigChecker::new(registry())
        .check_dir(dir.path())
        .await
        .unwrap();

    assert!(result.core.is_none());
    assert!(result.core_errors.is_some());
    assert_eq!(result.diagnostics[0].code.as_deref(), Some("H-4-1"));
    assert!(result.domains["http"].failures.is_empty());
}

#[tokio::test]
async fn missing_secret_fails_loading() {
    let dir = config_dir(&[("configuration.yaml", "http:\n  api_password: !secret nope\n")]);

    let err = check_config(dir.path(), registry(), CheckOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Secret nope not defined");
    assert_eq!(err.to_diagnostic().code.as_deref(), Some("H-1-3"));
}
