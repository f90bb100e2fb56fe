//! Per-domain validation dispatch.
//!
//! The strategy is picked from what the integration declares, in order: a
//! config platform with a custom validator, a whole-document schema, a
//! platform-entry schema. A domain declaring none of them passes through
//! unchanged. Only platform-entry validation can partially succeed: a failing
//! entry is dropped and its siblings are kept.

use crate::failure::{ConfigFailure, ErrorCategory, FailureCause, IntegrationConfigInfo};
use crate::integration::{Integration, IntegrationLoader};
use crate::platforms::{PlatformEntry, config_per_platform, config_without_domain, extract_domain_configs};
use futures::future::join_all;
use hearth_config::{ConfigMapEntry, ConfigValue};
use hearth_schema::{ConfigSchema, SchemaFailure};

/// Validate the configuration addressed to the integration's domain.
///
/// `config` is the whole merged document. The returned config is the whole
/// document as well, with the domain's part replaced by its validated form.
pub async fn process_component_config(
    config: &ConfigValue,
    integration: &Integration,
    loader: &dyn IntegrationLoader,
) -> IntegrationConfigInfo {
    let domain = integration.domain.as_str();
    let link = integration.documentation.clone();
    let domain_failure = |cause: FailureCause, category: ErrorCategory| {
        IntegrationConfigInfo::failed(
            ConfigFailure::new(cause, category, domain, config.clone()).with_link(link.clone()),
        )
    };

    let component = match integration.component() {
        Ok(component) => component,
        Err(err) => return domain_failure(err.into(), ErrorCategory::ComponentImportErr),
    };

    let config_platform = match integration.config_platform() {
        Ok(config_platform) => config_platform,
        Err(err) => return domain_failure(err.into(), ErrorCategory::ConfigPlatformImportErr),
    };

    if let Some(validator) = config_platform.and_then(|p| p.validator.as_ref()) {
        tracing::debug!(domain, "validating with config platform");
        return match validator.validate_config(config).await {
            Ok(validated) => IntegrationConfigInfo::ok(validated),
            Err(err) => {
                let cause = FailureCause::from(err);
                let category = match cause {
                    FailureCause::Invalid(_) | FailureCause::Rejected(_) => {
                        ErrorCategory::ConfigValidationErr
                    }
                    _ => ErrorCategory::ConfigValidatorUnknownErr,
                };
                domain_failure(cause, category)
            }
        };
    }

    if let Some(schema) = &component.config_schema {
        tracing::debug!(domain, "validating with config schema");
        return match schema.validate(config) {
            Ok(validated) => IntegrationConfigInfo::ok(validated),
            Err(SchemaFailure::Invalid(invalid)) => {
                domain_failure(FailureCause::Invalid(invalid), ErrorCategory::ConfigValidationErr)
            }
            Err(SchemaFailure::Unexpected(err)) => {
                domain_failure(FailureCause::unexpected(err), ErrorCategory::ConfigSchemaUnknownErr)
            }
        };
    }

    let Some(platform_schema) = &component.platform_schema else {
        return IntegrationConfigInfo::ok(config.clone());
    };

    let entries = config_per_platform(config, domain);
    tracing::debug!(domain, entries = entries.len(), "validating platform entries");
    let outcomes = join_all(
        entries
            .into_iter()
            .map(|entry| validate_entry(entry, integration, &**platform_schema, loader)),
    )
    .await;

    let mut platforms = Vec::new();
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(validated) => platforms.push(validated),
            Err(failure) => failures.push(failure),
        }
    }

    let key_source = extract_domain_configs(config, domain)
        .first()
        .and_then(|key| config.key_source(key))
        .cloned();
    let mut output = config_without_domain(config, domain);
    if let Some(entries) = output.as_map_mut() {
        entries.insert(
            domain.to_string(),
            ConfigMapEntry::new(ConfigValue::new_array(platforms)).with_key_source(key_source),
        );
    }

    IntegrationConfigInfo {
        config: Some(output),
        failures,
    }
}

/// Validate one platform entry: first against the domain's platform schema,
/// then against the schema of the platform the entry names.
async fn validate_entry(
    entry: PlatformEntry,
    integration: &Integration,
    platform_schema: &dyn ConfigSchema,
    loader: &dyn IntegrationLoader,
) -> Result<ConfigValue, ConfigFailure> {
    let domain = integration.domain.as_str();
    let PlatformEntry { platform, config } = entry;
    let failure = |cause: FailureCause, category: ErrorCategory, link: Option<String>| {
        ConfigFailure::new(cause, category, domain, config.clone())
            .with_platform(platform.clone())
            .with_link(link)
    };
    let schema_failure = |err: SchemaFailure, link: Option<String>| match err {
        SchemaFailure::Invalid(invalid) => failure(
            FailureCause::Invalid(invalid),
            ErrorCategory::PlatformConfigValidationErr,
            link,
        ),
        SchemaFailure::Unexpected(err) => failure(
            FailureCause::unexpected(err),
            ErrorCategory::PlatformSchemaValidatorErr,
            link,
        ),
    };

    let validated = platform_schema
        .validate(&config)
        .map_err(|err| schema_failure(err, integration.documentation.clone()))?;

    // Entries without a platform name are kept as validated by the domain.
    let Some(platform_name) = platform.as_deref() else {
        return Ok(validated);
    };

    let platform_integration = loader.resolve(platform_name).await.map_err(|err| {
        failure(
            err.into(),
            ErrorCategory::PlatformComponentLoadErr,
            integration.documentation.clone(),
        )
    })?;

    let provided = platform_integration.platform(domain).map_err(|err| {
        failure(
            err.into(),
            ErrorCategory::PlatformComponentLoadExc,
            integration.documentation.clone(),
        )
    })?;

    match &provided.schema {
        Some(schema) => schema
            .validate(&config)
            .map_err(|err| schema_failure(err, platform_integration.documentation.clone())),
        None => Ok(validated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::{Component, ConfigPlatform, IntegrationRegistry, LoadError, Platform};
    use crate::integration::{ConfigValidator, ValidatorError};
    use async_trait::async_trait;
    use hearth_config::config_value_from_yaml;
    use hearth_schema::Schema;
    use std::sync::Arc;

    fn load(src: &str) -> ConfigValue {
        let yaml = hearth_yaml::parse_file(src, "configuration.yaml").unwrap();
        config_value_from_yaml(yaml, &mut Vec::new())
    }

    fn schema(src: &str) -> Arc<Schema> {
        Arc::new(Schema::from_yaml(&hearth_yaml::parse(src).unwrap()).unwrap())
    }

    struct Exploding;

    impl ConfigSchema for Exploding {
        fn validate(&self, _config: &ConfigValue) -> Result<ConfigValue, SchemaFailure> {
            Err(SchemaFailure::Unexpected(anyhow::anyhow!("division by zero")))
        }
    }

    struct Rejecting;

    #[async_trait]
    impl ConfigValidator for Rejecting {
        async fn validate_config(&self, _config: &ConfigValue) -> Result<ConfigValue, ValidatorError> {
            Err(ValidatorError::Rejected("unknown entity".into()))
        }
    }

    struct Crashing;

    #[async_trait]
    impl ConfigValidator for Crashing {
        async fn validate_config(&self, _config: &ConfigValue) -> Result<ConfigValue, ValidatorError> {
            Err(ValidatorError::Unexpected(anyhow::anyhow!("connection reset")))
        }
    }

    fn light() -> Integration {
        Integration::new("light").with_component(
            Component::default()
                .with_platform_schema(schema("object: {closed: false, properties: {platform: string}}")),
        )
    }

    fn registry() -> IntegrationRegistry {
        let strict = schema("object: {properties: {platform: string, host: string}, required: [host]}");
        IntegrationRegistry::new()
            .with(light())
            .with(Integration::new("a").with_platform("light", Platform { schema: Some(strict.clone()) }))
            .with(
                Integration::new("b")
                    .with_documentation("https://hearth.dev/integrations/b")
                    .with_platform("light", Platform { schema: Some(strict) }),
            )
            .with(Integration::new("c").with_platform("light", Platform::default()))
            .with(Integration::new("e").with_platform("light", Platform { schema: Some(Arc::new(Exploding)) }))
            .with(
                Integration::new("d")
                    .with_platform_error("light", LoadError::Import("cannot import light".into())),
            )
    }

    #[tokio::test]
    async fn test_bad_entry_dropped_siblings_kept() {
        let config = load(
            r#"
light:
  - platform: a
    host: 10.0.0.2
  - platform: b
  - platform: c
light kitchen:
  platform: missing
sensor: {}
"#,
        );
        let info = process_component_config(&config, &light(), &registry()).await;

        let output = info.config.unwrap();
        let platforms: Vec<_> = output
            .get("light")
            .and_then(ConfigValue::as_array)
            .unwrap()
            .iter()
            .filter_map(|e| e.get("platform").and_then(ConfigValue::as_str))
            .collect();
        assert_eq!(platforms, vec!["a", "c"]);
        assert!(output.get("light kitchen").is_none());
        assert!(output.get("sensor").is_some());

        let categories: Vec<_> = info.failures.iter().map(|f| (f.category, f.subject())).collect();
        assert_eq!(
            categories,
            vec![
                (ErrorCategory::PlatformConfigValidationErr, "light.b".to_string()),
                (ErrorCategory::PlatformComponentLoadErr, "light.missing".to_string()),
            ]
        );
        assert_eq!(
            info.failures[0].integration_link.as_deref(),
            Some("https://hearth.dev/integrations/b")
        );
    }

    #[tokio::test]
    async fn test_platform_load_exception() {
        let config = load("light:\n  - platform: d\n");
        let info = process_component_config(&config, &light(), &registry()).await;
        assert_eq!(info.failures.len(), 1);
        assert_eq!(info.failures[0].category, ErrorCategory::PlatformComponentLoadExc);
        assert_eq!(info.failures[0].cause.to_string(), "cannot import light");
    }

    #[tokio::test]
    async fn test_entry_without_platform_skips_lookup() {
        let config = load("light:\n  - name: porch\n");
        let info = process_component_config(&config, &light(), &registry()).await;
        assert!(info.failures.is_empty());
        assert_eq!(info.config.unwrap().get("light").and_then(ConfigValue::as_array).map(<[_]>::len), Some(1));
    }

    #[tokio::test]
    async fn test_whole_schema_missing_key() {
        let integration = Integration::new("foo").with_component(Component::default().with_config_schema(
            schema("object: {closed: false, properties: {foo: {object: {properties: {bar: string}, required: [bar]}}}}"),
        ));
        let config = load("foo:\n  baz: 1\n");
        let info = process_component_config(&config, &integration, &registry()).await;
        assert!(info.config.is_none());
        assert_eq!(info.failures.len(), 1);
        assert_eq!(info.failures[0].category, ErrorCategory::ConfigValidationErr);
        assert!(info.failures[0].cause.is_invalid());
    }

    #[tokio::test]
    async fn test_whole_schema_unexpected_error() {
        let integration = Integration::new("foo")
            .with_component(Component::default().with_config_schema(Arc::new(Exploding)));
        let info = process_component_config(&load("foo: 1\n"), &integration, &registry()).await;
        assert_eq!(info.failures[0].category, ErrorCategory::ConfigSchemaUnknownErr);
    }

    #[tokio::test]
    async fn test_custom_validator_unexpected_error() {
        let integration = Integration::new("automation").with_config_platform(ConfigPlatform {
            validator: Some(Arc::new(Crashing)),
            merge_hint: None,
        });
        let info = process_component_config(&load("automation: []\n"), &integration, &registry()).await;
        assert!(info.config.is_none());
        assert_eq!(info.failures.len(), 1);
        assert_eq!(info.failures[0].category, ErrorCategory::ConfigValidatorUnknownErr);
    }

    #[tokio::test]
    async fn test_platform_schema_unexpected_error_keeps_siblings() {
        let config = load(
            r#"
light:
  - platform: a
    host: 10.0.0.2
  - platform: e
  - platform: c
"#,
        );
        let info = process_component_config(&config, &light(), &registry()).await;

        let platforms: Vec<_> = info
            .config
            .as_ref()
            .and_then(|c| c.get("light"))
            .and_then(ConfigValue::as_array)
            .unwrap()
            .iter()
            .filter_map(|e| e.get("platform").and_then(ConfigValue::as_str))
            .collect();
        assert_eq!(platforms, vec!["a", "c"]);

        assert_eq!(info.failures.len(), 1);
        assert_eq!(info.failures[0].category, ErrorCategory::PlatformSchemaValidatorErr);
        assert_eq!(info.failures[0].platform.as_deref(), Some("e"));
    }

    #[tokio::test]
    async fn test_custom_validator_takes_priority() {
        let integration = Integration::new("automation")
            .with_component(Component::default().with_config_schema(Arc::new(Exploding)))
            .with_config_platform(ConfigPlatform {
                validator: Some(Arc::new(Rejecting)),
                merge_hint: None,
            });
        let info = process_component_config(&load("automation: []\n"), &integration, &registry()).await;
        assert_eq!(info.failures[0].category, ErrorCategory::ConfigValidationErr);
        assert_eq!(info.failures[0].cause.to_string(), "unknown entity");
    }

    #[tokio::test]
    async fn test_import_failures() {
        let config = load("foo: 1\n");
        let broken = Integration::new("foo").with_component_error(LoadError::Import("boom".into()));
        let info = process_component_config(&config, &broken, &registry()).await;
        assert_eq!(info.failures[0].category, ErrorCategory::ComponentImportErr);

        let broken_platform =
            Integration::new("foo").with_config_platform_error(LoadError::Import("boom".into()));
        let info = process_component_config(&config, &broken_platform, &registry()).await;
        assert_eq!(info.failures[0].category, ErrorCategory::ConfigPlatformImportErr);
    }

    #[tokio::test]
    async fn test_passthrough() {
        let config = load("foo:\n  anything: [1, 2]\n");
        let info = process_component_config(&config, &Integration::new("foo"), &registry()).await;
        assert!(info.failures.is_empty());
        assert_eq!(info.config, Some(config));
    }

    #[tokio::test]
    async fn test_whole_schema_is_idempotent() {
        let integration = Integration::new("weather").with_component(Component::default().with_config_schema(
            schema(
                r#"
object:
  closed: false
  properties:
    weather:
      object:
        properties:
          api_key: string
          interval:
            schema: {integer: {minimum: 60}}
            default: 600
          units:
            ensureList: [metric, imperial]
"#,
            ),
        ));
        let config = load("weather:\n  api_key: abc\n  units: metric\n");
        let first = process_component_config(&config, &integration, &registry()).await;
        let once = first.config.unwrap();
        let second = process_component_config(&once, &integration, &registry()).await;
        assert!(second.failures.is_empty());
        assert_eq!(second.config.unwrap(), once);
    }
}
