//! The complete check of a configuration directory.
//!
//! Stages run in a fixed order: load the document, merge packages into it,
//! process the core section, then validate every configured domain. Domains
//! are validated concurrently against one shared snapshot of the merged
//! document; merging is finished before the first domain starts.

use crate::consts::{CORE_KEY, PACKAGES_KEY};
use crate::core_section::{CoreOutcome, process_core_config};
use crate::document::{DocumentError, DocumentLoader};
use crate::failure::{ConfigFailure, ErrorCategory, IntegrationConfigInfo};
use crate::integration::IntegrationLoader;
use crate::issues::{InMemoryIssueRegistry, IssueRegistry};
use crate::options::CheckOptions;
use crate::packages::{PackageFailure, PackagesInvalid, merge_packages};
use crate::platforms::{domain_of, extract_domain_configs};
use crate::report::{
    ConfigValidationError, core_invalid_diagnostic, failure_diagnostic, handle_component_errors,
    package_failure_diagnostic, packages_invalid_diagnostic,
};
use crate::validate::process_component_config;
use futures::stream::{self, StreamExt};
use hearth_config::{ConfigMapEntry, ConfigValue};
use hearth_error_reporting::{DiagnosticKind, DiagnosticMessage, DiagnosticMessageBuilder};
use hearth_schema::Invalid;
use indexmap::{IndexMap, IndexSet};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The packages block is malformed; nothing was merged.
    #[error("{source}")]
    Packages {
        #[source]
        source: PackagesInvalid,
        diagnostic: Box<DiagnosticMessage>,
    },

    /// Raised only with `raise_on_failure`.
    #[error("Invalid config for 'core'")]
    Core {
        invalid: Invalid,
        diagnostic: Box<DiagnosticMessage>,
    },

    /// The first failing domain, raised only with `raise_on_failure`.
    #[error(transparent)]
    Validation(#[from] ConfigValidationError),
}

impl PipelineError {
    pub fn to_diagnostic(&self) -> DiagnosticMessage {
        match self {
            PipelineError::Document(err) => err.to_diagnostic(),
            PipelineError::Packages { diagnostic, .. } | PipelineError::Core { diagnostic, .. } => {
                (**diagnostic).clone()
            }
            PipelineError::Validation(err) => {
                let code = err.translation_key.code();
                DiagnosticMessageBuilder::error(crate::report::catalog_title(code))
                    .with_code(code)
                    .problem(err.message.clone())
                    .build()
            }
        }
    }
}

/// Validation result of one domain.
#[derive(Debug, Clone)]
pub struct DomainResult {
    pub domain: String,

    /// The domain's top-level keys in validated form, or `None` when the
    /// domain failed as a whole
    pub config: Option<ConfigValue>,

    pub failures: Vec<ConfigFailure>,
}

/// Everything a check found.
#[derive(Debug, Clone, Default)]
pub struct CheckResult {
    /// The document after merging packages
    pub document: ConfigValue,

    pub package_failures: Vec<PackageFailure>,

    pub core: Option<CoreOutcome>,

    /// Core section errors, relative to the section
    pub core_errors: Option<Invalid>,

    /// Per domain, in document order
    pub domains: IndexMap<String, DomainResult>,

    /// Domains not validated because the check was cancelled
    pub skipped: Vec<String>,

    /// Every problem found, in the order it was found
    pub diagnostics: Vec<DiagnosticMessage>,
}

impl CheckResult {
    pub fn is_ok(&self) -> bool {
        !self
            .diagnostics
            .iter()
            .any(|diagnostic| diagnostic.kind == DiagnosticKind::Error)
    }

    /// All domain failures, domain by domain.
    pub fn failures(&self) -> impl Iterator<Item = &ConfigFailure> {
        self.domains.values().flat_map(|result| result.failures.iter())
    }

    /// The validated configuration: core section and every domain that did
    /// not fail as a whole.
    pub fn validated_config(&self) -> ConfigValue {
        let mut config = ConfigValue::empty_map();
        if let Some(core) = self.document.get(CORE_KEY) {
            if self.core_errors.is_none() {
                config.insert(CORE_KEY, core.clone());
            }
        }
        for result in self.domains.values() {
            let Some(entries) = result.config.as_ref().and_then(ConfigValue::as_map) else {
                continue;
            };
            for (key, entry) in entries {
                config.insert(key.clone(), entry.value.clone());
            }
        }
        config
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "valid": self.is_ok(),
            "config": self.validated_config().to_json(),
            "core": self.core.as_ref().map(|core| serde_json::to_value(&core.config).unwrap_or_default()),
            "skipped": self.skipped,
            "diagnostics": self.diagnostics.iter().map(DiagnosticMessage::to_json).collect::<Vec<_>>(),
        })
    }
}

enum DomainOutcome {
    Checked(String, IntegrationConfigInfo),
    Skipped(String),
}

/// Runs checks against one integration loader.
pub struct ConfigChecker {
    loader: Arc<dyn IntegrationLoader>,
    issues: Arc<dyn IssueRegistry>,
    options: CheckOptions,
    cancellation: CancellationToken,
}

impl ConfigChecker {
    pub fn new(loader: Arc<dyn IntegrationLoader>) -> Self {
        Self {
            loader,
            issues: Arc::new(InMemoryIssueRegistry::new()),
            options: CheckOptions::default(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_options(mut self, options: CheckOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_issue_registry(mut self, issues: Arc<dyn IssueRegistry>) -> Self {
        self.issues = issues;
        self
    }

    /// Once `token` is cancelled, domains that have not started are skipped.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }

    /// Load and check the configuration of `config_dir`.
    pub async fn check_dir(&self, config_dir: &Path) -> Result<CheckResult, PipelineError> {
        let loaded = DocumentLoader::new(config_dir).load()?;
        let mut result = self.check_document(loaded.document, config_dir).await?;
        let mut diagnostics = loaded.warnings;
        diagnostics.append(&mut result.diagnostics);
        result.diagnostics = diagnostics;
        Ok(result)
    }

    /// Check an already loaded document. `config_dir` anchors relative
    /// directories of the core section.
    pub async fn check_document(
        &self,
        document: ConfigValue,
        config_dir: &Path,
    ) -> Result<CheckResult, PipelineError> {
        let max_len = self.options.max_value_length;
        let mut result = CheckResult::default();

        let packages = document
            .get(CORE_KEY)
            .and_then(|core| core.get(PACKAGES_KEY))
            .cloned()
            .unwrap_or_else(ConfigValue::null);
        let merged = match merge_packages(document.clone(), &packages, self.loader.as_ref()).await {
            Ok(merged) => merged,
            Err(source) => {
                let diagnostic = packages_invalid_diagnostic(&document, &source.invalid, max_len);
                tracing::error!("{}", source);
                return Err(PipelineError::Packages {
                    source,
                    diagnostic: Box::new(diagnostic),
                });
            }
        };
        result
            .diagnostics
            .extend(merged.failures.iter().map(package_failure_diagnostic));
        result.package_failures = merged.failures;
        result.document = merged.document;

        if !self.options.skip_core {
            let core = result.document.get(CORE_KEY).cloned().unwrap_or_else(ConfigValue::null);
            match process_core_config(&core, config_dir, self.issues.as_ref()) {
                Ok(outcome) => {
                    result.diagnostics.extend(outcome.warnings.iter().cloned());
                    result.core = Some(outcome);
                }
                Err(invalid) => {
                    let diagnostic = core_invalid_diagnostic(&result.document, &invalid, max_len);
                    tracing::error!("{}", diagnostic.problem.as_ref().map_or("", |p| p.as_str()));
                    if self.options.raise_on_failure {
                        return Err(PipelineError::Core {
                            invalid,
                            diagnostic: Box::new(diagnostic),
                        });
                    }
                    result.diagnostics.push(diagnostic);
                    result.core_errors = Some(invalid);
                }
            }
        }

        let domains = configured_domains(&result.document);
        let snapshot = Arc::new(result.document.clone());
        let outcomes: Vec<DomainOutcome> = stream::iter(domains)
            .map(|domain| self.check_domain(domain, Arc::clone(&snapshot)))
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await;

        let mut first_error = None;
        for outcome in outcomes {
            let (domain, info) = match outcome {
                DomainOutcome::Checked(domain, info) => (domain, info),
                DomainOutcome::Skipped(domain) => {
                    result.skipped.push(domain);
                    continue;
                }
            };
            result.diagnostics.extend(
                info.failures
                    .iter()
                    .map(|failure| failure_diagnostic(&domain, failure, max_len)),
            );
            let failures = info.failures.clone();
            let config = match handle_component_errors(&domain, info, self.options.raise_on_failure, max_len) {
                Ok(config) => config,
                Err(err) => {
                    first_error.get_or_insert(err);
                    None
                }
            };
            result.domains.insert(
                domain.clone(),
                DomainResult {
                    config: config.map(|config| domain_section(&config, &domain)),
                    domain,
                    failures,
                },
            );
        }

        if !result.skipped.is_empty() {
            tracing::warn!(skipped = result.skipped.len(), "check cancelled, remaining domains skipped");
        }

        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(result),
        }
    }

    async fn check_domain(&self, domain: String, snapshot: Arc<ConfigValue>) -> DomainOutcome {
        if self.cancellation.is_cancelled() {
            return DomainOutcome::Skipped(domain);
        }
        tracing::debug!(domain = %domain, "validating domain");
        let info = match self.loader.resolve(&domain).await {
            Ok(integration) => {
                process_component_config(&snapshot, &integration, self.loader.as_ref()).await
            }
            Err(err) => IntegrationConfigInfo::failed(ConfigFailure::new(
                err,
                ErrorCategory::ComponentImportErr,
                domain.as_str(),
                (*snapshot).clone(),
            )),
        };
        DomainOutcome::Checked(domain, info)
    }
}

/// Check the configuration of `config_dir` with a fresh [`ConfigChecker`].
pub async fn check_config(
    config_dir: &Path,
    loader: Arc<dyn IntegrationLoader>,
    options: CheckOptions,
) -> Result<CheckResult, PipelineError> {
    ConfigChecker::new(loader)
        .with_options(options)
        .check_dir(config_dir)
        .await
}

/// Domains with configuration in `document`, in order of first appearance.
pub fn configured_domains(document: &ConfigValue) -> IndexSet<String> {
    document
        .as_map()
        .map(|entries| {
            entries
                .keys()
                .map(|key| domain_of(key))
                .filter(|domain| *domain != CORE_KEY)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// The top-level keys of `config` addressed to `domain`.
fn domain_section(config: &ConfigValue, domain: &str) -> ConfigValue {
    let entries = extract_domain_configs(config, domain)
        .into_iter()
        .filter_map(|key| {
            let value = config.get(key)?.clone();
            let entry = ConfigMapEntry::new(value).with_key_source(config.key_source(key).cloned());
            Some((key.to_string(), entry))
        })
        .collect();
    ConfigValue::new_map(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::{Component, Integration, IntegrationRegistry};
    use hearth_schema::Schema;

    fn doc(src: &str) -> ConfigValue {
        let yaml = hearth_yaml::parse_file(src, "configuration.yaml").unwrap();
        hearth_config::config_value_from_yaml(yaml, &mut Vec::new())
    }

    fn sensor_schema() -> Arc<Schema> {
        let yaml = hearth_yaml::parse(
            "object:\n  closed: false\n  properties:\n    sensor:\n      object:\n        properties:\n          threshold: integer\n",
        )
        .unwrap();
        Arc::new(Schema::from_yaml(&yaml).unwrap())
    }

    fn checker(options: CheckOptions) -> ConfigChecker {
        let registry = IntegrationRegistry::new()
            .with(Integration::new("sensor").with_component(
                Component::default().with_config_schema(sensor_schema()),
            ))
            .with(Integration::new("http"));
        ConfigChecker::new(Arc::new(registry)).with_options(CheckOptions {
            skip_core: true,
            ..options
        })
    }

    #[test]
    fn test_configured_domains() {
        let document = doc("core: {}\nlight: []\nsensor: {}\nlight kitchen: []\n");
        let domains: Vec<String> = configured_domains(&document).into_iter().collect();
        assert_eq!(domains, vec!["light", "sensor"]);
    }

    #[tokio::test]
    async fn test_failures_are_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let result = checker(CheckOptions::default())
            .check_document(doc("sensor:\n  threshold: high\nhttp:\n  port: 80\n"), dir.path())
            .await
            .unwrap();

        assert!(!result.is_ok());
        assert!(result.domains["sensor"].config.is_none());
        assert_eq!(result.domains["sensor"].failures.len(), 1);
        let http = result.domains["http"].config.as_ref().unwrap();
        assert_eq!(http.get_path(&["http".into(), "port".into()]).and_then(ConfigValue::as_i64), Some(80));
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code.as_deref(), Some("H-3-3"));
    }

    #[tokio::test]
    async fn test_raise_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = checker(CheckOptions {
            raise_on_failure: true,
            ..CheckOptions::default()
        })
        .check_document(doc("sensor:\n  threshold: high\n"), dir.path())
        .await
        .unwrap_err();
        let PipelineError::Validation(err) = err else {
            panic!("expected a validation error, got {err:?}");
        };
        assert_eq!(err.translation_key, ErrorCategory::ConfigValidationErr);
    }

    #[tokio::test]
    async fn test_unknown_domain_fails_alone() {
        let dir = tempfile::tempdir().unwrap();
        let result = checker(CheckOptions::default())
            .check_document(doc("frobnicator:\n  a: 1\nhttp: {}\n"), dir.path())
            .await
            .unwrap();
        let failure = &result.domains["frobnicator"].failures[0];
        assert_eq!(failure.category, ErrorCategory::ComponentImportErr);
        assert!(result.domains["http"].failures.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_check_skips_domains() {
        let dir = tempfile::tempdir().unwrap();
        let token = CancellationToken::new();
        token.cancel();
        let result = checker(CheckOptions::default())
            .with_cancellation(token)
            .check_document(doc("sensor: {}\nhttp: {}\n"), dir.path())
            .await
            .unwrap();
        assert_eq!(result.skipped, vec!["sensor", "http"]);
        assert!(result.domains.is_empty());
    }
}
