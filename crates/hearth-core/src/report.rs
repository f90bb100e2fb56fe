//! Turning failures into messages an operator can act on.
//!
//! Validation messages name the domain, the file and line the offending
//! node was written at, the path to it and what was found there:
//!
//! ```text
//! Invalid config for 'sensor' at configuration.yaml, line 4: expected int for dictionary value 'sensor->threshold', got 'high', please check the docs at https://hearth.dev/integrations/sensor
//! ```

use crate::consts::CORE_KEY;
use crate::failure::{ConfigFailure, ErrorCategory, FailureCause, IntegrationConfigInfo};
use crate::packages::PackageFailure;
use hearth_config::{Annotation, ConfigPath, ConfigValue, PathSegment, find_annotation};
use hearth_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, get_error_info};
use hearth_schema::{Invalid, ValidationError, ValidationErrorKind};
use hearth_yaml::SourceInfo;
use std::collections::BTreeMap;
use thiserror::Error;

fn message_prefix(subject: &str, annotation: Option<&Annotation>) -> String {
    match annotation {
        Some(annotation) => format!("Invalid config for '{}' at {}", subject, annotation),
        None => format!("Invalid config for '{}'", subject),
    }
}

fn message_suffix(subject: &str, link: Option<&str>) -> String {
    match link {
        Some(link) if subject != CORE_KEY => format!(", please check the docs at {}", link),
        _ => String::new(),
    }
}

/// Cut `text` to `max_len` characters, ending in `...` when shortened.
fn truncate_repr(text: String, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text;
    }
    let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Render one structured validation error.
///
/// Unknown and missing keys get dedicated wording. Anything else quotes the
/// offending value, cut to `max_len` characters.
pub fn stringify_invalid(
    error: &ValidationError,
    subject: &str,
    config: &ConfigValue,
    link: Option<&str>,
    max_len: usize,
) -> String {
    let annotation = find_annotation(config, error.path.segments());
    let prefix = message_prefix(subject, annotation.as_ref());
    let suffix = message_suffix(subject, link);
    let last = error.path.last().map(PathSegment::to_string).unwrap_or_default();

    match &error.kind {
        ValidationErrorKind::ExtraKey => format!(
            "{}: '{}' is an invalid option for '{}', check: {}{}",
            prefix, last, subject, error.path, suffix
        ),
        ValidationErrorKind::MissingRequiredKey => {
            format!("{}: required key '{}' not provided{}", prefix, last, suffix)
        }
        _ => {
            let mut output = error.message();
            if let Some(error_type) = &error.error_type {
                output.push_str(" for ");
                output.push_str(error_type);
            }
            let offending = config
                .get_path(error.path.segments())
                .map_or_else(|| "null".to_string(), ConfigValue::to_string);
            format!(
                "{}: {} '{}', got {}{}",
                prefix,
                output,
                error.path,
                truncate_repr(offending, max_len),
                suffix
            )
        }
    }
}

/// Render every error of `invalid`, sorted, one per line.
pub fn humanize_error(
    invalid: &Invalid,
    subject: &str,
    config: &ConfigValue,
    link: Option<&str>,
    max_len: usize,
) -> String {
    let mut messages: Vec<String> = invalid
        .errors
        .iter()
        .map(|error| stringify_invalid(error, subject, config, link, max_len))
        .collect();
    messages.sort();
    messages.join("\n")
}

/// Render a failure that carries no path. It is located at the subject's
/// own key.
pub fn format_generic_error(
    message: &str,
    subject: &str,
    config: &ConfigValue,
    link: Option<&str>,
) -> String {
    let annotation = find_annotation(config, &[PathSegment::from(subject)]);
    format!(
        "{}: {}{}",
        message_prefix(subject, annotation.as_ref()),
        message,
        message_suffix(subject, link)
    )
}

/// Render a validation failure: structured errors through
/// [`humanize_error`], anything else through [`format_generic_error`].
pub fn format_failure(failure: &ConfigFailure, max_len: usize) -> String {
    let subject = failure.subject();
    let link = failure.integration_link.as_deref();
    match &failure.cause {
        FailureCause::Invalid(invalid) => {
            humanize_error(invalid, &subject, &failure.config, link, max_len)
        }
        other => format_generic_error(&other.to_string(), &subject, &failure.config, link),
    }
}

/// Where a failure is best located in the configuration.
pub fn failure_annotation(failure: &ConfigFailure) -> Option<Annotation> {
    match &failure.cause {
        FailureCause::Invalid(invalid) => {
            let path = invalid.errors.first().map(|e| e.path.clone()).unwrap_or_default();
            find_annotation(&failure.config, path.segments())
        }
        _ => find_annotation(&failure.config, &[PathSegment::from(failure.subject())]),
    }
}

/// How a failure is logged and, when raised, presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub message: String,

    /// Whether the log should carry the full error chain
    pub show_stack_trace: bool,

    /// Translation placeholders: `domain`, `error`, and `config_file` and
    /// `line` when the failure could be located
    pub placeholders: BTreeMap<String, String>,
}

/// Build the log message of `failure`, handled for `domain`.
pub fn log_message_and_stack_pref(domain: &str, failure: &ConfigFailure, max_len: usize) -> FailureReport {
    let error = failure.cause.to_string();
    let mut placeholders = BTreeMap::from([
        ("domain".to_string(), domain.to_string()),
        ("error".to_string(), error.clone()),
    ]);
    let platform = failure.platform.clone().unwrap_or_else(|| failure.subject());

    let fixed = match failure.category {
        ErrorCategory::ComponentImportErr => Some((format!("Unable to import {}: {}", domain, error), false)),
        ErrorCategory::ConfigPlatformImportErr => Some((
            format!("Error importing config platform {}: {}", domain, error),
            false,
        )),
        ErrorCategory::ConfigValidatorUnknownErr => Some((
            format!("Unknown error calling {} config validator", domain),
            true,
        )),
        ErrorCategory::ConfigSchemaUnknownErr => {
            Some((format!("Unknown error calling {} config schema", domain), true))
        }
        ErrorCategory::PlatformValidatorUnknownErr => Some((
            format!(
                "Unknown error validating {} platform config with {} component platform schema",
                platform, domain
            ),
            true,
        )),
        ErrorCategory::PlatformComponentLoadErr => {
            Some((format!("Platform error: {} - {}", domain, error), false))
        }
        ErrorCategory::PlatformComponentLoadExc => {
            Some((format!("Platform error: {} - {}", domain, error), true))
        }
        ErrorCategory::PlatformSchemaValidatorErr => Some((
            format!(
                "Unknown error validating config for {} platform for {} component with platform schema",
                platform, domain
            ),
            true,
        )),
        ErrorCategory::ConfigValidationErr
        | ErrorCategory::PlatformConfigValidationErr
        | ErrorCategory::IntegrationConfigError => None,
    };

    if let Some((message, show_stack_trace)) = fixed {
        return FailureReport {
            message,
            show_stack_trace,
            placeholders,
        };
    }

    if let Some(annotation) = failure_annotation(failure) {
        placeholders.insert("config_file".to_string(), annotation.file);
        placeholders.insert("line".to_string(), annotation.line.to_string());
    }
    FailureReport {
        message: format_failure(failure, max_len),
        show_stack_trace: !failure.cause.is_invalid(),
        placeholders,
    }
}

/// Raised for a domain whose configuration failed, when the caller asked
/// for failures to be raised.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ConfigValidationError {
    pub message: String,
    pub failures: Vec<ConfigFailure>,
    pub translation_key: ErrorCategory,
    pub placeholders: BTreeMap<String, String>,
}

/// Log every failure of `info` and return its config.
///
/// With `raise_on_failure`, a domain with failures is an error instead: a
/// single failure is raised as is, several are bundled into one
/// [`ErrorCategory::IntegrationConfigError`].
pub fn handle_component_errors(
    domain: &str,
    info: IntegrationConfigInfo,
    raise_on_failure: bool,
    max_len: usize,
) -> Result<Option<ConfigValue>, ConfigValidationError> {
    if info.failures.is_empty() {
        return Ok(info.config);
    }

    let mut last_report = None;
    for failure in &info.failures {
        let report = log_message_and_stack_pref(domain, failure, max_len);
        match (&failure.cause, report.show_stack_trace) {
            (FailureCause::Unexpected(err), true) => tracing::error!(
                domain,
                category = %failure.category,
                "{}: {:?}",
                report.message,
                err
            ),
            _ => tracing::error!(domain, category = %failure.category, "{}", report.message),
        }
        last_report = Some((failure.category, report));
    }

    if !raise_on_failure {
        return Ok(info.config);
    }

    let count = info.failures.len();
    let (translation_key, message, placeholders) = match last_report {
        Some((category, report)) if count == 1 => (category, report.message, report.placeholders),
        _ => (
            ErrorCategory::IntegrationConfigError,
            format!(
                "Failed to process component config for integration {} due to multiple errors ({}), check the logs for more information.",
                domain, count
            ),
            BTreeMap::from([
                ("domain".to_string(), domain.to_string()),
                ("errors".to_string(), count.to_string()),
            ]),
        ),
    };
    Err(ConfigValidationError {
        message,
        failures: info.failures,
        translation_key,
        placeholders,
    })
}

pub(crate) fn annotation_location(annotation: Option<Annotation>) -> Option<SourceInfo> {
    annotation.map(|a| SourceInfo::new(Some(a.file), 0, a.line, 1, 0))
}

pub(crate) fn catalog_title(code: &str) -> String {
    get_error_info(code)
        .map(|info| info.title.clone())
        .unwrap_or_else(|| "Invalid configuration".to_string())
}

/// Diagnostic for a domain validation failure.
pub fn failure_diagnostic(domain: &str, failure: &ConfigFailure, max_len: usize) -> DiagnosticMessage {
    let code = failure.category.code();
    let report = log_message_and_stack_pref(domain, failure, max_len);
    let mut builder = DiagnosticMessageBuilder::error(catalog_title(code))
        .with_code(code)
        .problem(report.message)
        .with_optional_location(annotation_location(failure_annotation(failure)));
    if let FailureCause::Unexpected(err) = &failure.cause {
        for cause in err.chain().skip(1) {
            builder = builder.add_info(cause.to_string());
        }
    }
    if let Some(link) = &failure.integration_link {
        builder = builder.add_hint(format!("Check the {} documentation at {}?", domain, link));
    }
    builder.build()
}

/// Diagnostic for a package fragment that could not be merged.
pub fn package_failure_diagnostic(failure: &PackageFailure) -> DiagnosticMessage {
    DiagnosticMessageBuilder::error(catalog_title("H-2-1"))
        .with_code("H-2-1")
        .problem(failure.to_string())
        .with_optional_location(annotation_location(failure.annotation.clone()))
        .build()
}

/// Diagnostic for a malformed packages block, one detail per error.
pub fn packages_invalid_diagnostic(document: &ConfigValue, invalid: &Invalid, max_len: usize) -> DiagnosticMessage {
    let packages_path = ConfigPath::from_keys([CORE_KEY, crate::consts::PACKAGES_KEY]);
    let mut builder = DiagnosticMessageBuilder::error(catalog_title("H-2-2"))
        .with_code("H-2-2")
        .problem(humanize_error(invalid, CORE_KEY, document, None, max_len))
        .with_optional_location(annotation_location(find_annotation(
            document,
            packages_path.segments(),
        )));
    for error in &invalid.errors {
        let location = annotation_location(find_annotation(document, error.path.segments()));
        builder = match location {
            Some(location) => builder.add_detail_at(error.to_string(), location),
            None => builder.add_detail(error.to_string()),
        };
    }
    builder.build()
}

/// Diagnostic for an invalid core section. `invalid` is relative to the
/// section, `document` is the whole configuration.
pub fn core_invalid_diagnostic(document: &ConfigValue, invalid: &Invalid, max_len: usize) -> DiagnosticMessage {
    let core_path = ConfigPath::from_keys([CORE_KEY]);
    let invalid = invalid.clone().prefixed(&core_path);
    DiagnosticMessageBuilder::error(catalog_title("H-4-1"))
        .with_code("H-4-1")
        .problem(humanize_error(&invalid, CORE_KEY, document, None, max_len))
        .with_optional_location(annotation_location(find_annotation(
            document,
            core_path.segments(),
        )))
        .build()
}
