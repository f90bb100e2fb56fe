//! Configuration checking for hearth.
//!
//! This crate takes a loaded configuration document and:
//!
//! 1. folds the fragments of every package under `core: packages:` into the
//!    document ([`packages`]), accumulating each domain as a list or as a
//!    recursively merged mapping ([`policy`]);
//! 2. validates and applies the `core` section ([`core_section`]);
//! 3. validates every configured domain with whatever its integration
//!    declares ([`validate`]), collecting failures per domain and per
//!    platform entry instead of stopping at the first one;
//! 4. renders failures as messages that name the file and line the
//!    offending value was written at ([`report`]).
//!
//! [`pipeline::ConfigChecker`] runs all of it against a configuration
//! directory. Integrations are supplied through the
//! [`integration::IntegrationLoader`] trait; [`IntegrationRegistry`] is an
//! in-memory loader that can be built from a YAML manifest.

pub mod consts;
pub mod core_section;
pub mod document;
pub mod failure;
pub mod integration;
pub mod issues;
pub mod options;
pub mod packages;
pub mod pipeline;
pub mod platforms;
pub mod policy;
pub mod report;
pub mod validate;

pub use core_section::{CoreConfig, CoreConfigSchema, CoreOutcome, process_core_config};
pub use document::{DocumentError, DocumentLoader, LoadedDocument, load_config_file};
pub use failure::{ConfigFailure, ErrorCategory, FailureCause, IntegrationConfigInfo};
pub use integration::{
    Component, ConfigPlatform, ConfigValidator, Integration, IntegrationLoader, IntegrationRegistry,
    LoadError, ManifestError, Platform, ValidatorError,
};
pub use issues::{InMemoryIssueRegistry, Issue, IssueRegistry, IssueSeverity};
pub use options::CheckOptions;
pub use packages::{MergedDocument, PackageFailure, PackagesInvalid, merge_packages};
pub use pipeline::{CheckResult, ConfigChecker, DomainResult, PipelineError, check_config};
pub use policy::merge_policy_for;
pub use report::{ConfigValidationError, handle_component_errors};
pub use validate::process_component_config;
