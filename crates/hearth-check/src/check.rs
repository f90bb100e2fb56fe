//! The check command.
//!
//! Loads the integration manifest, runs the check over the configuration
//! directory and prints every diagnostic. Returns whether the configuration
//! is valid.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hearth_core::{CheckOptions, CheckResult, ConfigChecker, IntegrationRegistry};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Manifest looked up in the configuration directory when none is given.
const DEFAULT_MANIFEST: &str = "integrations.yaml";

#[derive(Debug)]
pub struct CheckArgs {
    pub config_dir: PathBuf,
    pub manifest: Option<PathBuf>,
    pub json: bool,
    pub strict: bool,
    pub concurrency: usize,
    pub skip_core: bool,
    pub timeout: Option<u64>,
}

pub fn execute(args: CheckArgs) -> Result<bool> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(run(args))
}

async fn run(args: CheckArgs) -> Result<bool> {
    if !args.config_dir.is_dir() {
        anyhow::bail!(
            "Configuration directory does not exist: {}",
            args.config_dir.display()
        );
    }

    let manifest = args
        .manifest
        .clone()
        .unwrap_or_else(|| args.config_dir.join(DEFAULT_MANIFEST));
    let registry = IntegrationRegistry::load_manifest(&manifest)
        .with_context(|| format!("Failed to load integration manifest {}", manifest.display()))?;
    info!(integrations = registry.len(), "loaded integration manifest");

    let cancellation = CancellationToken::new();
    if let Some(seconds) = args.timeout {
        let token = cancellation.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(seconds)).await;
            debug!("check timed out");
            token.cancel();
        });
    }

    let checker = ConfigChecker::new(Arc::new(registry))
        .with_options(CheckOptions {
            raise_on_failure: args.strict,
            concurrency: args.concurrency,
            skip_core: args.skip_core,
            ..CheckOptions::default()
        })
        .with_cancellation(cancellation);

    match checker.check_dir(&args.config_dir).await {
        Ok(result) => {
            print_result(&result, args.json)?;
            Ok(result.is_ok())
        }
        Err(err) => {
            let diagnostic = err.to_diagnostic();
            if args.json {
                let output = serde_json::json!({
                    "valid": false,
                    "diagnostics": [diagnostic.to_json()],
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", diagnostic.to_text());
            }
            Ok(false)
        }
    }
}

fn print_result(result: &CheckResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&result.to_json())?);
        return Ok(());
    }

    for diagnostic in &result.diagnostics {
        println!("{}", diagnostic.to_text());
    }
    for domain in &result.skipped {
        println!("Skipped {}: check timed out", domain);
    }

    let failures = result.failures().count() + result.package_failures.len();
    if result.is_ok() {
        println!(
            "Configuration is valid ({} domains checked).",
            result.domains.len()
        );
    } else {
        println!("Configuration is invalid: {} failures found.", failures.max(1));
    }
    Ok(())
}
