//! hearth-check - validate a hearth configuration directory

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod check;

#[derive(Parser, Debug)]
#[command(name = "hearth-check")]
#[command(version, about = "Check a hearth configuration directory", long_about = None)]
struct Cli {
    /// Configuration directory holding configuration.yaml
    #[arg(short = 'c', long, default_value = ".")]
    config_dir: PathBuf,

    /// Integration manifest (defaults to integrations.yaml in the
    /// configuration directory)
    #[arg(short = 'm', long)]
    manifest: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Stop at the first domain that fails
    #[arg(long)]
    strict: bool,

    /// Number of domains validated at once
    #[arg(long, default_value_t = 8)]
    concurrency: usize,

    /// Do not process the core section
    #[arg(long)]
    skip_core: bool,

    /// Skip domains not started within this many seconds
    #[arg(long)]
    timeout: Option<u64>,
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hearth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let args = check::CheckArgs {
        config_dir: cli.config_dir,
        manifest: cli.manifest,
        json: cli.json,
        strict: cli.strict,
        concurrency: cli.concurrency,
        skip_core: cli.skip_core,
        timeout: cli.timeout,
    };

    match check::execute(args) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    }
}
