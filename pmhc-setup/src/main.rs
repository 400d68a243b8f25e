//! pmhc-setup — provisions the pMHC modelling toolchain into a conda environment.
//! Entry point for the installer binary.

use anyhow::Context;
use clap::Parser;
use console::style;
use pmhc_bootstrap::report::failure_message;
use pmhc_bootstrap::{Bootstrap, BootstrapContext, HttpDownloader, SystemRunner, TerminalPrompt};
use pmhc_config::SetupConfig;
use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pmhc-setup", version, about = "Install PANDORA, AFfine, ProteinMPNN and Pep2Vec")]
struct Args {
    /// Config file (default: $PMHC_SETUP_CONFIG, then ./pmhc-setup.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory the checkouts and archives are placed in
    #[arg(long, value_name = "DIR", default_value = ".")]
    workdir: PathBuf,

    /// File whose first line is the MODELLER license key
    #[arg(long, value_name = "PATH")]
    license_file: Option<PathBuf>,

    /// Print the step plan and exit
    #[arg(long)]
    dry_run: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "pmhc=debug,info" } else { "pmhc=info,info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_target(false)
        .init();
}

fn print_plan(bootstrap: &Bootstrap) {
    println!("{}", style("Planned steps:").bold());
    for (i, (name, description)) in bootstrap.plan().into_iter().enumerate() {
        println!("  {:>2}. {:<24} {}", i + 1, name, description);
    }
}

/// Host environment as UTF-8 pairs; entries that are not valid UTF-8 are dropped.
fn utf8_vars<I>(vars: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    vars.into_iter()
        .filter_map(|(key, value)| match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => Some((key, value)),
            (key, _) => {
                let key = key.unwrap_or_else(|k| k.to_string_lossy().into_owned());
                debug!(var = %key, "Skipping environment variable that is not UTF-8");
                None
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let workdir = std::path::absolute(&args.workdir)
        .with_context(|| format!("invalid working directory {}", args.workdir.display()))?;
    // A missing .env is the normal case.
    if let Err(e) = dotenvy::from_path(workdir.join(".env")) {
        if !e.not_found() {
            eprintln!("Ignoring unreadable .env: {e}");
        }
    }

    init_logging(args.verbose);
    info!("pmhc-setup {}", env!("CARGO_PKG_VERSION"));

    let config = SetupConfig::load(args.config.as_deref(), &workdir)?;
    let bootstrap = Bootstrap::standard();

    if args.dry_run {
        print_plan(&bootstrap);
        return Ok(());
    }

    if !workdir.is_dir() {
        anyhow::bail!("working directory {} does not exist", workdir.display());
    }

    let downloader = HttpDownloader::new(&config.network)?;
    let mut ctx = BootstrapContext::new(
        config,
        workdir,
        Arc::new(SystemRunner::new()),
        Arc::new(downloader),
        Arc::new(TerminalPrompt),
    )
    .with_host_env(utf8_vars(std::env::vars_os()))
    .with_license_file(args.license_file);

    match bootstrap.run(&mut ctx).await {
        Ok(report) => {
            for record in report.warnings() {
                warn!(step = record.step, "{}", record.outcome.message());
            }
            Ok(())
        }
        Err(failure) => {
            eprintln!("{}", failure_message(&failure, &ctx.config));
            std::process::exit(1);
        }
    }
}
