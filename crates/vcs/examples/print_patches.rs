//! Example: print the pending patch set of a working copy
//!
//! Run with: cargo run --example print_patches -- [path] [--config vcs.toml]
//!
//! Pass `--log-format json` for JSON logs and set `RUST_LOG=vcs=trace` to see
//! every command that is run.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use utils::logging::{init_tracing, LogFormat};
use vcs::{snapshot, VcsConfig, VcsError, VcsFactory};

#[derive(Parser, Debug)]
#[command(about = "Print the pending patch set of a working copy")]
struct Args {
    /// Working copy to inspect (backend is auto-detected)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// TOML configuration file; overrides auto-detection
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log output format (pretty or json)
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,
}

fn run(args: Args) -> Result<(), VcsError> {
    let mut vcs = match args.config {
        Some(file) => VcsFactory::create(&VcsConfig::load(&file)?)?,
        None => VcsFactory::auto_detect(&args.path)?,
    };
    tracing::info!("{}", vcs.description());

    let snap = snapshot(vcs.as_mut())?;
    if let Some(revision) = &snap.revision {
        eprintln!("base revision: {revision}");
    }
    if snap.patches.is_empty() {
        eprintln!("no pending changes");
    }
    for block in snap.patches {
        println!("{block}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing("info", args.log_format);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "patch extraction failed");
            eprintln!("error: {}", e.user_message());
            ExitCode::FAILURE
        }
    }
}
