//! patchwatch
//!
//! Audits a fleet of APT and YUM servers over SSH for pending package updates
//! and mails a deduplicated JSON report.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

mod config;
mod exit;
mod run;

#[derive(Debug, Parser)]
#[command(name = "patchwatch")]
#[command(about = "Report pending package updates across a server fleet", long_about = None)]
pub struct Cli {
    /// Config file (TOML or YAML)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Do not send mail; write the report to disk instead
    #[arg(long)]
    pub no_mail: bool,

    /// Also write the JSON report into this directory
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Print the JSON report to stdout
    #[arg(long)]
    pub print: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Install the global subscriber; logs go to stderr so `--print` stays clean
pub(crate) fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    if let Err(err) = color_eyre::install() {
        eprintln!("Error: {err:?}");
        return exit::ExitCode::Failure.into();
    }

    let cli = Cli::parse();

    match run::run(&cli).await {
        Ok(()) => exit::ExitCode::Success.into(),
        Err(err) => {
            eprintln!("Error: {err:?}");
            exit::exit_code(&err).into()
        }
    }
}
