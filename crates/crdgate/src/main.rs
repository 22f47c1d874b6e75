use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod categorize;
mod check;
mod util;

const ENV_LOG: &str = "CRDGATE_LOG";

#[derive(Parser, Debug)]
#[command(name = "crdgate")]
#[command(about = "CRD upgrade-safety gate: blocks backwards-incompatible CRD upgrades.", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a release manifest against the installed CRDs.
    Check(check::CheckArgs),
    /// Categorize raw validation failures into tiered, actionable messages.
    Categorize(categorize::CategorizeArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn main() -> ExitCode {
    init_tracing();
    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(check::EXIT_FATAL)
        }
    }
}

fn try_main() -> Result<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Command::Check(args) => check::cmd_check(args),
        Command::Categorize(args) => categorize::cmd_categorize(args),
    }
}
