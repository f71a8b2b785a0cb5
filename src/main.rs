use std::io::{self, IsTerminal};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rv32sim_tests::cli::Cli;
use rv32sim_tests::run;
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = cli.into_config(io::stdout().is_terminal())?;
    let outcome = run(&config, io::stdout().lock()).with_context(|| {
        format!(
            "running tests from {} with {}",
            config.test_root.display(),
            config.simulator.display()
        )
    })?;
    Ok(ExitCode::from(outcome.exit_code(config.strict_exit)))
}

// Logs go to stderr so stdout stays a clean report.
fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
