#![allow(clippy::result_large_err)]

use await_resources::awaiter::{AwaitError, Awaiter};
use await_resources::cli::{self, CliCommand};
use await_resources::config::{AwaitConfig, AwaitDefaults};
use await_resources::{dispatch, handoff, telemetry};
use anyhow::Context;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let cli = match cli::parse_args(std::env::args().skip(1)) {
        Ok(CliCommand::Await(cli)) => cli,
        Ok(CliCommand::Version) => {
            println!("await {}", env!("CARGO_PKG_VERSION"));
            return Ok(ExitCode::SUCCESS);
        }
        Ok(CliCommand::Help) => {
            print!("{}", cli::USAGE);
            return Ok(ExitCode::SUCCESS);
        }
        Err(err) => {
            eprintln!("{err}");
            eprint!("{}", cli::USAGE);
            return Ok(ExitCode::FAILURE);
        }
    };

    let defaults = AwaitDefaults::load().context("failed to read AWAIT_* defaults")?;
    let config = AwaitConfig::resolve(&cli, &defaults)?;
    telemetry::init_tracing(config.verbosity)?;

    let resources = dispatch::build_from_strings(&config.resources)
        .map_err(|err| anyhow::anyhow!("failed to parse resources: {err}"))?;

    match Awaiter::new(config.timeout).run(&resources).await {
        Ok(summary) => {
            tracing::info!(
                target: "await",
                event = "all_available",
                elapsed = %humantime::format_duration(summary.elapsed),
                "all resources available"
            );
        }
        Err(err @ AwaitError::TimedOut { .. }) => {
            tracing::error!(target: "await", event = "await_timed_out", error = %err, "timeout exceeded");
            if !config.force {
                return Ok(ExitCode::FAILURE);
            }
        }
        Err(err @ AwaitError::Fatal { .. }) => return Err(err.into()),
    }

    Ok(handoff::run_command(&config.command).await?)
}
