use crate::cli::CliArgs;
use crate::error::Result;
use config::{Config, Environment};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// How much the binary logs to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Nothing but fatal errors.
    Quiet,
    /// Errors only.
    #[default]
    Normal,
    /// Progress per resource.
    Verbose,
    /// Every attempt.
    Debug,
}

/// Defaults read from `AWAIT_*` environment variables.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AwaitDefaults {
    #[serde(default)]
    pub timeout: Option<String>,
    #[serde(default)]
    pub verbosity: Option<Verbosity>,
}

impl AwaitDefaults {
    pub fn load() -> Result<Self> {
        Self::from_environment(environment())
    }

    pub fn from_environment(environment: Environment) -> Result<Self> {
        let defaults = Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        Ok(defaults)
    }
}

/// `AWAIT_TIMEOUT`, `AWAIT_VERBOSITY`; `__` separates nested keys.
fn environment() -> Environment {
    Environment::with_prefix("AWAIT")
        .prefix_separator("_")
        .separator("__")
}

/// Effective settings for one run: command line over environment defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwaitConfig {
    pub timeout: Duration,
    pub verbosity: Verbosity,
    pub force: bool,
    pub resources: Vec<String>,
    pub command: Vec<String>,
}

impl AwaitConfig {
    /// Layers `cli` over `defaults`. Resources listed in the `-i` input are
    /// appended after the positional ones.
    pub fn resolve(cli: &CliArgs, defaults: &AwaitDefaults) -> Result<Self> {
        let timeout = match cli.timeout.as_deref().or(defaults.timeout.as_deref()) {
            Some(text) => humantime::parse_duration(text.trim())?,
            None => DEFAULT_TIMEOUT,
        };

        let verbosity = if cli.verbose >= 2 {
            Verbosity::Debug
        } else if cli.verbose == 1 {
            Verbosity::Verbose
        } else if cli.quiet {
            Verbosity::Quiet
        } else {
            defaults.verbosity.unwrap_or_default()
        };

        let mut resources = cli.resources.clone();
        if let Some(input) = cli.input.as_deref() {
            resources.extend(crate::cli::read_locators(input)?);
        }

        Ok(Self {
            timeout,
            verbosity,
            force: cli.force,
            resources,
            command: cli.command.clone(),
        })
    }
}
