use super::{Probe, ProbeContext};
use crate::error::{unavailable, Context, Result};
use async_trait::async_trait;
use std::fmt;
use std::process::Stdio;
use tokio::process::Command;

/// Runs a command to completion; exit status zero means available.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    display: String,
    argv: Vec<String>,
}

impl CommandProbe {
    pub fn new(display: impl Into<String>, argv: Vec<String>) -> Self {
        Self {
            display: display.into(),
            argv,
        }
    }

    /// Splits a command line on whitespace.
    pub fn from_command_line(display: impl Into<String>, line: &str) -> Self {
        Self::new(display, line.split_whitespace().map(str::to_string).collect())
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    async fn run(&self, program: &str, args: &[String]) -> Result<()> {
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("failed to run `{program}`"))?;

        if status.success() {
            Ok(())
        } else {
            Err(unavailable(format!("`{}` {status}", self.argv.join(" "))))
        }
    }
}

#[async_trait]
impl Probe for CommandProbe {
    async fn attempt(&self, ctx: &ProbeContext) -> Result<()> {
        let Some((program, args)) = self.argv.split_first() else {
            return Ok(());
        };
        ctx.bounded(self.run(program, args)).await
    }
}

impl fmt::Display for CommandProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}
