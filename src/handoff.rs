//! Runs the trailing command once waiting is over.

use crate::error::{Context, Result};
use std::process::{ExitCode, ExitStatus};
use tokio::process::Command;

/// Spawns `argv` with inherited stdio and waits for it.
///
/// The returned code mirrors the child's: its exit code, or `128 + signal`
/// when it was killed by a signal.
pub async fn run_command(argv: &[String]) -> Result<ExitCode> {
    let Some((program, args)) = argv.split_first() else {
        return Ok(ExitCode::SUCCESS);
    };

    tracing::info!(target: "await", event = "command_start", command = %argv.join(" "), "running command");

    let status = Command::new(program)
        .args(args)
        .status()
        .await
        .with_context(|| format!("failed to execute command `{program}`"))?;

    let code = exit_code(status);
    tracing::debug!(target: "await", event = "command_exit", code = code, "command finished");
    Ok(ExitCode::from(code))
}

fn exit_code(status: ExitStatus) -> u8 {
    if let Some(code) = status.code() {
        return code.clamp(0, 255) as u8;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return (128 + signal).clamp(0, 255) as u8;
        }
    }
    1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    #[test]
    fn exit_codes_and_signals() {
        assert_eq!(exit_code(ExitStatus::from_raw(0)), 0);
        assert_eq!(exit_code(ExitStatus::from_raw(3 << 8)), 3);
        assert_eq!(exit_code(ExitStatus::from_raw(9)), 137);
    }

    #[tokio::test]
    async fn empty_command_succeeds() {
        assert_eq!(run_command(&[]).await.expect("no-op"), ExitCode::SUCCESS);
    }
}
