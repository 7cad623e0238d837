//! Command line parsing for the `await` binary.
//!
//! Options come first and stop at the first positional argument. A `--`
//! separates resources from the command to run once they are available.

use crate::error::{Context, Result};
use std::io::Read;

pub const USAGE: &str = "\
Usage: await [options...] <res>... [ -- <cmd>]
Await availability of resources.

Options:
  -f            Force running the command even after giving up
  -i <path>     Read resources from file, '-' to read from stdin
  -q            Set quiet mode
  -t <duration> Set timeout duration before giving up (default 1m)
  -v            Set verbose output mode
  -vv           Set more verbose output mode
  -V            Show version
  -h, --help    Print this help message
";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub force: bool,
    pub input: Option<String>,
    pub quiet: bool,
    pub verbose: u8,
    pub timeout: Option<String>,
    pub resources: Vec<String>,
    pub command: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Await(CliArgs),
    Version,
    Help,
}

/// Parses the arguments following the program name.
pub fn parse_args<I>(args: I) -> Result<CliCommand>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut cli = CliArgs::default();
    let mut positional = Vec::new();

    while let Some(arg) = args.next() {
        if arg == "--" {
            // Separator straight after the options: everything is command.
            cli.command = args.collect();
            return Ok(CliCommand::Await(cli));
        }
        if arg == "-" || !arg.starts_with('-') {
            positional.push(arg);
            break;
        }

        let flag = arg.strip_prefix("--").unwrap_or(&arg[1..]);
        let (name, inline) = match flag.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (flag, None),
        };

        match name {
            "f" => cli.force = true,
            "q" => cli.quiet = true,
            "v" => cli.verbose = cli.verbose.max(1),
            "vv" => cli.verbose = 2,
            "V" => return Ok(CliCommand::Version),
            "h" | "help" => return Ok(CliCommand::Help),
            "i" => cli.input = Some(flag_value(name, inline, &mut args)?),
            "t" => cli.timeout = Some(flag_value(name, inline, &mut args)?),
            _ => crate::bail_err!("flag provided but not defined: {arg}"),
        }
    }

    positional.extend(args);
    match positional.iter().position(|arg| arg == "--") {
        Some(index) => {
            cli.command = positional.split_off(index + 1);
            positional.pop();
            cli.resources = positional;
        }
        None => cli.resources = positional,
    }

    Ok(CliCommand::Await(cli))
}

fn flag_value<I>(name: &str, inline: Option<String>, args: &mut I) -> Result<String>
where
    I: Iterator<Item = String>,
{
    match inline {
        Some(value) => Ok(value),
        None => args
            .next()
            .ok_or_else(|| crate::err!("flag needs an argument: -{name}")),
    }
}

/// Reads locators from `path`, or from stdin when `path` is `-`.
pub fn read_locators(path: &str) -> Result<Vec<String>> {
    let text = if path == "-" {
        let mut text = String::new();
        std::io::stdin()
            .lock()
            .read_to_string(&mut text)
            .context("failed to read resources from stdin")?;
        text
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read resources file {path}"))?
    };
    Ok(locators_from_text(&text))
}

/// One locator per non-blank line, surrounding whitespace removed.
pub fn locators_from_text(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
