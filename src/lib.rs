#![allow(clippy::result_large_err)]

pub mod awaiter;
pub mod classify;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handoff;
pub mod locator;
pub mod logging;
pub mod probe;
pub mod runtime;
pub mod telemetry;

pub use awaiter::{AwaitError, AwaitSummary, Awaiter};
pub use dispatch::{ConfigError, Resource};
pub use locator::Locator;
pub use probe::{Probe, ProbeContext};
