//! Availability probes, one per resource kind.
//!
//! Every probe performs a single check per [`Probe::attempt`] call:
//!
//! * `Ok(())`: the resource is available;
//! * [`Error::Unavailable`]: the resource is not ready yet;
//! * any other [`Error`]: something not clearly about readiness (DNS, spawn failures).
//!
//! Probes hold only their configuration. Anything acquired during an attempt
//! is released before the attempt returns, including when it is cancelled.

use crate::error::{Error, Result, Unavailable};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "rabbitmq")]
pub mod amqp;
pub mod command;
#[cfg(feature = "docker")]
pub mod docker;
pub mod file;
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "kafka")]
pub mod kafka;
#[cfg(feature = "kafka")]
pub mod kafka_context;
#[cfg(any(feature = "db-postgres", feature = "db-mysql"))]
pub mod sql;
pub mod tcp;
pub mod util;
#[cfg(feature = "websocket")]
pub mod websocket;

#[async_trait]
pub trait Probe: fmt::Display + Send + Sync {
    /// Checks the resource once.
    async fn attempt(&self, ctx: &ProbeContext) -> Result<()>;
}

/// Cancellation token and deadline shared by every attempt in a run.
#[derive(Clone, Debug)]
pub struct ProbeContext {
    token: CancellationToken,
    deadline: Instant,
}

impl ProbeContext {
    pub fn new(token: CancellationToken, deadline: Instant) -> Self {
        Self { token, deadline }
    }

    /// A context with its own token, expiring after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(CancellationToken::new(), Instant::now() + timeout)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Runs `future` until it completes, the token fires, or the deadline passes.
    ///
    /// Hitting the deadline inside a probe is reported as [`Unavailable`]; the
    /// caller decides whether the overall run has timed out.
    pub async fn bounded<F, T>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let remaining = self.remaining();
        tokio::select! {
            _ = self.token.cancelled() => Err(Error::Cancelled),
            outcome = tokio::time::timeout(remaining, future) => match outcome {
                Ok(result) => result,
                Err(_) => Err(Error::Unavailable(Unavailable::msg(format!(
                    "no answer within {}",
                    humantime::format_duration(remaining)
                )))),
            },
        }
    }
}

impl Default for ProbeContext {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(60))
    }
}
