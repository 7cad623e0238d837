#![forbid(unsafe_code)]

//! Sequential, deadline-bounded driver for a list of probes.
//!
//! Resources are checked strictly in order. The current resource is retried
//! after a fixed delay until it becomes available, and is never revisited
//! afterwards. The whole run shares one deadline; when it passes, the run is
//! abandoned and the most recent failure is reported.

use crate::classify::{classify, ErrorClass};
use crate::error::{Error, Unavailable};
use crate::probe::{Probe, ProbeContext};
use crate::resource_event;
use crate::runtime::sleep_with_cancel;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Delay between two attempts at the same resource.
pub const RETRY_DELAY: Duration = Duration::from_millis(500);

const NOT_FINISHED: &str = "initial await did not finish";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwaiterState {
    Idle,
    AwaitingResource(usize),
    AllAvailable,
    TimedOut,
    Failed,
}

#[derive(Debug, thiserror::Error)]
pub enum AwaitError {
    #[error("timed out waiting for {resource}: {source}")]
    TimedOut {
        resource: String,
        timeout: Duration,
        #[source]
        source: Unavailable,
    },
    #[error("{resource}: {source}")]
    Fatal {
        resource: String,
        #[source]
        source: Error,
    },
}

impl AwaitError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, AwaitError::TimedOut { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwaitSummary {
    /// Attempts per resource, in input order.
    pub attempts: Vec<u32>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct Awaiter {
    timeout: Duration,
}

impl Awaiter {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn run<P: Probe>(&self, resources: &[P]) -> Result<AwaitSummary, AwaitError> {
        let started = Instant::now();
        let deadline = started + self.timeout;
        let ctx = ProbeContext::new(CancellationToken::new(), deadline);
        let mut run = AwaiterRun::new(resources);

        let outcome = tokio::select! {
            biased;
            outcome = run.drive(&ctx) => outcome,
            _ = tokio::time::sleep_until(deadline) => DriveOutcome::DeadlineReached,
        };
        ctx.token().cancel();

        match outcome {
            DriveOutcome::AllAvailable => Ok(AwaitSummary {
                attempts: run.attempts,
                elapsed: started.elapsed(),
            }),
            DriveOutcome::DeadlineReached => {
                run.state = AwaiterState::TimedOut;
                let resource = run.current_name();
                let source = match run.latest_error.take() {
                    Some(Error::Unavailable(unavailable)) => unavailable,
                    Some(other) => Unavailable::new(other),
                    None => Unavailable::msg(NOT_FINISHED),
                };
                tracing::debug!(
                    target: "await",
                    event = "await_timed_out",
                    resource = %resource,
                    timeout = %humantime::format_duration(self.timeout),
                    "deadline reached"
                );
                Err(AwaitError::TimedOut {
                    resource,
                    timeout: self.timeout,
                    source,
                })
            }
            DriveOutcome::Fatal => {
                let resource = run.current_name();
                let source = run
                    .latest_error
                    .take()
                    .unwrap_or_else(|| Error::msg(NOT_FINISHED));
                Err(AwaitError::Fatal { resource, source })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriveOutcome {
    AllAvailable,
    DeadlineReached,
    Fatal,
}

struct AwaiterRun<'a, P> {
    resources: &'a [P],
    current: usize,
    state: AwaiterState,
    latest_error: Option<Error>,
    attempts: Vec<u32>,
}

impl<'a, P: Probe> AwaiterRun<'a, P> {
    fn new(resources: &'a [P]) -> Self {
        Self {
            resources,
            current: 0,
            state: AwaiterState::Idle,
            latest_error: None,
            attempts: vec![0; resources.len()],
        }
    }

    fn current_name(&self) -> String {
        self.resources
            .get(self.current)
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    async fn drive(&mut self, ctx: &ProbeContext) -> DriveOutcome {
        while let Some(resource) = self.resources.get(self.current) {
            if self.state != AwaiterState::AwaitingResource(self.current) {
                self.state = AwaiterState::AwaitingResource(self.current);
                resource_event!(info, "resource_awaiting", resource = resource; "awaiting resource");
            }
            if ctx.remaining().is_zero() || ctx.is_cancelled() {
                return DriveOutcome::DeadlineReached;
            }

            self.attempts[self.current] += 1;
            let attempt = self.attempts[self.current];

            match resource.attempt(ctx).await {
                Ok(()) => {
                    resource_event!(
                        info,
                        "resource_available",
                        resource = resource,
                        attempt = attempt;
                        "resource available"
                    );
                    self.latest_error = None;
                    self.current += 1;
                }
                Err(err) => {
                    let class = classify(&err);
                    match class {
                        ErrorClass::Unavailable => resource_event!(
                            debug,
                            "resource_unavailable",
                            resource = resource,
                            attempt = attempt,
                            error = err;
                            "resource unavailable"
                        ),
                        ErrorClass::Uncategorized | ErrorClass::Fatal => resource_event!(
                            error,
                            "resource_error",
                            resource = resource,
                            attempt = attempt,
                            class = class,
                            error = err;
                            "failed to await resource"
                        ),
                    }

                    self.latest_error = Some(err);
                    if !class.is_retryable() {
                        self.state = AwaiterState::Failed;
                        return DriveOutcome::Fatal;
                    }
                    if sleep_with_cancel(RETRY_DELAY, ctx.token()).await {
                        return DriveOutcome::DeadlineReached;
                    }
                }
            }
        }

        self.state = AwaiterState::AllAvailable;
        DriveOutcome::AllAvailable
    }
}
