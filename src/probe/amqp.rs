use super::{Probe, ProbeContext};
use crate::error::{unavailable, Result};
use async_trait::async_trait;
use lapin::{Connection, ConnectionProperties};
use std::fmt;
use tokio_executor_trait::Tokio as TokioExecutor;
use url::Url;

/// Opens an AMQP connection and closes it again.
#[derive(Debug, Clone)]
pub struct AmqpProbe {
    display: String,
    url: Url,
}

impl AmqpProbe {
    pub fn new(display: impl Into<String>, url: Url) -> Self {
        Self {
            display: display.into(),
            url,
        }
    }

    async fn connect(&self) -> Result<()> {
        let properties = ConnectionProperties::default().with_executor(TokioExecutor::current());
        let connection = Connection::connect(self.url.as_str(), properties)
            .await
            .map_err(unavailable)?;

        if let Err(err) = connection.close(200, "OK").await {
            tracing::debug!(error = %err, "amqp connection close failed");
        }
        Ok(())
    }
}

#[async_trait]
impl Probe for AmqpProbe {
    async fn attempt(&self, ctx: &ProbeContext) -> Result<()> {
        ctx.bounded(self.connect()).await
    }
}

impl fmt::Display for AmqpProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}
