use super::{Probe, ProbeContext};
use crate::error::{unavailable, Result};
use async_trait::async_trait;
use std::fmt;
use url::Url;

/// Issues a GET request; any 2xx status means available.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    display: String,
    url: Url,
}

impl HttpProbe {
    pub fn new(display: impl Into<String>, url: Url) -> Self {
        Self {
            display: display.into(),
            url,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn get(&self, ctx: &ProbeContext) -> Result<()> {
        let client = reqwest::Client::builder()
            .timeout(ctx.remaining())
            .build()?;

        let response = client
            .get(self.url.clone())
            .send()
            .await
            .map_err(unavailable)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(unavailable(format!("{} answered {status}", self.url)))
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn attempt(&self, ctx: &ProbeContext) -> Result<()> {
        ctx.bounded(self.get(ctx)).await
    }
}

impl fmt::Display for HttpProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}
