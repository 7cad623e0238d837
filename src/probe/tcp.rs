//! Plain socket connect probing.

use super::{Probe, ProbeContext};
use crate::error::{unavailable, Context, Result};
use async_trait::async_trait;
use std::fmt;
use std::net::SocketAddr;
use tokio::net::{lookup_host, TcpStream};

/// Address family restriction implied by the `tcp`, `tcp4` and `tcp6` schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    Any,
    V4,
    V6,
}

impl AddressFamily {
    pub fn from_scheme(scheme: &str) -> Self {
        match scheme {
            "tcp4" => AddressFamily::V4,
            "tcp6" => AddressFamily::V6,
            _ => AddressFamily::Any,
        }
    }

    fn admits(self, addr: &SocketAddr) -> bool {
        match self {
            AddressFamily::Any => true,
            AddressFamily::V4 => addr.is_ipv4(),
            AddressFamily::V6 => addr.is_ipv6(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TcpProbe {
    display: String,
    host: String,
    port: u16,
    family: AddressFamily,
}

impl TcpProbe {
    pub fn new(
        display: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        family: AddressFamily,
    ) -> Self {
        Self {
            display: display.into(),
            host: host.into(),
            port,
            family,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    async fn connect(&self) -> Result<()> {
        let address = self.address();
        let candidates: Vec<SocketAddr> = lookup_host(address.as_str())
            .await
            .with_context(|| format!("failed to resolve {address}"))?
            .filter(|addr| self.family.admits(addr))
            .collect();

        if candidates.is_empty() {
            crate::bail_err!("{address} has no {:?} addresses", self.family);
        }

        let mut last_error = None;
        for addr in candidates {
            match TcpStream::connect(addr).await {
                Ok(_stream) => {
                    tracing::debug!(address = %addr, "tcp connect succeeded");
                    return Ok(());
                }
                Err(err) => last_error = Some(err),
            }
        }

        match last_error {
            Some(err) => Err(unavailable(err)),
            None => Err(unavailable(format!("could not connect to {address}"))),
        }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    async fn attempt(&self, ctx: &ProbeContext) -> Result<()> {
        ctx.bounded(self.connect()).await
    }
}

impl fmt::Display for TcpProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}
