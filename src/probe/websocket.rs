use super::{Probe, ProbeContext};
use crate::error::{unavailable, Result};
use async_trait::async_trait;
use std::fmt;
use tokio_tungstenite::connect_async;
use url::Url;

/// Completes a WebSocket handshake and closes the connection straight away.
#[derive(Debug, Clone)]
pub struct WebSocketProbe {
    display: String,
    url: Url,
}

impl WebSocketProbe {
    pub fn new(display: impl Into<String>, url: Url) -> Self {
        Self {
            display: display.into(),
            url,
        }
    }

    async fn handshake(&self) -> Result<()> {
        let (mut stream, _response) = connect_async(self.url.as_str())
            .await
            .map_err(unavailable)?;

        if let Err(err) = stream.close(None).await {
            tracing::debug!(url = %self.url, error = %err, "websocket close failed");
        }
        Ok(())
    }
}

#[async_trait]
impl Probe for WebSocketProbe {
    async fn attempt(&self, ctx: &ProbeContext) -> Result<()> {
        ctx.bounded(self.handshake()).await
    }
}

impl fmt::Display for WebSocketProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Duration;

    fn socket_at(port: u16) -> WebSocketProbe {
        let url = Url::parse(&format!("ws://127.0.0.1:{port}/socket")).expect("ws url");
        WebSocketProbe::new(url.to_string(), url)
    }

    #[tokio::test]
    async fn refused_connection_is_unavailable() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
            listener.local_addr().expect("local addr").port()
        };
        let err = socket_at(port)
            .attempt(&ProbeContext::with_timeout(Duration::from_secs(5)))
            .await
            .expect_err("nothing listening");
        assert!(err.is_unavailable(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn silent_listener_never_completes_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
        let port = listener.local_addr().expect("local addr").port();

        let err = socket_at(port)
            .attempt(&ProbeContext::with_timeout(Duration::from_millis(300)))
            .await
            .expect_err("no handshake answer");
        assert!(err.is_unavailable(), "unexpected error: {err:?}");
        drop(listener);
    }
}
