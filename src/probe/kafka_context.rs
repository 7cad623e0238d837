#![forbid(unsafe_code)]

use rdkafka::client::ClientContext;
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::consumer::ConsumerContext;
use rdkafka::error::KafkaError;

/// Client context for the short-lived metadata consumers of the broker probe.
///
/// librdkafka reports every failed connection attempt; those are expected
/// while a broker starts, so they only show up at debug level.
#[derive(Clone, Debug)]
pub struct ProbeClientContext {
    resource: String,
}

impl ProbeClientContext {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl ClientContext for ProbeClientContext {
    fn log(&self, _level: RDKafkaLogLevel, _facility: &str, _message: &str) {
        // Connection failures already reach `error`.
    }

    fn error(&self, error: KafkaError, reason: &str) {
        tracing::debug!(
            target: "await::kafka",
            event = "rdkafka_client_error",
            resource = %self.resource,
            error = %error,
            reason = %reason,
        );
    }
}

impl ConsumerContext for ProbeClientContext {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::EnvFilter;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().expect("capture lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn client_errors_are_selectable_by_target() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("await::kafka=debug"))
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let context = ProbeClientContext::new("kafka://broker:9092");
        tracing::subscriber::with_default(subscriber, || {
            context.error(
                KafkaError::ClientCreation("broker down".to_string()),
                "connect failed",
            );
        });

        let output = {
            let bytes = captured.0.lock().expect("capture lock");
            String::from_utf8_lossy(&bytes).into_owned()
        };
        assert!(output.contains("await::kafka"), "output: {output}");
        assert!(output.contains("rdkafka_client_error"), "output: {output}");
        assert!(!output.contains("target="), "output: {output}");
    }
}
