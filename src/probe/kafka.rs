//! Kafka broker probing.
//!
//! Opening a TCP connection proves nothing about Kafka, so each attempt asks
//! the cluster for its metadata. A listener that does not speak the protocol
//! never produces a broker list and stays unavailable.

use super::kafka_context::ProbeClientContext;
use super::util::Presence;
use super::{Probe, ProbeContext};
use crate::dispatch::ConfigError;
use crate::error::{unavailable, Context, Result, Unavailable};
use crate::locator::Locator;
use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use std::fmt;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 9092;
pub const DEFAULT_TLS_PORT: u16 = 9093;

/// Upper bound for a single metadata request.
const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaslMechanism {
    Plain,
    ScramSha256,
    ScramSha512,
}

impl SaslMechanism {
    pub const OPTION_VALUES: &'static str = "plain, scram-sha-256, scram-sha-512";

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "plain" => Some(SaslMechanism::Plain),
            "scram-sha-256" => Some(SaslMechanism::ScramSha256),
            "scram-sha-512" => Some(SaslMechanism::ScramSha512),
            _ => None,
        }
    }

    /// Name understood by librdkafka's `sasl.mechanisms`.
    pub fn as_rdkafka(self) -> &'static str {
        match self {
            SaslMechanism::Plain => "PLAIN",
            SaslMechanism::ScramSha256 => "SCRAM-SHA-256",
            SaslMechanism::ScramSha512 => "SCRAM-SHA-512",
        }
    }
}

#[derive(Clone)]
pub struct SaslCredentials {
    pub mechanism: SaslMechanism,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SaslCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaslCredentials")
            .field("mechanism", &self.mechanism)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct KafkaProbe {
    display: String,
    bootstrap: String,
    tls: bool,
    skip_verify: bool,
    sasl: Option<SaslCredentials>,
    topics: Option<Presence>,
}

impl KafkaProbe {
    pub fn from_locator(locator: &Locator) -> Result<Self, ConfigError> {
        let display = locator.to_string();
        let host = locator.host().ok_or_else(|| ConfigError::MissingHost {
            locator: display.clone(),
        })?;

        let tls = locator.scheme() == "kafkas";
        let port = locator
            .port()
            .unwrap_or(if tls { DEFAULT_TLS_PORT } else { DEFAULT_PORT });

        let skip_verify = match locator.options().first("tls") {
            None | Some("") => false,
            Some("skip-verify") => true,
            Some(other) => {
                return Err(ConfigError::InvalidOption {
                    locator: display,
                    option: "tls".to_string(),
                    value: other.to_string(),
                    expected: "skip-verify".to_string(),
                })
            }
        };

        let authority = locator.authority();
        let mechanism = match locator.options().first("sasl") {
            None => None,
            Some(value) => Some(SaslMechanism::parse(value).ok_or_else(|| {
                ConfigError::InvalidOption {
                    locator: display.clone(),
                    option: "sasl".to_string(),
                    value: value.to_string(),
                    expected: SaslMechanism::OPTION_VALUES.to_string(),
                }
            })?),
        };
        let sasl = match (mechanism, authority.has_credentials()) {
            (Some(_), false) => {
                return Err(ConfigError::MissingCredentials {
                    locator: display,
                    option: "sasl".to_string(),
                })
            }
            (mechanism, true) => Some(SaslCredentials {
                mechanism: mechanism.unwrap_or(SaslMechanism::Plain),
                username: authority.username.clone(),
                password: authority.password.clone().unwrap_or_default(),
            }),
            (None, false) => None,
        };

        Ok(Self {
            display,
            bootstrap: format!("{host}:{port}"),
            tls,
            skip_verify,
            sasl,
            topics: Presence::from_options(locator.options(), "topics"),
        })
    }

    pub fn bootstrap(&self) -> &str {
        &self.bootstrap
    }

    pub fn sasl(&self) -> Option<&SaslCredentials> {
        self.sasl.as_ref()
    }

    pub fn topics(&self) -> Option<&Presence> {
        self.topics.as_ref()
    }

    pub fn security_protocol(&self) -> &'static str {
        match (self.tls, self.sasl.is_some()) {
            (true, true) => "SASL_SSL",
            (true, false) => "SSL",
            (false, true) => "SASL_PLAINTEXT",
            (false, false) => "PLAINTEXT",
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", self.bootstrap.as_str())
            .set("client.id", "await")
            .set("security.protocol", self.security_protocol());

        if self.tls && self.skip_verify {
            config.set("enable.ssl.certificate.verification", "false");
        }
        if let Some(sasl) = &self.sasl {
            config
                .set("sasl.mechanisms", sasl.mechanism.as_rdkafka())
                .set("sasl.username", sasl.username.as_str())
                .set("sasl.password", sasl.password.as_str());
        }
        config
    }

    async fn fetch(&self, ctx: &ProbeContext) -> Result<()> {
        let config = self.client_config();
        let context = ProbeClientContext::new(self.display.clone());
        let timeout = ctx.remaining().min(METADATA_TIMEOUT);

        let existing =
            tokio::task::spawn_blocking(move || fetch_topics(config, context, timeout)).await??;

        match &self.topics {
            Some(required) => check_topics(required, existing),
            None => Ok(()),
        }
    }
}

/// Blocking metadata request. Returns the names of the topics in the cluster.
fn fetch_topics(
    config: ClientConfig,
    context: ProbeClientContext,
    timeout: Duration,
) -> Result<Vec<String>> {
    let consumer: BaseConsumer<ProbeClientContext> = config
        .create_with_context(context)
        .context("failed to create kafka client")?;

    let metadata = consumer
        .fetch_metadata(None, timeout)
        .map_err(unavailable)?;

    if metadata.brokers().is_empty() {
        return Err(Unavailable::msg("cluster metadata lists no brokers").into());
    }

    Ok(metadata
        .topics()
        .iter()
        .filter(|topic| topic.error().is_none())
        .map(|topic| topic.name().to_string())
        .collect())
}

fn check_topics(required: &Presence, existing: Vec<String>) -> Result<()> {
    required.missing(existing).map_err(|missing| {
        if missing.is_empty() {
            Unavailable::msg("no topics found").into()
        } else {
            Unavailable::msg(format!("missing topics: {}", missing.join(", "))).into()
        }
    })
}

#[async_trait]
impl Probe for KafkaProbe {
    async fn attempt(&self, ctx: &ProbeContext) -> Result<()> {
        ctx.bounded(self.fetch(ctx)).await
    }
}

impl fmt::Display for KafkaProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}
