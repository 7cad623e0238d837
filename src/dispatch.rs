#![forbid(unsafe_code)]

//! Maps parsed locators to concrete probes.
//!
//! Every locator is validated here, before any probing starts, so a typo in
//! an option value fails the run immediately instead of timing out later.

use crate::error::Result;
use crate::locator::{self, Locator, LocatorError};
#[cfg(feature = "rabbitmq")]
use crate::probe::amqp::AmqpProbe;
use crate::probe::command::CommandProbe;
#[cfg(feature = "docker")]
use crate::probe::docker::DockerProbe;
use crate::probe::file::{FileProbe, Polarity};
#[cfg(feature = "http")]
use crate::probe::http::HttpProbe;
#[cfg(feature = "kafka")]
use crate::probe::kafka::KafkaProbe;
#[cfg(any(feature = "db-postgres", feature = "db-mysql"))]
use crate::probe::sql::{Dialect, SqlProbe};
use crate::probe::tcp::{AddressFamily, TcpProbe};
#[cfg(feature = "websocket")]
use crate::probe::websocket::WebSocketProbe;
use crate::probe::{Probe, ProbeContext};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(transparent)]
    Locator(#[from] LocatorError),
    #[error("unsupported resource scheme `{scheme}` in `{locator}`")]
    UnsupportedScheme { locator: String, scheme: String },
    #[error("`{scheme}` resources require the `{feature}` feature, which this binary was built without")]
    FeatureDisabled {
        scheme: String,
        feature: &'static str,
    },
    #[error("invalid `{option}` option `{value}` in `{locator}` (expected {expected})")]
    InvalidOption {
        locator: String,
        option: String,
        value: String,
        expected: String,
    },
    #[error("`{locator}` has no port")]
    MissingPort { locator: String },
    #[error("`{locator}` has no host")]
    MissingHost { locator: String },
    #[error("invalid database name `{name}` in `{locator}`")]
    InvalidDatabase { locator: String, name: String },
    #[error("`{locator}` must name a database to check tables")]
    DatabaseRequired { locator: String },
    #[error("`{locator}` names no container (give an id, `name` or `image`)")]
    MissingContainer { locator: String },
    #[error("`{option}` in `{locator}` requires user credentials")]
    MissingCredentials { locator: String, option: String },
}

/// One concrete probe per supported resource kind.
#[derive(Debug, Clone)]
pub enum Resource {
    Tcp(TcpProbe),
    #[cfg(feature = "http")]
    Http(HttpProbe),
    #[cfg(feature = "websocket")]
    WebSocket(WebSocketProbe),
    #[cfg(any(feature = "db-postgres", feature = "db-mysql"))]
    Sql(SqlProbe),
    #[cfg(feature = "kafka")]
    Kafka(KafkaProbe),
    #[cfg(feature = "docker")]
    Docker(DockerProbe),
    #[cfg(feature = "rabbitmq")]
    Amqp(AmqpProbe),
    File(FileProbe),
    Command(CommandProbe),
}

impl Resource {
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::Tcp(_) => "tcp",
            #[cfg(feature = "http")]
            Resource::Http(_) => "http",
            #[cfg(feature = "websocket")]
            Resource::WebSocket(_) => "websocket",
            #[cfg(any(feature = "db-postgres", feature = "db-mysql"))]
            Resource::Sql(probe) => probe.dialect().as_str(),
            #[cfg(feature = "kafka")]
            Resource::Kafka(_) => "kafka",
            #[cfg(feature = "docker")]
            Resource::Docker(_) => "docker",
            #[cfg(feature = "rabbitmq")]
            Resource::Amqp(_) => "amqp",
            Resource::File(_) => "file",
            Resource::Command(_) => "command",
        }
    }

    fn as_probe(&self) -> &dyn Probe {
        match self {
            Resource::Tcp(probe) => probe,
            #[cfg(feature = "http")]
            Resource::Http(probe) => probe,
            #[cfg(feature = "websocket")]
            Resource::WebSocket(probe) => probe,
            #[cfg(any(feature = "db-postgres", feature = "db-mysql"))]
            Resource::Sql(probe) => probe,
            #[cfg(feature = "kafka")]
            Resource::Kafka(probe) => probe,
            #[cfg(feature = "docker")]
            Resource::Docker(probe) => probe,
            #[cfg(feature = "rabbitmq")]
            Resource::Amqp(probe) => probe,
            Resource::File(probe) => probe,
            Resource::Command(probe) => probe,
        }
    }
}

#[async_trait]
impl Probe for Resource {
    async fn attempt(&self, ctx: &ProbeContext) -> Result<()> {
        self.as_probe().attempt(ctx).await
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_probe(), f)
    }
}

/// Builds one resource per locator, keeping input order.
pub fn build(locators: &[Locator]) -> Result<Vec<Resource>, ConfigError> {
    locators.iter().map(build_one).collect()
}

/// Parses and builds in one step.
pub fn build_from_strings<I, S>(inputs: I) -> Result<Vec<Resource>, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    inputs
        .into_iter()
        .map(|input| {
            let locator = locator::parse(input.as_ref())?;
            build_one(&locator)
        })
        .collect()
}

pub fn build_one(locator: &Locator) -> Result<Resource, ConfigError> {
    let display = locator.to_string();

    match locator.scheme() {
        "" => Ok(Resource::Command(CommandProbe::from_command_line(
            display,
            locator.path(),
        ))),
        scheme @ ("tcp" | "tcp4" | "tcp6") => {
            let host = locator.host().ok_or_else(|| ConfigError::MissingHost {
                locator: display.clone(),
            })?;
            let port = locator.port().ok_or_else(|| ConfigError::MissingPort {
                locator: display.clone(),
            })?;
            Ok(Resource::Tcp(TcpProbe::new(
                display,
                host,
                port,
                AddressFamily::from_scheme(scheme),
            )))
        }
        "file" => {
            let polarity = if locator.options().contains("absent") {
                Polarity::Absent
            } else {
                Polarity::Present
            };
            let path = match locator.host() {
                Some(host) => format!("{host}{}", locator.path()),
                None => locator.path().to_string(),
            };
            Ok(Resource::File(FileProbe::new(display, path, polarity)))
        }
        #[cfg(feature = "http")]
        "http" | "https" => Ok(Resource::Http(HttpProbe::new(
            display.clone(),
            url_of(locator, display)?,
        ))),
        #[cfg(feature = "websocket")]
        "ws" | "wss" => Ok(Resource::WebSocket(WebSocketProbe::new(
            display.clone(),
            url_of(locator, display)?,
        ))),
        #[cfg(feature = "db-postgres")]
        "postgres" | "postgresql" => Ok(Resource::Sql(SqlProbe::from_locator(
            locator,
            Dialect::Postgres,
        )?)),
        #[cfg(feature = "db-mysql")]
        "mysql" => Ok(Resource::Sql(SqlProbe::from_locator(locator, Dialect::MySql)?)),
        #[cfg(feature = "kafka")]
        "kafka" | "kafkas" => Ok(Resource::Kafka(KafkaProbe::from_locator(locator)?)),
        #[cfg(feature = "docker")]
        "docker" => Ok(Resource::Docker(DockerProbe::from_locator(locator)?)),
        #[cfg(feature = "rabbitmq")]
        "amqp" | "amqps" => Ok(Resource::Amqp(AmqpProbe::new(
            display.clone(),
            url_of(locator, display)?,
        ))),
        scheme => match feature_for(scheme) {
            Some(feature) => Err(ConfigError::FeatureDisabled {
                scheme: scheme.to_string(),
                feature,
            }),
            None => Err(ConfigError::UnsupportedScheme {
                locator: display,
                scheme: scheme.to_string(),
            }),
        },
    }
}

/// Cargo feature that provides the probe for a known scheme.
fn feature_for(scheme: &str) -> Option<&'static str> {
    match scheme {
        "http" | "https" => Some("http"),
        "ws" | "wss" => Some("websocket"),
        "postgres" | "postgresql" => Some("db-postgres"),
        "mysql" => Some("db-mysql"),
        "kafka" | "kafkas" => Some("kafka"),
        "docker" => Some("docker"),
        "amqp" | "amqps" => Some("rabbitmq"),
        _ => None,
    }
}

#[allow(dead_code)]
fn url_of(locator: &Locator, display: String) -> Result<url::Url, ConfigError> {
    locator
        .url_without_options()
        .ok_or(ConfigError::MissingHost { locator: display })
}
