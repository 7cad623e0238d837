#![forbid(unsafe_code)]

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Message(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid locator: {0}")]
    Locator(#[from] crate::locator::LocatorError),
    #[error("invalid configuration: {0}")]
    Config(#[from] crate::dispatch::ConfigError),
    #[error(transparent)]
    Unavailable(#[from] Unavailable),
    #[error("probe cancelled")]
    Cancelled,
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[cfg(feature = "http")]
    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[cfg(any(feature = "db-postgres", feature = "db-mysql"))]
    #[error("SQL error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[cfg(feature = "kafka")]
    #[error("kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
    #[cfg(feature = "rabbitmq")]
    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),
    #[cfg(feature = "docker")]
    #[error("docker error: {0}")]
    Docker(#[from] bollard::errors::Error),
    #[cfg(feature = "websocket")]
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("settings error: {0}")]
    Settings(#[from] ::config::ConfigError),
    #[error("duration parse error: {0}")]
    Duration(#[from] humantime::DurationError),
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn new<E>(error: E) -> Self
    where
        Error: From<E>,
    {
        error.into()
    }

    pub fn msg<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self::Message(message.into())
    }

    pub fn with_context<M>(context: M, source: Error) -> Self
    where
        M: Into<String>,
    {
        Self::Context {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Innermost error once every `Context` layer is peeled off.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.root(), Error::Unavailable(_))
    }
}

/// A resource answered, or plausibly will answer soon, but is not ready yet.
///
/// Probes return this for conditions that are expected to resolve by
/// themselves (refused connections, non-2xx statuses, missing topics).
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct Unavailable {
    reason: Box<Error>,
}

impl Unavailable {
    pub fn new<E>(reason: E) -> Self
    where
        Error: From<E>,
    {
        Self {
            reason: Box::new(reason.into()),
        }
    }

    pub fn msg<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self::new(Error::msg(message))
    }

    pub fn reason(&self) -> &Error {
        &self.reason
    }

    pub fn into_reason(self) -> Error {
        *self.reason
    }
}

/// Wraps any error as an [`Unavailable`] condition.
pub fn unavailable<E>(reason: E) -> Error
where
    Error: From<E>,
{
    Error::Unavailable(Unavailable::new(reason))
}

pub trait Context<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Into<String>;

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E> Context<T> for std::result::Result<T, E>
where
    Error: From<E>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Into<String>,
    {
        self.map_err(|err| Error::with_context(context.into(), err.into()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|err| Error::with_context(f().into(), err.into()))
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Message(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Message(value.to_string())
    }
}

#[macro_export]
macro_rules! err {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        $crate::error::Error::msg(format!($fmt $(, $arg)*))
    }};
    ($err:expr) => {{
        $crate::error::Error::new($err)
    }};
}

#[macro_export]
macro_rules! bail_err {
    ($($arg:tt)*) => {{
        return Err($crate::err!($($arg)*));
    }};
}
