#![forbid(unsafe_code)]

use crate::error::Error;
use std::fmt;

/// How the awaiter treats a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The resource is not ready yet.
    Unavailable,
    /// Anything else a probe reported; logged loudly, still retried.
    Uncategorized,
    /// Bad configuration; retrying cannot help.
    Fatal,
}

impl ErrorClass {
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorClass::Fatal)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Unavailable => "unavailable",
            ErrorClass::Uncategorized => "uncategorized",
            ErrorClass::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify(error: &Error) -> ErrorClass {
    match error.root() {
        Error::Unavailable(_) => ErrorClass::Unavailable,
        Error::Config(_) | Error::Locator(_) => ErrorClass::Fatal,
        _ => ErrorClass::Uncategorized,
    }
}
