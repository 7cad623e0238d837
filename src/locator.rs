//! Resource locator grammar.
//!
//! A locator is either a URL-like string (`scheme://authority/path?query#options`)
//! or, when no `scheme://` prefix is present, an external command line. The
//! fragment carries `&`-separated `key=value` options.

use percent_encoding::percent_decode_str;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("`{input}` is not a valid locator: {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },
    #[error("`{input}` has an authority but no scheme")]
    MissingScheme { input: String },
    #[error("`{input}` is not valid UTF-8 once percent-decoded")]
    InvalidEncoding { input: String },
}

/// Fragment options of a locator, keyed by option name.
///
/// Values keep their input order; `first` gives "first value wins" lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatorOptions {
    values: BTreeMap<String, Vec<String>>,
}

impl LocatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn first(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values
            .iter()
            .map(|(key, values)| (key.as_str(), values.as_slice()))
    }
}

/// `host[:port]` plus optional credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authority {
    pub username: String,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl Authority {
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() || self.password.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    raw: String,
    scheme: String,
    authority: Authority,
    path: String,
    query: Option<String>,
    options: LocatorOptions,
    url: Option<Url>,
}

impl Locator {
    /// Lower-case scheme; empty for command locators.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub fn host(&self) -> Option<&str> {
        self.authority.host.as_deref()
    }

    pub fn port(&self) -> Option<u16> {
        self.authority.port
    }

    /// Percent-decoded path. For command locators this is the command line.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn options(&self) -> &LocatorOptions {
        &self.options
    }

    pub fn is_command(&self) -> bool {
        self.scheme.is_empty()
    }

    /// The locator as a URL with the option fragment removed.
    pub fn url_without_options(&self) -> Option<Url> {
        self.url.as_ref().map(|url| {
            let mut url = url.clone();
            url.set_fragment(None);
            url
        })
    }

    /// Text form with any password replaced by `***`.
    pub fn redacted(&self) -> String {
        match &self.url {
            Some(url) if url.password().is_some() => {
                let mut url = url.clone();
                let _ = url.set_password(Some("***"));
                url.to_string()
            }
            _ => self.raw.clone(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

impl std::str::FromStr for Locator {
    type Err = LocatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

pub fn parse(input: &str) -> Result<Locator, LocatorError> {
    if has_scheme(input) {
        parse_url(input)
    } else if input.starts_with("//") {
        Err(LocatorError::MissingScheme {
            input: input.to_string(),
        })
    } else {
        parse_command(input)
    }
}

/// Parses a `key=value&key` option list.
///
/// Empty segments and segments with an empty key (`=value`) are skipped
/// rather than rejected.
pub fn parse_options(fragment: &str) -> LocatorOptions {
    let mut options = LocatorOptions::new();
    for (key, value) in form_urlencoded::parse(fragment.as_bytes()) {
        if key.is_empty() {
            continue;
        }
        options.insert(key.into_owned(), value.into_owned());
    }
    options
}

fn has_scheme(input: &str) -> bool {
    let Some((scheme, _)) = input.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn parse_url(input: &str) -> Result<Locator, LocatorError> {
    let url = Url::parse(input).map_err(|source| LocatorError::InvalidUrl {
        input: input.to_string(),
        source,
    })?;

    let username = decode(url.username(), input)?;
    let password = url
        .password()
        .map(|password| decode(password, input))
        .transpose()?;
    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_string);

    Ok(Locator {
        raw: input.to_string(),
        scheme: url.scheme().to_string(),
        authority: Authority {
            username,
            password,
            host,
            port: url.port(),
        },
        path: decode(url.path(), input)?,
        query: url.query().map(str::to_string),
        options: parse_options(url.fragment().unwrap_or_default()),
        url: Some(url),
    })
}

fn parse_command(input: &str) -> Result<Locator, LocatorError> {
    let (command, fragment) = match input.split_once('#') {
        Some((command, fragment)) => (command, fragment),
        None => (input, ""),
    };

    Ok(Locator {
        raw: input.to_string(),
        scheme: String::new(),
        authority: Authority::default(),
        path: decode(command, input)?,
        query: None,
        options: parse_options(fragment),
        url: None,
    })
}

fn decode(value: &str, input: &str) -> Result<String, LocatorError> {
    percent_decode_str(value)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| LocatorError::InvalidEncoding {
            input: input.to_string(),
        })
}
