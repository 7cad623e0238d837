use super::{Probe, ProbeContext};
use crate::error::{unavailable, Context, Result};
use async_trait::async_trait;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Whether the probe waits for a path to appear or to disappear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Present,
    Absent,
}

#[derive(Debug, Clone)]
pub struct FileProbe {
    display: String,
    path: PathBuf,
    polarity: Polarity,
}

impl FileProbe {
    pub fn new(display: impl Into<String>, path: impl Into<PathBuf>, polarity: Polarity) -> Self {
        Self {
            display: display.into(),
            path: path.into(),
            polarity,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }
}

#[async_trait]
impl Probe for FileProbe {
    async fn attempt(&self, _ctx: &ProbeContext) -> Result<()> {
        let exists = match tokio::fs::metadata(&self.path).await {
            Ok(_) => true,
            Err(err) if err.kind() == ErrorKind::NotFound => false,
            Err(err) => {
                return Err(err).with_context(|| format!("failed to stat {}", self.path.display()))
            }
        };

        match (self.polarity, exists) {
            (Polarity::Present, true) | (Polarity::Absent, false) => Ok(()),
            (Polarity::Present, false) => Err(unavailable(format!(
                "{} does not exist",
                self.path.display()
            ))),
            (Polarity::Absent, true) => Err(unavailable(format!(
                "{} still exists",
                self.path.display()
            ))),
        }
    }
}

impl fmt::Display for FileProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}
