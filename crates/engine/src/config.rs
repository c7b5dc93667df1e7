//! Host configuration via `dochost.toml`
//!
//! A missing file means defaults. To change settings, edit the file and
//! restart the host.

use crate::instance::InstanceLimits;
use dochost_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "dochost.toml";

/// A factory started with the host, accepting any fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactoryConfig {
    /// Factory link, e.g. `/core/examples`
    pub link: String,
    /// Kind tag stamped on its documents
    pub kind: String,
}

/// Host configuration loaded from `dochost.toml`.
///
/// # Example
///
/// ```toml
/// read_timeout_ms = 5000
/// max_retained_versions = 10
///
/// [[factories]]
/// link = "/core/examples"
/// kind = "example"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    /// Longest a read waits on a busy instance before timing out.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Prior versions each instance keeps for `history`.
    #[serde(default = "default_max_retained_versions")]
    pub max_retained_versions: usize,
    /// Open-schema factories to start.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub factories: Vec<FactoryConfig>,
}

fn default_read_timeout_ms() -> u64 {
    5000
}

fn default_max_retained_versions() -> usize {
    10
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: default_read_timeout_ms(),
            max_retained_versions: default_max_retained_versions(),
            factories: Vec::new(),
        }
    }
}

impl HostConfig {
    /// Read timeout as a duration
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Limits applied to every service instance
    pub fn instance_limits(&self) -> InstanceLimits {
        InstanceLimits {
            read_timeout: self.read_timeout(),
            max_retained_versions: self.max_retained_versions,
        }
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a zero read timeout or a factory with
    /// an empty link or kind.
    pub fn validate(&self) -> Result<()> {
        if self.read_timeout_ms == 0 {
            return Err(Error::validation(
                "read_timeout_ms in dochost.toml must be greater than 0",
            ));
        }
        for factory in &self.factories {
            if factory.link.trim_matches('/').is_empty() || factory.kind.is_empty() {
                return Err(Error::validation(format!(
                    "factory entry {{ link = '{}', kind = '{}' }} needs a non-root link and a kind",
                    factory.link, factory.kind
                )));
            }
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# dochost configuration
#
# Longest a read waits on a busy document before failing (default: 5000)
read_timeout_ms = 5000

# Prior versions each document keeps for history queries (default: 10)
max_retained_versions = 10

# Factories accepting any fields, started with the host.
# [[factories]]
# link = "/core/examples"
# kind = "example"
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::internal(
                format!("config {}", path.display()),
                format!("failed to read: {}", e),
            )
        })?;
        let config: HostConfig = toml::from_str(&content).map_err(|e| {
            Error::validation(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `dir/dochost.toml`, or defaults if it does not exist.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::internal(
                    format!("config {}", path.display()),
                    format!("failed to write default: {}", e),
                )
            })?;
        }
        Ok(())
    }
}
