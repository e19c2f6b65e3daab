//! Configuration file support for Wharf.
//!
//! Wharf supports two configuration file locations:
//! - Global: `<config dir>/config.toml` - User-wide defaults
//! - Project: `.wharf/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config, except for
//! `[security]`: a checkout may not loosen the transport policy of whoever
//! runs wharf inside it, so that table is only read from the global file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::sources::downloader::DEFAULT_TIMEOUT;
use crate::vcs::security::SecurityPolicy;

/// Wharf configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache settings
    pub cache: CacheConfig,

    /// Network settings
    pub net: NetConfig,

    /// Transport security settings
    pub security: SecurityConfig,
}

/// Cache-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root directory for checkouts
    pub dir: Option<PathBuf>,
}

/// Network-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Discovery request timeout in seconds
    pub timeout_secs: Option<u64>,

    /// Offline mode (no discovery, no scheme probing)
    pub offline: bool,
}

/// Transport security configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Allow insecure transports
    pub allow_insecure: bool,

    /// Secure schemes for git, `GIT_ALLOW_PROTOCOL` format (`https:ssh`)
    pub git_allow_protocol: Option<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.cache.dir.is_some() {
            self.cache.dir = other.cache.dir;
        }

        if other.net.timeout_secs.is_some() {
            self.net.timeout_secs = other.net.timeout_secs;
        }
        if other.net.offline {
            self.net.offline = true;
        }

        if other.security.allow_insecure {
            self.security.allow_insecure = true;
        }
        if other.security.git_allow_protocol.is_some() {
            self.security.git_allow_protocol = other.security.git_allow_protocol;
        }
    }

    /// Deadline for discovery requests.
    pub fn timeout(&self) -> Duration {
        self.net
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    /// Transport policy implied by `[security]`.
    pub fn policy(&self) -> SecurityPolicy {
        if self.security.allow_insecure {
            SecurityPolicy::Insecure
        } else {
            SecurityPolicy::SecureOnly
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.wharf/config.toml), `[security]` excluded
/// 2. Global config
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        let mut project = Config::load_or_default(project_path);
        if project.security.allow_insecure || project.security.git_allow_protocol.is_some() {
            tracing::warn!(
                "Ignoring [security] in {}; set it in the global config or pass --insecure",
                project_path.display()
            );
            project.security = SecurityConfig::default();
        }
        config.merge(project);
    }

    config
}

/// The project config path below `project_root`.
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".wharf").join("config.toml")
}
