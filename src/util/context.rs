//! Global context for Wharf operations.
//!
//! Provides centralized access to configuration, paths, and environment.
//! This is the only place the process environment is read: everything
//! below receives explicit values.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};

use crate::resolver::discovery::HttpFetcher;
use crate::sources::Downloader;
use crate::util::config::{load_config, project_config_path, Config};
use crate::util::process::SystemRunner;
use crate::vcs::security::{ProtocolAllowList, SecurityPolicy, GIT_ALLOW_PROTOCOL_ENV};

/// Project directories for Wharf
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("com", "wharf", "wharf"));

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Directory holding the global config file
    config_dir: PathBuf,

    /// Cache root used when neither flag nor config names one
    default_cache_dir: PathBuf,

    /// Merged global and project configuration
    config: Config,

    /// `GIT_ALLOW_PROTOCOL`, captured once
    git_allow_protocol_env: Option<String>,

    /// Command-line overrides
    cache_dir_override: Option<PathBuf>,
    insecure: bool,
    offline: bool,
}

impl GlobalContext {
    /// Create a new GlobalContext from the process environment.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::build(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Result<Self> {
        Ok(Self::build(cwd))
    }

    fn build(cwd: PathBuf) -> Self {
        let (config_dir, default_cache_dir) = match PROJECT_DIRS.as_ref() {
            Some(dirs) => (
                dirs.config_dir().to_path_buf(),
                dirs.cache_dir().to_path_buf(),
            ),
            None => {
                // Fallback to ~/.wharf
                let home = BaseDirs::new()
                    .map(|b| b.home_dir().join(".wharf"))
                    .unwrap_or_else(|| PathBuf::from(".wharf"));
                (home.clone(), home.join("cache"))
            }
        };

        let config = load_config(&config_dir.join("config.toml"), &project_config_path(&cwd));
        let git_allow_protocol_env = std::env::var(GIT_ALLOW_PROTOCOL_ENV).ok();

        GlobalContext {
            cwd,
            config_dir,
            default_cache_dir,
            config,
            git_allow_protocol_env,
            cache_dir_override: None,
            insecure: false,
            offline: false,
        }
    }

    /// Replace the loaded configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Replace the captured `GIT_ALLOW_PROTOCOL` value.
    pub fn with_git_allow_protocol_env(mut self, value: Option<String>) -> Self {
        self.git_allow_protocol_env = value;
        self
    }

    /// Use `dir` as cache root regardless of configuration.
    pub fn set_cache_dir(&mut self, dir: Option<PathBuf>) {
        self.cache_dir_override = dir;
    }

    /// Allow insecure transports regardless of configuration.
    pub fn set_insecure(&mut self, insecure: bool) {
        self.insecure = insecure;
    }

    /// Work offline regardless of configuration.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The cache root: flag, then config, then the platform cache directory.
    pub fn cache_dir(&self) -> PathBuf {
        let dir = self
            .cache_dir_override
            .clone()
            .or_else(|| self.config.cache.dir.clone())
            .unwrap_or_else(|| self.default_cache_dir.clone());
        if dir.is_absolute() {
            dir
        } else {
            self.cwd.join(dir)
        }
    }

    pub fn policy(&self) -> SecurityPolicy {
        if self.insecure {
            SecurityPolicy::Insecure
        } else {
            self.config.policy()
        }
    }

    pub fn is_offline(&self) -> bool {
        self.offline || self.config.net.offline
    }

    /// The git allow-list; the environment wins over the config file.
    pub fn allow_list(&self) -> Option<ProtocolAllowList> {
        self.git_allow_protocol_env
            .as_deref()
            .or(self.config.security.git_allow_protocol.as_deref())
            .and_then(ProtocolAllowList::git)
    }

    /// A downloader for this context's cache, policy and network settings.
    pub fn downloader(&self) -> Result<Downloader> {
        let fetcher = HttpFetcher::new(self.config.timeout())?;
        Ok(Downloader::with_parts(
            self.cache_dir(),
            self.policy(),
            Box::new(fetcher),
            Box::new(SystemRunner),
        )
        .with_allow_list(self.allow_list())
        .offline(self.is_offline()))
    }
}
