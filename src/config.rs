//! Configuration loading.
//!
//! Settings come from an optional TOML file and are then overridden by
//! environment variables. The remote credential is only ever read from the
//! environment.
//!
//! ```toml
//! [store.local]
//! root = "../brain"
//!
//! [store.remote]
//! owner = "acme"
//! repo = "brain"
//! branch = "main"
//!
//! [server]
//! bind = "127.0.0.1:7340"
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `GITHUB_TOKEN` | `store.remote.token` (env only) |
//! | `GITHUB_OWNER` | `store.remote.owner` |
//! | `GITHUB_REPO` | `store.remote.repo` |
//! | `GITHUB_BRANCH` | `store.remote.branch` |
//! | `BRAIN_NOTES_DIR` | `store.local.root` |

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocalConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            follow_symlinks: false,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("../brain")
}

#[derive(Debug, Deserialize, Clone)]
pub struct RemoteConfig {
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on contents API requests in flight at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Enables token-aware create/update/delete against the remote.
    #[serde(default)]
    pub allow_writes: bool,
    /// Bearer credential. Never read from the config file.
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            owner: None,
            repo: None,
            branch: default_branch(),
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
            max_concurrency: default_max_concurrency(),
            allow_writes: false,
            token: None,
        }
    }
}

fn default_branch() -> String {
    "main".to_string()
}
fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_concurrency() -> usize {
    8
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

impl Config {
    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` in place of the process environment.
    /// Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let remote = &mut self.store.remote;

        if let Some(token) = get("GITHUB_TOKEN") {
            remote.token = Some(token);
        }
        if let Some(owner) = get("GITHUB_OWNER") {
            remote.owner = Some(owner);
        }
        if let Some(repo) = get("GITHUB_REPO") {
            remote.repo = Some(repo);
        }
        if let Some(branch) = get("GITHUB_BRANCH") {
            remote.branch = branch;
        }
        if let Some(root) = get("BRAIN_NOTES_DIR") {
            self.store.local.root = PathBuf::from(root);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.remote.timeout_secs == 0 {
            anyhow::bail!("store.remote.timeout_secs must be > 0");
        }
        if self.store.remote.max_concurrency == 0 {
            anyhow::bail!("store.remote.max_concurrency must be > 0");
        }
        if self.store.remote.branch.trim().is_empty() {
            anyhow::bail!("store.remote.branch must not be empty");
        }
        if self.server.bind.trim().is_empty() {
            anyhow::bail!("server.bind must not be empty");
        }
        Ok(())
    }
}

/// Load the config file at `path`, falling back to defaults when it does
/// not exist, then apply environment overrides and validate.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    config.apply_env();
    config.validate()?;
    Ok(config)
}
