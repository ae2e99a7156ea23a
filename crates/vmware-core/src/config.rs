//! Configuration management for vmware-mcp
//!
//! Values come from built-in defaults, then an optional JSON file, then
//! environment variables. Later sources win.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::paths::Paths;

pub const ENV_CONFIG_FILE: &str = "VMWARE_MCP_CONFIG";
pub const ENV_HOST: &str = "VMWARE_HOST";
pub const ENV_PORT: &str = "VMWARE_PORT";
pub const ENV_USERNAME: &str = "VMWARE_USERNAME";
pub const ENV_PASSWORD: &str = "VMWARE_PASSWORD";
pub const ENV_VMRUN_PATH: &str = "VMRUN_PATH";
pub const ENV_VMCLI_PATH: &str = "VMCLI_PATH";
pub const ENV_STRICT_IDS: &str = "VMWARE_STRICT_IDS";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// REST API connection settings
    #[serde(default)]
    pub rest: RestConfig,

    /// Path to the vmrun executable
    #[serde(default = "default_vmrun_path")]
    pub vmrun_path: PathBuf,

    /// Path to the vmcli executable
    #[serde(default = "default_vmcli_path")]
    pub vmcli_path: PathBuf,

    /// Fail fast when a vm_id cannot be resolved to a .vmx path
    #[serde(default)]
    pub strict_ids: bool,
}

fn default_vmrun_path() -> PathBuf {
    Paths::new().executable("vmrun")
}

fn default_vmcli_path() -> PathBuf {
    Paths::new().executable("vmcli")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rest: RestConfig::default(),
            vmrun_path: default_vmrun_path(),
            vmcli_path: default_vmcli_path(),
            strict_ids: false,
        }
    }
}

/// Connection settings for the Workstation REST API (vmrest)
#[derive(Clone, Serialize, Deserialize)]
pub struct RestConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Basic auth user; empty disables authentication
    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8697
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: String::new(),
            password: String::new(),
        }
    }
}

impl fmt::Debug for RestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &if self.password.is_empty() { "" } else { "***" })
            .finish()
    }
}

impl RestConfig {
    /// Base URL every REST path is appended to
    pub fn base_url(&self) -> String {
        format!("http://{}:{}/api", self.host, self.port)
    }

    /// Credentials for basic auth, if a username is configured
    pub fn credentials(&self) -> Option<(String, String)> {
        if self.username.is_empty() {
            None
        } else {
            Some((self.username.clone(), self.password.clone()))
        }
    }
}

impl Config {
    /// Load config from the default file location and the process environment
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_FILE)
            .map(PathBuf::from)
            .unwrap_or_else(|_| Paths::new().config_file());

        let mut config = Self::from_file(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load config from file, falling back to defaults when it does not exist
    pub fn from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Override fields from environment-style lookups
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(ENV_HOST) {
            self.rest.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.rest.port = port
                .trim()
                .parse()
                .with_context(|| format!("{} must be a port number, got {:?}", ENV_PORT, port))?;
        }
        if let Some(username) = lookup(ENV_USERNAME) {
            self.rest.username = username;
        }
        if let Some(password) = lookup(ENV_PASSWORD) {
            self.rest.password = password;
        }
        if let Some(path) = lookup(ENV_VMRUN_PATH) {
            self.vmrun_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(ENV_VMCLI_PATH) {
            self.vmcli_path = PathBuf::from(path);
        }
        if let Some(flag) = lookup(ENV_STRICT_IDS) {
            self.strict_ids = parse_flag(&flag);
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
