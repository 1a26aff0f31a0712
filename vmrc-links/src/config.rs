//! Configuration loading for vmrc-links.
//!
//! Configuration comes from an optional TOML file, with CLI flags and the
//! `VMRC_LINKS_PASSWORD` environment variable layered on top. Nothing has a
//! baked-in credential default; host, username, and password must all be
//! supplied explicitly.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable consulted when no password is configured.
pub const PASSWORD_ENV: &str = "VMRC_LINKS_PASSWORD";

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub vcenter: VcenterConfig,
}

/// vCenter / ESXi connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VcenterConfig {
    /// Host name or address of the vCenter or ESXi endpoint
    pub host: String,
    /// HTTPS port
    #[serde(default = "default_port")]
    pub port: u16,
    /// User name for the session login
    pub username: String,
    /// Password; may instead come from --password or VMRC_LINKS_PASSWORD
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Accept invalid TLS certificates (self-signed hosts)
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_port() -> u16 {
    443
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::IoError(format!(
                "Failed to read config file {:?}: {}",
                path.as_ref(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("Failed to parse config: {e}")))?;

        Ok(config)
    }

    /// Load configuration from the default location.
    ///
    /// Searches in order:
    /// 1. `./vmrc-links.toml` (current directory)
    /// 2. `~/.config/vmrc-links/config.toml` (user config)
    /// 3. `/etc/vmrc-links/config.toml` (system config, Linux only)
    pub fn load_default() -> Result<Self, ConfigError> {
        let candidates = Self::config_search_paths();

        for path in &candidates {
            if path.exists() {
                tracing::debug!("Loading config from {:?}", path);
                return Self::load(path);
            }
        }

        Err(ConfigError::NotFound(format!(
            "No config file found. Searched: {candidates:?}"
        )))
    }

    /// Get the list of paths to search for config files.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("vmrc-links.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("vmrc-links").join("config.toml"));
        }

        #[cfg(target_os = "linux")]
        paths.push(PathBuf::from("/etc/vmrc-links/config.toml"));

        paths
    }

    /// Configuration with no connection details; everything must come from
    /// CLI flags.
    pub fn empty() -> Self {
        Self {
            vcenter: VcenterConfig {
                host: String::new(),
                port: default_port(),
                username: String::new(),
                password: None,
                accept_invalid_certs: false,
            },
        }
    }

    /// Layer CLI flag values over whatever the file provided.
    pub fn apply_overrides(
        &mut self,
        host: Option<String>,
        port: Option<u16>,
        username: Option<String>,
        password: Option<String>,
        insecure: bool,
    ) {
        if let Some(host) = host {
            self.vcenter.host = host;
        }
        if let Some(port) = port {
            self.vcenter.port = port;
        }
        if let Some(username) = username {
            self.vcenter.username = username;
        }
        if let Some(password) = password {
            self.vcenter.password = Some(password);
        }
        if insecure {
            self.vcenter.accept_invalid_certs = true;
        }
    }

    /// Effective password: configured value or the `VMRC_LINKS_PASSWORD`
    /// environment variable.
    pub fn password(&self) -> Option<String> {
        self.vcenter
            .password
            .clone()
            .or_else(|| std::env::var(PASSWORD_ENV).ok())
    }

    /// Base URL of the Automation API endpoint.
    pub fn endpoint(&self) -> String {
        format!("https://{}:{}/", self.vcenter.host, self.vcenter.port)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.vcenter.host.is_empty() {
            errors.push(
                "vcenter.host: Host name of the vCenter or ESXi endpoint (e.g., \"vcenter.example.com\")",
            );
        }

        if self.vcenter.username.is_empty() {
            errors.push(
                "vcenter.username: User name for the session login (e.g., \"administrator@vsphere.local\")",
            );
        }

        if !errors.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Configuration incomplete\n\nSet the following in the config file or as flags:\n  - {}",
                errors.join("\n  - ")
            )));
        }

        if self.vcenter.port == 0 {
            return Err(ConfigError::ValidationError(
                "vcenter.port must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
