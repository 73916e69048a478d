//! Server configuration.
//!
//! Loaded from an optional YAML file and overridden by CLI flags.
//!
//! ```yaml
//! listen:
//!   host: 127.0.0.1
//!   port: 7564
//! controlPrefix: __mockspace__
//! urlComparison: path
//! ```

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

pub const DEFAULT_CONTROL_PREFIX: &str = "__mockspace__";
pub const DEFAULT_PORT: u16 = 7564;

/// How exact rule URLs are compared with the request URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum UrlComparison {
    /// Compare the path only; a query string in a registered URL becomes a
    /// query parameter matcher.
    #[default]
    Path,
    /// Compare path and query string literally.
    PathAndQuery,
}

impl std::str::FromStr for UrlComparison {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "path" => Ok(UrlComparison::Path),
            "pathAndQuery" | "path-and-query" => Ok(UrlComparison::PathAndQuery),
            other => Err(format!(
                "unknown url comparison '{other}', expected 'path' or 'pathAndQuery'"
            )),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_control_prefix() -> String {
    DEFAULT_CONTROL_PREFIX.to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default)]
    pub listen: ListenConfig,
    /// First path segment reserved for control operations.
    #[serde(default = "default_control_prefix")]
    pub control_prefix: String,
    #[serde(default)]
    pub url_comparison: UrlComparison,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            control_prefix: default_control_prefix(),
            url_comparison: UrlComparison::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        let config: ServerConfig = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.control_prefix.is_empty() {
            anyhow::bail!("controlPrefix must not be empty");
        }
        if self.control_prefix.contains('/') {
            anyhow::bail!(
                "controlPrefix must be a single path segment, got '{}'",
                self.control_prefix
            );
        }
        self.socket_addr()?;
        Ok(())
    }

    /// Address to bind. Port 0 lets the OS pick one.
    pub fn socket_addr(&self) -> Result<SocketAddr, anyhow::Error> {
        let host = if self.listen.host == "localhost" {
            "127.0.0.1"
        } else {
            self.listen.host.as_str()
        };
        let ip: IpAddr = host
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen host '{}': {e}", self.listen.host))?;
        Ok(SocketAddr::new(ip, self.listen.port))
    }
}
