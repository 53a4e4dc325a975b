//! Node configuration (TOML).
//!
//! ```toml
//! [listen]
//! host = "0.0.0.0"
//! port = 9999
//!
//! [auth]
//! username = "crackd"
//! password = "change-me"
//!
//! [storage]
//! data_dir = "/var/lib/crackd"
//!
//! [engine]
//! binary = "hashcat"
//! status_timer_secs = 10
//! grace_period_secs = 5
//! ```
//!
//! Only `[auth]` is mandatory. TLS termination is expected in front of
//! the node (reverse proxy or tunnel); the listener itself is plain HTTP.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crackd_core::{CrackdError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub listen: ListenConfig,
    pub auth: AuthSection,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub engine: EngineSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSection {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    #[serde(default = "default_binary")]
    pub binary: PathBuf,
    #[serde(default = "default_status_timer")]
    pub status_timer_secs: u64,
    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            status_timer_secs: default_status_timer(),
            grace_period_secs: default_grace_period(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9999
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("crackd")
}

fn default_binary() -> PathBuf {
    PathBuf::from("hashcat")
}

fn default_status_timer() -> u64 {
    10
}

fn default_grace_period() -> u64 {
    5
}

impl NodeConfig {
    /// Loads the configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                CrackdError::not_found("config file", path.display().to_string())
            } else {
                err.into()
            }
        })?;
        toml::from_str(&content).map_err(|err| CrackdError::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        })
    }

    /// `host:port` string for the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen.host, self.listen.port)
    }
}
