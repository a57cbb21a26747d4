//! Configuration types for the lease recorder
//!
//! The hook binary fills these from environment variables; embedders can
//! build or deserialize them directly.

use serde::{Deserialize, Serialize};

/// Default Consul agent address
pub const DEFAULT_CONSUL_ADDRESS: &str = "127.0.0.1:8500";

/// Default HTTP timeout towards the store (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Which backend lease records are mirrored into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Consul KV over HTTP
    Consul(ConsulConfig),

    /// Local JSON file
    File {
        /// Path to the store file
        path: String,
    },

    /// In-memory store (not persistent)
    Memory,
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::Consul(consul) => consul.validate(),
            StoreConfig::File { path } => {
                if path.is_empty() {
                    return Err(crate::Error::config("File store path cannot be empty"));
                }
                Ok(())
            }
            StoreConfig::Memory => Ok(()),
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &'static str {
        match self {
            StoreConfig::Consul(_) => "consul",
            StoreConfig::File { .. } => "file",
            StoreConfig::Memory => "memory",
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Consul(ConsulConfig::default())
    }
}

/// Consul agent connection settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsulConfig {
    /// `host:port` or a full `http(s)://host:port` URL
    #[serde(default = "default_consul_address")]
    pub address: String,

    /// Use https when `address` carries no scheme
    #[serde(default)]
    pub use_tls: bool,

    /// ACL token sent as `X-Consul-Token`
    #[serde(default)]
    pub token: Option<String>,

    /// Datacenter to address (agent's own when unset)
    #[serde(default)]
    pub datacenter: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ConsulConfig {
    /// Validate the Consul settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.address.trim().is_empty() {
            return Err(crate::Error::config("Consul address cannot be empty"));
        }
        if let Some((scheme, _)) = self.address.split_once("://")
            && scheme != "http"
            && scheme != "https"
        {
            return Err(crate::Error::config(format!(
                "Consul address must use http or https. Got: {}",
                self.address
            )));
        }
        if !(1..=300).contains(&self.timeout_secs) {
            return Err(crate::Error::config(format!(
                "Store timeout must be between 1 and 300 seconds. Got: {}",
                self.timeout_secs
            )));
        }
        if self.datacenter.as_deref() == Some("") {
            return Err(crate::Error::config("Consul datacenter cannot be empty"));
        }
        Ok(())
    }

    /// Base URL of the agent's HTTP API, without trailing slash
    pub fn base_url(&self) -> String {
        let address = self.address.trim().trim_end_matches('/');
        if address.contains("://") {
            address.to_string()
        } else if self.use_tls {
            format!("https://{}", address)
        } else {
            format!("http://{}", address)
        }
    }
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: default_consul_address(),
            use_tls: false,
            token: None,
            datacenter: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

// The token must never reach logs
impl std::fmt::Debug for ConsulConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsulConfig")
            .field("address", &self.address)
            .field("use_tls", &self.use_tls)
            .field("token", &self.token.as_ref().map(|_| "<REDACTED>"))
            .field("datacenter", &self.datacenter)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_consul_address() -> String {
    DEFAULT_CONSUL_ADDRESS.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
