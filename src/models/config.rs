use crate::proxy::config::{ProxyConfig, RelayConfig, StoreConfig};
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub store: StoreConfig,
    pub log_dir: Option<String>, // Overrides the data-dir log location
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }
}
