use std::path::PathBuf;

use lode_constants::{DEFAULT_CONCURRENCY, DEFAULT_REGISTRY};
use lode_store::{default_cache_root, default_store_root};

/// Everything the install pipeline consumes from the command layer.
#[derive(Debug, Clone)]
pub struct InstallConfig {
    pub registry: String,
    pub token: Option<String>,
    pub store_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub concurrency: usize,
    pub offline: bool,
    pub prefer_offline: bool,
    pub frozen: bool,
    pub production: bool,
    pub auto_install_peers: bool,
    pub strict_peer_dependencies: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            registry: DEFAULT_REGISTRY.to_string(),
            token: None,
            store_dir: default_store_root(),
            cache_dir: default_cache_root(),
            concurrency: DEFAULT_CONCURRENCY,
            offline: false,
            prefer_offline: false,
            frozen: false,
            production: false,
            auto_install_peers: true,
            strict_peer_dependencies: false,
        }
    }
}
