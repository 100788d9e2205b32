pub mod config;
pub mod fetch;
pub mod install;
pub mod linker;
pub mod lockfile;

pub use config::InstallConfig;
pub use fetch::{FetchOutcome, FetchResult, PackageFetcher};
pub use install::InstallManager;
pub use linker::{LinkReport, link_module_tree};
pub use lockfile::{direct_hints, lockfile_from_resolution, resolved_from_lockfile};

use lode_registry::MetadataCache;
use lode_store::{PackageStore, StoreEntry};

pub fn install_all_deps(project_dir: &str, config: InstallConfig, debug: bool) -> anyhow::Result<()> {
    let manager = InstallManager::new(config);
    manager
        .install(project_dir, debug)
        .map_err(|e| anyhow::anyhow!(e))
}

/// Empty the metadata cache and drop every cached tarball.
pub fn clean_caches(config: &InstallConfig) -> anyhow::Result<()> {
    let metadata = MetadataCache::new(config.cache_dir.join("metadata"));
    metadata.clear()?;

    let tarballs = config.cache_dir.join(lode_constants::TARBALL_CACHE_DIR);
    if tarballs.exists() {
        std::fs::remove_dir_all(&tarballs)?;
    }
    Ok(())
}

/// Shrink the metadata cache back under its size budget.
pub fn prune_caches(config: &InstallConfig) -> anyhow::Result<()> {
    let metadata = MetadataCache::new(config.cache_dir.join("metadata"));
    metadata.prune()?;
    Ok(())
}

#[must_use]
pub fn list_store(config: &InstallConfig) -> Vec<StoreEntry> {
    PackageStore::new(config.store_dir.clone()).list()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_maintenance_works_on_a_custom_cache_dir() {
        let td = tempfile::tempdir().unwrap();
        let config = InstallConfig {
            store_dir: td.path().join("store"),
            cache_dir: td.path().join("cache"),
            ..InstallConfig::default()
        };

        let metadata = MetadataCache::new(config.cache_dir.join("metadata"));
        metadata.set("lodash", true, "{}").unwrap();
        let tarballs = config.cache_dir.join(lode_constants::TARBALL_CACHE_DIR);
        std::fs::create_dir_all(&tarballs).unwrap();
        std::fs::write(tarballs.join("lodash-1.0.0.tgz"), b"x").unwrap();

        // well under budget, so pruning keeps everything
        prune_caches(&config).unwrap();
        assert!(metadata.get("lodash", true).is_some());

        clean_caches(&config).unwrap();
        assert!(metadata.get("lodash", true).is_none());
        assert!(!tarballs.exists());

        assert!(list_store(&config).is_empty());
    }
}
