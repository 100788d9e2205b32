use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;

use lode_constants::LOCKFILE_NAME;
use lode_error::{LodeError, Result};
use lode_lock::Lockfile;
use lode_project::{PackageJson, read_package_json};
use lode_registry::{MetadataCache, RegistryClient};
use lode_resolver::{DependencyResolver, ResolvedPackage, ResolverOptions};
use lode_store::PackageStore;

use crate::config::InstallConfig;
use crate::fetch::PackageFetcher;
use crate::linker::link_module_tree;
use crate::lockfile::{direct_hints, lockfile_from_resolution, resolved_from_lockfile};

pub struct InstallManager {
    config: InstallConfig,
}

impl InstallManager {
    #[must_use]
    pub fn new(config: InstallConfig) -> Self {
        Self { config }
    }

    pub fn install(&self, project_dir: &str, debug: bool) -> Result<()> {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| LodeError::IoError(format!("failed to create async runtime: {e}")))?;
        rt.block_on(self.install_async(Path::new(project_dir), debug))
    }

    async fn install_async(&self, project_dir: &Path, debug: bool) -> Result<()> {
        let manifest = read_package_json(project_dir)
            .map_err(|e| LodeError::ManifestError(e.to_string()))?;
        let lock_path = project_dir.join(LOCKFILE_NAME);

        let registry = Arc::new(RegistryClient::new(
            &self.config.registry,
            self.config.token.clone(),
        ));
        let store = Arc::new(PackageStore::new(self.config.store_dir.clone()));

        let (mut flat, hints, fresh_resolution) =
            self.resolve_flat(&manifest, &lock_path, &registry).await?;

        if self.config.production {
            flat.retain(|_, pkg| !pkg.dev);
        }

        let packages: Vec<ResolvedPackage> = flat.values().cloned().collect();
        lode_logger::status(&format!("fetching {} packages", packages.len()));
        let fetcher = PackageFetcher::new(
            Arc::clone(&registry),
            Arc::clone(&store),
            self.config.cache_dir.clone(),
            self.config.concurrency,
            self.config.offline,
        );
        let outcome = fetcher.fetch_all(&packages, debug).await?;

        let report = link_module_tree(project_dir, &flat, &outcome.results, &hints)?;

        // The lockfile commits only after a successful link, so a failed
        // install leaves the previous snapshot intact.
        if fresh_resolution {
            lockfile_from_resolution(&flat, &manifest).save(&lock_path)?;
        }

        lode_logger::finish(&format!(
            "installed {} packages, {} linked, {} binaries",
            flat.len(),
            report.linked,
            report.binaries_installed
        ));
        Ok(())
    }

    /// Produce the flat set: from the lockfile when frozen (strictly) or
    /// when it is simply still up to date, from the resolver otherwise.
    /// The returned flag says whether a fresh resolution happened, i.e.
    /// whether the lockfile needs rewriting.
    async fn resolve_flat(
        &self,
        manifest: &PackageJson,
        lock_path: &Path,
        registry: &Arc<RegistryClient>,
    ) -> Result<(
        HashMap<String, ResolvedPackage>,
        HashMap<String, String>,
        bool,
    )> {
        if self.config.frozen {
            let lock = Lockfile::load(lock_path)?.ok_or(LodeError::LockfileOutOfDate)?;
            if !lockfile_matches(&lock, manifest) {
                return Err(LodeError::LockfileOutOfDate);
            }
            lode_logger::status("installing from frozen lockfile");
            let flat = resolved_from_lockfile(&lock);
            let hints = direct_hints(&lock, &flat);
            return Ok((flat, hints, false));
        }

        match Lockfile::load(lock_path) {
            Ok(Some(lock)) if lockfile_matches(&lock, manifest) => {
                lode_logger::status("lockfile is up to date");
                let flat = resolved_from_lockfile(&lock);
                let hints = direct_hints(&lock, &flat);
                return Ok((flat, hints, false));
            }
            Ok(_) => {}
            Err(err) => {
                lode_logger::warn(&format!("ignoring unusable lockfile: {err}"));
            }
        }

        lode_logger::status("resolving dependency tree");
        let metadata_cache = Arc::new(MetadataCache::new(self.config.cache_dir.join("metadata")));
        let resolver = DependencyResolver::new(
            Arc::clone(registry),
            metadata_cache,
            ResolverOptions {
                production: self.config.production,
                prefer_offline: self.config.prefer_offline || self.config.offline,
                auto_install_peers: self.config.auto_install_peers,
                strict_peer_dependencies: self.config.strict_peer_dependencies,
            },
        );
        let resolution = resolver.resolve(manifest).await?;
        let hints = resolution
            .root
            .iter()
            .map(|(name, node)| (name.clone(), node.version.clone()))
            .collect();
        Ok((resolution.flat, hints, true))
    }
}

fn lockfile_matches(lock: &Lockfile, manifest: &PackageJson) -> bool {
    lock.is_up_to_date(
        dep_pairs(manifest.dependencies.as_ref()),
        dep_pairs(manifest.dev_dependencies.as_ref()),
    )
}

fn dep_pairs(map: Option<&IndexMap<String, String>>) -> impl Iterator<Item = (&str, &str)> {
    map.into_iter()
        .flatten()
        .map(|(k, v)| (k.as_str(), v.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use lode_constants::{MODULES_DIR, TARBALL_CACHE_DIR};
    use lode_store::{create_tarball, integrity_for};

    fn config_in(td: &tempfile::TempDir) -> InstallConfig {
        InstallConfig {
            store_dir: td.path().join("store"),
            cache_dir: td.path().join("cache"),
            offline: true,
            ..InstallConfig::default()
        }
    }

    #[test]
    fn frozen_without_lockfile_fails_without_side_effects() {
        let td = tempfile::tempdir().unwrap();
        let project = td.path().join("project");
        fs::create_dir_all(&project).unwrap();
        fs::write(
            project.join("package.json"),
            r#"{"name":"app","dependencies":{"e":"^1.0.0"}}"#,
        )
        .unwrap();

        let config = InstallConfig {
            frozen: true,
            ..config_in(&td)
        };
        let err = InstallManager::new(config).install(project.to_str().unwrap(), false);

        assert!(matches!(err, Err(LodeError::LockfileOutOfDate)));
        assert!(!project.join(MODULES_DIR).exists());
        assert!(!td.path().join("store").exists());
    }

    #[test]
    fn frozen_with_stale_lockfile_fails() {
        let td = tempfile::tempdir().unwrap();
        let project = td.path().join("project");
        fs::create_dir_all(&project).unwrap();
        // manifest gained a dependency the lockfile has no key for
        fs::write(
            project.join("package.json"),
            r#"{"name":"app","dependencies":{"e":"^1.0.0"}}"#,
        )
        .unwrap();
        fs::write(
            project.join(LOCKFILE_NAME),
            "{\n  \"version\": 1,\n  \"dependencies\": {},\n  \"devDependencies\": {},\n  \"packages\": {}\n}\n",
        )
        .unwrap();

        let config = InstallConfig {
            frozen: true,
            ..config_in(&td)
        };
        let err = InstallManager::new(config).install(project.to_str().unwrap(), false);

        assert!(matches!(err, Err(LodeError::LockfileOutOfDate)));
        assert!(!project.join(MODULES_DIR).exists());
    }

    #[test]
    fn frozen_install_from_lockfile_and_tarball_cache_is_fully_offline() {
        let td = tempfile::tempdir().unwrap();
        let project = td.path().join("project");
        fs::create_dir_all(&project).unwrap();

        // package payload, staged into the tarball cache
        let src = tempfile::tempdir().unwrap();
        fs::write(
            src.path().join("package.json"),
            r#"{"name":"demo","version":"1.0.0"}"#,
        )
        .unwrap();
        fs::write(src.path().join("index.js"), "module.exports = 1;").unwrap();
        let bytes = create_tarball(src.path()).unwrap();
        let integrity = integrity_for(&bytes);

        let tarball_dir = td.path().join("cache").join(TARBALL_CACHE_DIR);
        fs::create_dir_all(&tarball_dir).unwrap();
        fs::write(tarball_dir.join("demo-1.0.0.tgz"), &bytes).unwrap();

        fs::write(
            project.join("package.json"),
            r#"{"name":"app","dependencies":{"demo":"^1.0.0"}}"#,
        )
        .unwrap();
        fs::write(
            project.join(LOCKFILE_NAME),
            format!(
                concat!(
                    "{{\n",
                    "  \"version\": 1,\n",
                    "  \"dependencies\": {{\n    \"demo\": \"^1.0.0\"\n  }},\n",
                    "  \"devDependencies\": {{}},\n",
                    "  \"packages\": {{\n",
                    "    \"demo@1.0.0\": {{\n",
                    "      \"version\": \"1.0.0\",\n",
                    "      \"resolved\": \"https://registry.invalid/demo.tgz\",\n",
                    "      \"integrity\": \"{integrity}\"\n",
                    "    }}\n",
                    "  }}\n",
                    "}}\n"
                ),
                integrity = integrity
            ),
        )
        .unwrap();

        let config = InstallConfig {
            frozen: true,
            ..config_in(&td)
        };
        InstallManager::new(config)
            .install(project.to_str().unwrap(), false)
            .unwrap();

        let installed = project.join(MODULES_DIR).join("demo");
        assert!(installed.join("package.json").is_file());
        assert!(installed.join("index.js").is_file());
    }
}
