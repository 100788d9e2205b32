use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;

use lode_constants::TARBALL_CACHE_DIR;
use lode_error::{LodeError, Result};
use lode_registry::RegistryClient;
use lode_resolver::ResolvedPackage;
use lode_store::{PackageStore, verify_integrity};
use lode_utils::safe_name;

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub path: PathBuf,
    pub from_cache: bool,
}

#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// `name@version` → committed store entry. Optional packages that failed
    /// to fetch are absent here and accounted for in `warnings`.
    pub results: HashMap<String, FetchResult>,
    pub warnings: Vec<String>,
}

/// Downloads tarballs, verifies them, and commits them to the store, at
/// most `concurrency` in flight.
pub struct PackageFetcher {
    registry: Arc<RegistryClient>,
    store: Arc<PackageStore>,
    cache_dir: PathBuf,
    concurrency: usize,
    offline: bool,
}

impl PackageFetcher {
    #[must_use]
    pub fn new(
        registry: Arc<RegistryClient>,
        store: Arc<PackageStore>,
        cache_dir: PathBuf,
        concurrency: usize,
        offline: bool,
    ) -> Self {
        Self {
            registry,
            store,
            cache_dir,
            concurrency,
            offline,
        }
    }

    pub async fn fetch_all(&self, packages: &[ResolvedPackage], debug: bool) -> Result<FetchOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency.max(1)));

        let tasks: Vec<_> = packages
            .iter()
            .map(|pkg| {
                let semaphore = Arc::clone(&semaphore);
                async move {
                    let permit = semaphore
                        .acquire()
                        .await
                        .map_err(|e| LodeError::IoError(e.to_string()));
                    let result = match permit {
                        Ok(_permit) => self.fetch_one(pkg, debug).await,
                        Err(err) => Err(err),
                    };
                    (pkg.key(), pkg.optional, result)
                }
            })
            .collect();

        let mut outcome = FetchOutcome::default();
        for (key, optional, result) in join_all(tasks).await {
            match result {
                Ok(fetched) => {
                    outcome.results.insert(key, fetched);
                }
                Err(err) if optional => {
                    let warning = format!("skipping optional package {key}: {err}");
                    lode_logger::warn(&warning);
                    outcome.warnings.push(warning);
                }
                Err(err) => return Err(err),
            }
        }
        Ok(outcome)
    }

    async fn fetch_one(&self, pkg: &ResolvedPackage, debug: bool) -> Result<FetchResult> {
        // Fast path: a committed store entry needs no bytes at all.
        let store_path = self
            .store
            .path_for(&pkg.name, &pkg.version, &pkg.integrity);
        if self.store.is_complete(&store_path) {
            lode_logger::debug(&format!("store hit for {}", pkg.key()), debug);
            return Ok(FetchResult {
                path: store_path,
                from_cache: true,
            });
        }

        let tarball_path = self.tarball_cache_path(pkg);
        let (bytes, was_cached) = if tarball_path.is_file() {
            lode_logger::debug(&format!("tarball cache hit for {}", pkg.key()), debug);
            (fs::read(&tarball_path)?, true)
        } else if self.offline {
            return Err(LodeError::OfflineMiss(pkg.key()));
        } else {
            lode_logger::status(&format!("downloading {}", pkg.key()));
            (self.registry.download_tarball(&pkg.resolved).await?, false)
        };

        // Nothing unverified ever reaches the tarball cache or the store.
        if let Err(mismatch) = verify_integrity(&bytes, &pkg.integrity) {
            if was_cached {
                let _ = fs::remove_file(&tarball_path);
            }
            return Err(LodeError::IntegrityMismatch(
                pkg.key(),
                mismatch.expected,
                mismatch.actual,
            ));
        }

        if !was_cached {
            if let Some(parent) = tarball_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&tarball_path, &bytes)?;
        }

        let path = self.store.insert_from_tarball(
            &pkg.name,
            &pkg.version,
            &pkg.integrity,
            &pkg.resolved,
            &bytes,
        )?;
        Ok(FetchResult {
            path,
            from_cache: false,
        })
    }

    fn tarball_cache_path(&self, pkg: &ResolvedPackage) -> PathBuf {
        self.cache_dir.join(TARBALL_CACHE_DIR).join(format!(
            "{}-{}.tgz",
            safe_name(&pkg.name),
            pkg.version
        ))
    }
}
