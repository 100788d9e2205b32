use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, join_all};
use tokio::sync::{Mutex, OnceCell};

use lode_error::{LodeError, Result};
use lode_project::{BinField, PackageJson};
use lode_registry::{MetadataCache, Packument, RegistryClient, VersionRecord};
use lode_utils::split_alias;

use crate::semver::max_satisfying;

#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    pub production: bool,
    pub prefer_offline: bool,
    pub auto_install_peers: bool,
    pub strict_peer_dependencies: bool,
}

/// One node of the flat resolution set.
///
/// `name` is the *declared* name: for `npm:` aliases it is the key the
/// parent uses, so the module tree and the lockfile stay keyed the way the
/// manifest spelled it, while `resolved`/`integrity` come from the real
/// package's metadata.
#[derive(Debug, Clone, Default)]
pub struct ResolvedPackage {
    pub name: String,
    pub version: String,
    /// Tarball URL.
    pub resolved: String,
    /// `algo-base64digest`; synthesized from the shasum when the registry
    /// carries no integrity field.
    pub integrity: String,
    pub dependencies: HashMap<String, String>,
    pub optional_dependencies: HashMap<String, String>,
    pub peer_dependencies: HashMap<String, String>,
    /// Normalized bin map: name → relative executable path.
    pub bin: HashMap<String, String>,
    pub optional: bool,
    pub dev: bool,
}

impl ResolvedPackage {
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

#[derive(Debug, Clone)]
pub struct DependencyNode {
    pub name: String,
    pub version: String,
    pub dev: bool,
    pub optional: bool,
}

#[derive(Debug, Default)]
pub struct Resolution {
    /// Direct dependencies with the version chosen for each; the linker
    /// uses these as hoisting hints.
    pub root: HashMap<String, DependencyNode>,
    pub flat: HashMap<String, ResolvedPackage>,
    pub warnings: Vec<String>,
}

pub struct DependencyResolver {
    registry: Arc<RegistryClient>,
    cache: Arc<MetadataCache>,
    opts: ResolverOptions,
    /// Per-name packument cells. The cell doubles as the in-memory cache and
    /// the in-flight map: concurrent lookups for one name coalesce into a
    /// single fetch.
    metadata: Mutex<HashMap<String, Arc<OnceCell<Arc<Packument>>>>>,
    flat: Mutex<HashMap<String, ResolvedPackage>>,
    warnings: Mutex<Vec<String>>,
}

impl DependencyResolver {
    #[must_use]
    pub fn new(
        registry: Arc<RegistryClient>,
        cache: Arc<MetadataCache>,
        opts: ResolverOptions,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            cache,
            opts,
            metadata: Mutex::new(HashMap::new()),
            flat: Mutex::new(HashMap::new()),
            warnings: Mutex::new(Vec::new()),
        })
    }

    /// Resolve every direct dependency of `manifest` concurrently and return
    /// the deduplicated flat set.
    pub async fn resolve(self: &Arc<Self>, manifest: &PackageJson) -> Result<Resolution> {
        let direct = manifest.direct_dependencies(self.opts.production);

        let tasks: Vec<_> = direct
            .into_iter()
            .map(|(name, range, dev, optional)| {
                let resolver = Arc::clone(self);
                async move {
                    let result = resolver
                        .resolve_dep(name.clone(), range, dev, optional, false, HashSet::new())
                        .await;
                    (name, optional, result)
                }
            })
            .collect();

        let mut root = HashMap::new();
        for (name, optional, result) in join_all(tasks).await {
            match result {
                Ok(Some(node)) => {
                    root.insert(name, node);
                }
                Ok(None) => {}
                Err(err) if optional => {
                    self.warn(format!("skipping optional dependency {name}: {err}"))
                        .await;
                }
                Err(err) => return Err(err),
            }
        }

        let flat = self.flat.lock().await.clone();
        let warnings = self.warnings.lock().await.clone();
        Ok(Resolution {
            root,
            flat,
            warnings,
        })
    }

    fn resolve_dep(
        self: Arc<Self>,
        declared_name: String,
        range: String,
        dev: bool,
        optional: bool,
        _peer: bool,
        mut seen: HashSet<String>,
    ) -> BoxFuture<'static, Result<Option<DependencyNode>>> {
        async move {
            let (real_name, real_range) = split_alias(&declared_name, &range);

            // Per-path cycle guard; each descent gets its own clone so
            // sibling subtrees do not shadow one another.
            if !seen.insert(format!("{declared_name}@{range}")) {
                return Ok(None);
            }

            let doc = self.metadata(&real_name).await?;

            let Some(version) =
                max_satisfying(doc.versions.keys().map(String::as_str), &real_range)
            else {
                return Err(LodeError::NoSatisfyingVersion(real_name, real_range));
            };

            let key = format!("{declared_name}@{version}");
            {
                let mut flat = self.flat.lock().await;
                if let Some(existing) = flat.get_mut(&key) {
                    // A second path reached the same record. The record
                    // stays dev-only or optional only while every path
                    // agrees, and the merge is commutative, so the flags
                    // do not depend on which task inserted first.
                    existing.dev = existing.dev && dev;
                    existing.optional = existing.optional && optional;
                    return Ok(Some(DependencyNode {
                        name: declared_name,
                        version,
                        dev,
                        optional,
                    }));
                }
            }

            let Some(record) = doc.versions.get(&version) else {
                return Err(LodeError::NoSatisfyingVersion(real_name, real_range));
            };

            if let Some(msg) = record.deprecation_message() {
                self.warn(format!("{declared_name}@{version} is deprecated: {msg}"))
                    .await;
            }

            let pkg = build_package(&declared_name, &real_name, &version, record, dev, optional);
            {
                // First writer wins the record; a racing sibling resolved
                // the same metadata, so only the flags need reconciling.
                let mut flat = self.flat.lock().await;
                flat.entry(key)
                    .and_modify(|existing| {
                        existing.dev = existing.dev && dev;
                        existing.optional = existing.optional && optional;
                    })
                    .or_insert(pkg);
            }

            let tasks: Vec<_> = self
                .transitive_list(record, dev, optional)
                .into_iter()
                .map(|(dep_name, dep_range, dep_dev, dep_optional, dep_peer)| {
                    let resolver = Arc::clone(&self);
                    let seen = seen.clone();
                    async move {
                        let result = resolver
                            .resolve_dep(
                                dep_name.clone(),
                                dep_range,
                                dep_dev,
                                dep_optional,
                                dep_peer,
                                seen,
                            )
                            .await;
                        (dep_name, dep_optional, dep_peer, result)
                    }
                })
                .collect();

            for (dep_name, dep_optional, dep_peer, result) in join_all(tasks).await {
                if let Err(err) = result {
                    if dep_optional {
                        self.warn(format!(
                            "skipping optional dependency {dep_name} of {declared_name}: {err}"
                        ))
                        .await;
                    } else if dep_peer && !self.opts.strict_peer_dependencies {
                        self.warn(format!(
                            "unmet peer dependency {dep_name} of {declared_name}: {err}"
                        ))
                        .await;
                    } else {
                        return Err(err);
                    }
                }
            }

            Ok(Some(DependencyNode {
                name: declared_name,
                version,
                dev,
                optional,
            }))
        }
        .boxed()
    }

    /// Transitive dependencies to descend into: regular deps, optional deps
    /// (flagged), and peers when auto-install is on. An optional peer is
    /// skipped entirely unless strict mode insists on it.
    fn transitive_list(
        &self,
        record: &VersionRecord,
        dev: bool,
        optional: bool,
    ) -> Vec<(String, String, bool, bool, bool)> {
        let mut out = Vec::new();
        for (name, range) in &record.dependencies {
            if record.optional_dependencies.contains_key(name) {
                continue;
            }
            out.push((name.clone(), range.clone(), dev, optional, false));
        }
        for (name, range) in &record.optional_dependencies {
            out.push((name.clone(), range.clone(), dev, true, false));
        }
        if self.opts.auto_install_peers {
            for (name, range) in &record.peer_dependencies {
                let peer_optional = record
                    .peer_dependencies_meta
                    .get(name)
                    .is_some_and(|meta| meta.optional);
                if peer_optional && !self.opts.strict_peer_dependencies {
                    continue;
                }
                out.push((name.clone(), range.clone(), dev, optional, true));
            }
        }
        out
    }

    /// Abbreviated metadata for `name`: in-memory cell first (which also
    /// coalesces concurrent fetches), then the disk cache when offline is
    /// preferred, then the network. Network results populate both caches.
    async fn metadata(&self, name: &str) -> Result<Arc<Packument>> {
        let cell = {
            let mut map = self.metadata.lock().await;
            Arc::clone(map.entry(name.to_string()).or_default())
        };
        let doc = cell.get_or_try_init(|| self.fetch_metadata(name)).await?;
        Ok(Arc::clone(doc))
    }

    async fn fetch_metadata(&self, name: &str) -> Result<Arc<Packument>> {
        if self.opts.prefer_offline
            && let Some(json) = self.cache.get(name, true)
            && let Ok(doc) = serde_json::from_str::<Packument>(&json)
        {
            return Ok(Arc::new(doc));
        }

        let doc = self.registry.get_abbreviated(name).await?;
        if let Ok(json) = serde_json::to_string(&doc)
            && let Err(err) = self.cache.set(name, true, &json)
        {
            lode_logger::warn(&format!("failed to cache metadata for {name}: {err}"));
        }
        Ok(Arc::new(doc))
    }

    async fn warn(&self, message: String) {
        lode_logger::warn(&message);
        self.warnings.lock().await.push(message);
    }
}

fn build_package(
    declared_name: &str,
    real_name: &str,
    version: &str,
    record: &VersionRecord,
    dev: bool,
    optional: bool,
) -> ResolvedPackage {
    let integrity = record.dist.integrity.clone().unwrap_or_else(|| {
        record
            .dist
            .shasum
            .as_ref()
            .map(|shasum| format!("sha1-{shasum}"))
            .unwrap_or_default()
    });

    ResolvedPackage {
        name: declared_name.to_string(),
        version: version.to_string(),
        resolved: record.dist.tarball.clone(),
        integrity,
        dependencies: record.dependencies.clone(),
        optional_dependencies: record.optional_dependencies.clone(),
        peer_dependencies: record.peer_dependencies.clone(),
        bin: normalize_bin(real_name, record.bin.as_ref()),
        optional,
        dev,
    }
}

/// Normalize the manifest `bin` field: a bare path takes the package's
/// unscoped name as the executable name.
fn normalize_bin(real_name: &str, bin: Option<&BinField>) -> HashMap<String, String> {
    match bin {
        None => HashMap::new(),
        Some(BinField::Path(path)) => {
            let short = real_name.rsplit('/').next().unwrap_or(real_name);
            HashMap::from([(short.to_string(), path.clone())])
        }
        Some(BinField::Map(map)) => map
            .iter()
            .map(|(name, path)| (name.clone(), path.clone()))
            .collect(),
    }
}
