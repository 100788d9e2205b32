use std::collections::{BTreeMap, HashMap};

use lode_lock::{LockedBin, LockedPackage, Lockfile, split_key};
use lode_project::PackageJson;
use lode_resolver::{ResolvedPackage, max_satisfying};

/// Project the flat resolution set (plus the manifest's direct-dependency
/// maps) into the lockfile schema.
#[must_use]
pub fn lockfile_from_resolution(
    flat: &HashMap<String, ResolvedPackage>,
    manifest: &PackageJson,
) -> Lockfile {
    let mut lock = Lockfile::default();

    if let Some(deps) = &manifest.dependencies {
        for (name, range) in deps {
            lock.dependencies.insert(name.clone(), range.clone());
        }
    }
    if let Some(deps) = &manifest.dev_dependencies {
        for (name, range) in deps {
            lock.dev_dependencies.insert(name.clone(), range.clone());
        }
    }

    for (key, pkg) in flat {
        lock.packages.insert(
            key.clone(),
            LockedPackage {
                version: pkg.version.clone(),
                resolved: pkg.resolved.clone(),
                integrity: pkg.integrity.clone(),
                dependencies: to_btree(&pkg.dependencies),
                peer_dependencies: to_btree(&pkg.peer_dependencies),
                optional_dependencies: to_btree(&pkg.optional_dependencies),
                bin: if pkg.bin.is_empty() {
                    None
                } else {
                    Some(LockedBin::Map(to_btree(&pkg.bin)))
                },
                optional: pkg.optional,
                dev: pkg.dev,
            },
        );
    }

    lock
}

/// Rebuild the flat set from a lockfile (`toResolved`). Keys split at their
/// last `@` so scoped names survive; omitted sub-maps come back empty.
#[must_use]
pub fn resolved_from_lockfile(lock: &Lockfile) -> HashMap<String, ResolvedPackage> {
    let mut flat = HashMap::new();
    for (key, record) in &lock.packages {
        let Some((name, _)) = split_key(key) else {
            continue;
        };
        flat.insert(
            key.clone(),
            ResolvedPackage {
                name: name.to_string(),
                version: record.version.clone(),
                resolved: record.resolved.clone(),
                integrity: record.integrity.clone(),
                dependencies: to_hash(&record.dependencies),
                optional_dependencies: to_hash(&record.optional_dependencies),
                peer_dependencies: to_hash(&record.peer_dependencies),
                bin: locked_bin_map(name, record.bin.as_ref()),
                optional: record.optional,
                dev: record.dev,
            },
        );
    }
    flat
}

/// Version hints for the linker: for every direct dependency in the
/// lockfile header, the flat-set version its range selects.
#[must_use]
pub fn direct_hints(
    lock: &Lockfile,
    flat: &HashMap<String, ResolvedPackage>,
) -> HashMap<String, String> {
    let mut versions_by_name: HashMap<&str, Vec<&str>> = HashMap::new();
    for pkg in flat.values() {
        versions_by_name
            .entry(pkg.name.as_str())
            .or_default()
            .push(pkg.version.as_str());
    }

    let mut hints = HashMap::new();
    for (name, range) in lock.dependencies.iter().chain(&lock.dev_dependencies) {
        let Some(versions) = versions_by_name.get(name.as_str()) else {
            continue;
        };
        if let Some(version) = max_satisfying(versions.iter().copied(), range) {
            hints.insert(name.clone(), version);
        }
    }
    hints
}

fn to_btree(map: &HashMap<String, String>) -> BTreeMap<String, String> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn to_hash(map: &BTreeMap<String, String>) -> HashMap<String, String> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn locked_bin_map(name: &str, bin: Option<&LockedBin>) -> HashMap<String, String> {
    match bin {
        None => HashMap::new(),
        Some(LockedBin::Path(path)) => {
            let short = name.rsplit('/').next().unwrap_or(name);
            HashMap::from([(short.to_string(), path.clone())])
        }
        Some(LockedBin::Map(map)) => to_hash(map),
    }
}
