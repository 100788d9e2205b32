use std::collections::{BTreeMap, HashMap, HashSet};

use lode_resolver::{ResolvedPackage, max_satisfying, parse_version};

/// A version that must live under a disagreeing parent instead of at the
/// top level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedPlacement {
    pub parent: String,
    pub name: String,
    pub version: String,
}

/// Versions present in the flat set per package name, highest first.
pub fn versions_by_name(flat: &HashMap<String, ResolvedPackage>) -> HashMap<String, Vec<String>> {
    let mut by_name: HashMap<String, Vec<String>> = HashMap::new();
    for pkg in flat.values() {
        by_name
            .entry(pkg.name.clone())
            .or_default()
            .push(pkg.version.clone());
    }
    for versions in by_name.values_mut() {
        versions.sort_by(|a, b| match (parse_version(a), parse_version(b)) {
            (Ok(va), Ok(vb)) => vb.cmp(&va),
            _ => b.cmp(a),
        });
        versions.dedup();
    }
    by_name
}

/// The version a parent's declaration selects among the versions actually
/// present in the flat set.
fn required_version(
    by_name: &HashMap<String, Vec<String>>,
    dep_name: &str,
    dep_range: &str,
) -> Option<String> {
    let versions = by_name.get(dep_name)?;
    max_satisfying(versions.iter().map(String::as_str), dep_range)
}

/// Pick one top-level version per package name: the direct-dependency hint
/// when there is one, otherwise the version most dependents selected.
/// Version lists are ordered highest-first, so count ties resolve to the
/// higher version deterministically.
pub fn choose_hoisted(
    flat: &HashMap<String, ResolvedPackage>,
    hints: &HashMap<String, String>,
) -> BTreeMap<String, String> {
    let by_name = versions_by_name(flat);

    let mut counts: HashMap<(String, String), usize> = HashMap::new();
    for pkg in flat.values() {
        for (dep_name, dep_range) in pkg
            .dependencies
            .iter()
            .chain(pkg.optional_dependencies.iter())
        {
            if let Some(version) = required_version(&by_name, dep_name, dep_range) {
                *counts.entry((dep_name.clone(), version)).or_insert(0) += 1;
            }
        }
    }

    let mut hoisted = BTreeMap::new();
    for (name, versions) in &by_name {
        if let Some(hint) = hints.get(name)
            && versions.contains(hint)
        {
            hoisted.insert(name.clone(), hint.clone());
            continue;
        }

        let mut best: Option<(&String, usize)> = None;
        for version in versions {
            let count = counts
                .get(&(name.clone(), version.clone()))
                .copied()
                .unwrap_or(0);
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((version, count));
            }
        }
        if let Some((version, _)) = best {
            hoisted.insert(name.clone(), version.clone());
        }
    }
    hoisted
}

/// Every `(parent, name, version)` whose declaration disagrees with the
/// hoisted choice, deduplicated and in deterministic order.
pub fn nested_placements(
    flat: &HashMap<String, ResolvedPackage>,
    hoisted: &BTreeMap<String, String>,
) -> Vec<NestedPlacement> {
    let by_name = versions_by_name(flat);

    let mut parents: Vec<&ResolvedPackage> = flat.values().collect();
    parents.sort_by_key(|p| p.key());

    let mut seen = HashSet::new();
    let mut placements = Vec::new();
    for parent in parents {
        for (dep_name, dep_range) in parent
            .dependencies
            .iter()
            .chain(parent.optional_dependencies.iter())
        {
            let Some(required) = required_version(&by_name, dep_name, dep_range) else {
                continue;
            };
            if hoisted.get(dep_name) == Some(&required) {
                continue;
            }
            if seen.insert((parent.name.clone(), dep_name.clone(), required.clone())) {
                placements.push(NestedPlacement {
                    parent: parent.name.clone(),
                    name: dep_name.clone(),
                    version: required,
                });
            }
        }
    }
    placements
}
