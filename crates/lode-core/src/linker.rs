mod bins;
mod hoist;
mod materialize;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use lode_constants::{BIN_DIR, MARKER_FILE, MODULES_DIR, USER_AGENT};
use lode_error::Result;
use lode_resolver::ResolvedPackage;

use crate::fetch::FetchResult;
use materialize::LinkTarget;

#[derive(Debug, Default)]
pub struct LinkReport {
    pub linked: usize,
    pub binaries_installed: usize,
}

/// Ownership document for the module tree; its presence is what authorizes
/// a full cleanup on the next run.
#[derive(Serialize, Deserialize, Debug)]
struct Marker {
    schema: u32,
    #[serde(rename = "createdAt")]
    created_at: u64,
    #[serde(rename = "createdBy")]
    created_by: String,
}

/// Materialize the resolved set into `<project>/modules`.
///
/// One hoisted version per name goes to the top level; every parent whose
/// declaration selects a different version gets a private copy under
/// `modules/<parent>/modules/<name>`. Packages without a fetch result
/// (optional failures) are skipped. Bins land in the `.bin` of whichever
/// modules root the package was placed in.
pub fn link_module_tree(
    project_dir: &Path,
    flat: &HashMap<String, ResolvedPackage>,
    fetched: &HashMap<String, FetchResult>,
    hints: &HashMap<String, String>,
) -> Result<LinkReport> {
    let modules_dir = project_dir.join(MODULES_DIR);
    prepare_modules_dir(&modules_dir)?;

    let hoisted = hoist::choose_hoisted(flat, hints);
    let nested = hoist::nested_placements(flat, &hoisted);

    let mut targets = Vec::new();
    let mut bin_jobs: Vec<(PathBuf, String, HashMap<String, String>)> = Vec::new();

    for (name, version) in &hoisted {
        let key = format!("{name}@{version}");
        let Some(result) = fetched.get(&key) else {
            continue;
        };
        targets.push(LinkTarget {
            label: key.clone(),
            src: result.path.clone(),
            dest: modules_dir.join(name),
        });
        if let Some(pkg) = flat.get(&key)
            && !pkg.bin.is_empty()
        {
            bin_jobs.push((modules_dir.clone(), name.clone(), pkg.bin.clone()));
        }
    }

    for placement in &nested {
        let key = format!("{}@{}", placement.name, placement.version);
        let Some(result) = fetched.get(&key) else {
            continue;
        };
        let nested_root = modules_dir.join(&placement.parent).join(MODULES_DIR);
        targets.push(LinkTarget {
            label: key.clone(),
            src: result.path.clone(),
            dest: nested_root.join(&placement.name),
        });
        if let Some(pkg) = flat.get(&key)
            && !pkg.bin.is_empty()
        {
            bin_jobs.push((nested_root, placement.name.clone(), pkg.bin.clone()));
        }
    }

    let linked = materialize::materialize_all(&targets)?;

    let mut claimed: HashMap<PathBuf, HashMap<String, String>> = HashMap::new();
    let mut binaries_installed = 0usize;
    for (root, pkg_name, bin) in &bin_jobs {
        let claimed_for_root = claimed.entry(root.clone()).or_default();
        binaries_installed += bins::install_package_bins(root, pkg_name, bin, claimed_for_root)?;
    }

    write_marker(&modules_dir)?;
    Ok(LinkReport {
        linked,
        binaries_installed,
    })
}

/// Clear the previous tree. Visible entries are removed; entries starting
/// with `.` are preserved so tool-managed caches survive. The marker is what
/// says the tree is ours; without it the same conservative visible-only
/// cleanup applies, so a tree produced by another tool is never wiped
/// wholesale.
fn prepare_modules_dir(modules_dir: &Path) -> Result<()> {
    if modules_dir.exists() {
        if read_marker(modules_dir).is_none() {
            lode_logger::warn("modules directory was not created by lode, cleaning visible entries only");
        }
        for entry in fs::read_dir(modules_dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(entry.path())?;
            } else {
                fs::remove_file(entry.path())?;
            }
        }
    }

    let bin_dir = modules_dir.join(BIN_DIR);
    if bin_dir.exists() {
        fs::remove_dir_all(&bin_dir)?;
    }
    fs::create_dir_all(&bin_dir)?;
    Ok(())
}

fn read_marker(modules_dir: &Path) -> Option<Marker> {
    let raw = fs::read_to_string(modules_dir.join(MARKER_FILE)).ok()?;
    serde_json::from_str(&raw).ok()
}

fn write_marker(modules_dir: &Path) -> Result<()> {
    let marker = Marker {
        schema: 1,
        created_at: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default(),
        created_by: USER_AGENT.to_string(),
    };
    fs::write(
        modules_dir.join(MARKER_FILE),
        serde_json::to_string_pretty(&marker)?,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a fake store entry and its fetch result.
    fn stage(
        store_dir: &Path,
        flat: &mut HashMap<String, ResolvedPackage>,
        fetched: &mut HashMap<String, FetchResult>,
        name: &str,
        version: &str,
        deps: &[(&str, &str)],
        bin: &[(&str, &str)],
    ) {
        let key = format!("{name}@{version}");
        let entry = store_dir.join(key.replace('/', "+"));
        fs::create_dir_all(&entry).unwrap();
        fs::write(
            entry.join("package.json"),
            format!(r#"{{"name":"{name}","version":"{version}"}}"#),
        )
        .unwrap();
        for (_, bin_path) in bin {
            let target = entry.join(bin_path);
            fs::create_dir_all(target.parent().unwrap()).unwrap();
            fs::write(target, "#!/usr/bin/env node\n").unwrap();
        }

        flat.insert(
            key.clone(),
            ResolvedPackage {
                name: name.to_string(),
                version: version.to_string(),
                dependencies: deps
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
                bin: bin
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
                ..ResolvedPackage::default()
            },
        );
        fetched.insert(
            key,
            FetchResult {
                path: entry,
                from_cache: false,
            },
        );
    }

    fn manifest_version(path: &Path) -> String {
        let raw = fs::read_to_string(path.join("package.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        json["version"].as_str().unwrap().to_string()
    }

    #[test]
    fn version_conflicts_nest_under_the_disagreeing_parent() {
        let td = tempfile::tempdir().unwrap();
        let store = td.path().join("store");
        let project = td.path().join("project");
        fs::create_dir_all(&project).unwrap();

        let mut flat = HashMap::new();
        let mut fetched = HashMap::new();
        stage(&store, &mut flat, &mut fetched, "x", "1.0.0", &[], &[]);
        stage(&store, &mut flat, &mut fetched, "x", "2.0.0", &[], &[]);
        stage(&store, &mut flat, &mut fetched, "y", "1.0.0", &[("x", "^2.0.0")], &[]);
        stage(&store, &mut flat, &mut fetched, "z", "1.0.0", &[("x", "^1.0.0")], &[]);
        let hints = HashMap::from([
            ("y".to_string(), "1.0.0".to_string()),
            ("z".to_string(), "1.0.0".to_string()),
        ]);

        let report = link_module_tree(&project, &flat, &fetched, &hints).unwrap();

        let modules = project.join(MODULES_DIR);
        // hoist-uniqueness: one x at the top, the tie broke to 2.0.0
        assert_eq!(manifest_version(&modules.join("x")), "2.0.0");
        assert_eq!(manifest_version(&modules.join("y")), "1.0.0");
        // z disagreed, so the node lookup walk finds its private x
        assert_eq!(
            manifest_version(&modules.join("z").join(MODULES_DIR).join("x")),
            "1.0.0"
        );
        assert!(!modules.join("y").join(MODULES_DIR).join("x").exists());
        // three hoisted packages plus z's private x
        assert_eq!(report.linked, 4);
    }

    #[test]
    fn scoped_packages_materialize_under_their_scope() {
        let td = tempfile::tempdir().unwrap();
        let store = td.path().join("store");
        let project = td.path().join("project");
        fs::create_dir_all(&project).unwrap();

        let mut flat = HashMap::new();
        let mut fetched = HashMap::new();
        stage(&store, &mut flat, &mut fetched, "@types/node", "20.1.0", &[], &[]);

        link_module_tree(&project, &flat, &fetched, &HashMap::new()).unwrap();

        assert!(
            project
                .join(MODULES_DIR)
                .join("@types/node/package.json")
                .is_file()
        );
    }

    #[test]
    fn linking_twice_is_idempotent_and_rewrites_the_marker() {
        let td = tempfile::tempdir().unwrap();
        let store = td.path().join("store");
        let project = td.path().join("project");
        fs::create_dir_all(&project).unwrap();

        let mut flat = HashMap::new();
        let mut fetched = HashMap::new();
        stage(
            &store,
            &mut flat,
            &mut fetched,
            "demo",
            "1.0.0",
            &[],
            &[("demo", "bin/cli.js")],
        );

        let first = link_module_tree(&project, &flat, &fetched, &HashMap::new()).unwrap();
        let second = link_module_tree(&project, &flat, &fetched, &HashMap::new()).unwrap();

        assert_eq!(first.linked, second.linked);
        assert_eq!(first.binaries_installed, second.binaries_installed);

        let modules = project.join(MODULES_DIR);
        assert!(modules.join("demo/package.json").is_file());
        let marker = read_marker(&modules).unwrap();
        assert_eq!(marker.schema, 1);
        #[cfg(unix)]
        assert!(modules.join(BIN_DIR).join("demo").symlink_metadata().is_ok());
    }

    #[test]
    fn cleanup_preserves_hidden_entries_and_removes_visible_ones() {
        let td = tempfile::tempdir().unwrap();
        let store = td.path().join("store");
        let project = td.path().join("project");
        let modules = project.join(MODULES_DIR);
        fs::create_dir_all(modules.join("stale-package")).unwrap();
        fs::create_dir_all(modules.join(".cache")).unwrap();
        fs::write(modules.join(".cache/keep.txt"), "kept").unwrap();

        let mut flat = HashMap::new();
        let mut fetched = HashMap::new();
        stage(&store, &mut flat, &mut fetched, "demo", "1.0.0", &[], &[]);

        link_module_tree(&project, &flat, &fetched, &HashMap::new()).unwrap();

        assert!(!modules.join("stale-package").exists());
        assert_eq!(
            fs::read_to_string(modules.join(".cache/keep.txt")).unwrap(),
            "kept"
        );
        assert!(modules.join("demo/package.json").is_file());
    }

    #[test]
    fn missing_fetch_results_are_skipped() {
        let td = tempfile::tempdir().unwrap();
        let store = td.path().join("store");
        let project = td.path().join("project");
        fs::create_dir_all(&project).unwrap();

        let mut flat = HashMap::new();
        let mut fetched = HashMap::new();
        stage(&store, &mut flat, &mut fetched, "demo", "1.0.0", &[], &[]);
        // an optional package that failed to fetch
        flat.insert(
            "ghost@1.0.0".to_string(),
            ResolvedPackage {
                name: "ghost".to_string(),
                version: "1.0.0".to_string(),
                optional: true,
                ..ResolvedPackage::default()
            },
        );

        let report = link_module_tree(&project, &flat, &fetched, &HashMap::new()).unwrap();
        assert_eq!(report.linked, 1);
        assert!(!project.join(MODULES_DIR).join("ghost").exists());
    }
}
