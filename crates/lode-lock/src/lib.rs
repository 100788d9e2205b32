use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use lode_constants::LOCKFILE_VERSION;
use lode_error::{LodeError, Result};

/// `bin` as recorded in the lockfile: the manifest's string form or the
/// normalized name → path map.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum LockedBin {
    Path(String),
    Map(BTreeMap<String, String>),
}

/// Projection of one resolved package under its `name@version` key. Empty
/// sub-maps and false flags are omitted on disk and restored on read.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LockedPackage {
    pub version: String,
    pub resolved: String,
    pub integrity: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(
        rename = "peerDependencies",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub peer_dependencies: BTreeMap<String, String>,
    #[serde(
        rename = "optionalDependencies",
        default,
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub optional_dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<LockedBin>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub dev: bool,
}

/// The on-disk lockfile. `BTreeMap` keys give the lexicographic ordering
/// the format requires, so serialization is reproducible by construction.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Lockfile {
    pub version: u32,
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(rename = "devDependencies", default)]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub packages: BTreeMap<String, LockedPackage>,
}

impl Default for Lockfile {
    fn default() -> Self {
        Self {
            version: LOCKFILE_VERSION,
            dependencies: BTreeMap::new(),
            dev_dependencies: BTreeMap::new(),
            packages: BTreeMap::new(),
        }
    }
}

impl Lockfile {
    #[must_use]
    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    /// Load the lockfile; `None` when absent, an error when unreadable or
    /// written by an incompatible schema version.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        let lockfile: Self = serde_json::from_str(&content)
            .map_err(|e| LodeError::LockfileError(e.to_string()))?;
        if lockfile.version != LOCKFILE_VERSION {
            return Err(LodeError::LockfileSchemaMismatch(lockfile.version));
        }
        Ok(Some(lockfile))
    }

    /// Atomic write: serialize next to the target and rename over it, so a
    /// reader only ever sees the previous or the new lockfile.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| LodeError::LockfileError(e.to_string()))?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "lode.lock".to_string());
        let tmp = path.with_file_name(format!("{file_name}.tmp"));
        fs::write(&tmp, format!("{content}\n"))?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Whether the embedded direct-dependency maps still match the
    /// manifest's, range string for range string. Any added, removed or
    /// changed entry on either side makes the lockfile stale.
    pub fn is_up_to_date<'a, I, J>(&self, dependencies: I, dev_dependencies: J) -> bool
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
        J: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let manifest_deps: BTreeMap<&str, &str> = dependencies.into_iter().collect();
        let manifest_dev: BTreeMap<&str, &str> = dev_dependencies.into_iter().collect();

        let lock_deps: BTreeMap<&str, &str> = self
            .dependencies
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let lock_dev: BTreeMap<&str, &str> = self
            .dev_dependencies
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        manifest_deps == lock_deps && manifest_dev == lock_dev
    }
}

/// Split a `name@version` package key at its last `@`, so scoped names keep
/// their leading one.
#[must_use]
pub fn split_key(key: &str) -> Option<(&str, &str)> {
    let idx = key.rfind('@')?;
    if idx == 0 {
        return None;
    }
    Some((&key[..idx], &key[idx + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Lockfile {
        let mut lock = Lockfile::default();
        lock.dependencies
            .insert("chalk".to_string(), "^2.0.0".to_string());
        lock.packages.insert(
            "chalk@2.4.2".to_string(),
            LockedPackage {
                version: "2.4.2".to_string(),
                resolved: "https://reg/chalk-2.4.2.tgz".to_string(),
                integrity: "sha512-abc".to_string(),
                dependencies: [("ansi-styles".to_string(), "^3.2.1".to_string())]
                    .into_iter()
                    .collect(),
                ..LockedPackage::default()
            },
        );
        lock.packages.insert(
            "ansi-styles@3.2.1".to_string(),
            LockedPackage {
                version: "3.2.1".to_string(),
                resolved: "https://reg/ansi-styles-3.2.1.tgz".to_string(),
                integrity: "sha512-def".to_string(),
                ..LockedPackage::default()
            },
        );
        lock
    }

    #[test]
    fn save_load_round_trip() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("lode.lock");
        let lock = sample();
        lock.save(&path).unwrap();

        let loaded = Lockfile::load(&path).unwrap().unwrap();
        assert_eq!(loaded.version, LOCKFILE_VERSION);
        assert_eq!(loaded.dependencies["chalk"], "^2.0.0");
        assert_eq!(loaded.packages.len(), 2);
        assert_eq!(
            loaded.packages["chalk@2.4.2"].dependencies["ansi-styles"],
            "^3.2.1"
        );
        // omitted flags read back as false, omitted maps as empty
        assert!(!loaded.packages["ansi-styles@3.2.1"].dev);
        assert!(loaded.packages["ansi-styles@3.2.1"].dependencies.is_empty());
    }

    #[test]
    fn output_is_sorted_and_newline_terminated() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("lode.lock");
        sample().save(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.ends_with('\n'));
        assert!(!raw.ends_with("\n\n"));
        let ansi = raw.find("ansi-styles@3.2.1").unwrap();
        let chalk = raw.find("chalk@2.4.2").unwrap();
        assert!(ansi < chalk);
        // empty sub-maps and false flags are not written
        assert!(!raw.contains("\"optional\""));
        assert!(!raw.contains("\"peerDependencies\""));
    }

    #[test]
    fn schema_mismatch_is_rejected() {
        let td = tempfile::tempdir().unwrap();
        let path = td.path().join("lode.lock");
        fs::write(&path, r#"{"version": 99, "packages": {}}"#).unwrap();

        assert!(matches!(
            Lockfile::load(&path),
            Err(LodeError::LockfileSchemaMismatch(99))
        ));
    }

    #[test]
    fn missing_lockfile_is_none() {
        let td = tempfile::tempdir().unwrap();
        assert!(Lockfile::load(&td.path().join("lode.lock")).unwrap().is_none());
    }

    #[test]
    fn up_to_date_detects_additions_removals_and_changes() {
        let lock = sample();
        let none: [(&str, &str); 0] = [];

        assert!(lock.is_up_to_date([("chalk", "^2.0.0")], none));
        // changed range
        assert!(!lock.is_up_to_date([("chalk", "^3.0.0")], none));
        // added manifest dependency
        assert!(!lock.is_up_to_date([("chalk", "^2.0.0"), ("extra", "^1.0.0")], none));
        // removed manifest dependency
        assert!(!lock.is_up_to_date(none, none));
        // dev dependencies participate too
        assert!(!lock.is_up_to_date([("chalk", "^2.0.0")], [("jest", "^29.0.0")]));
    }

    #[test]
    fn split_key_handles_scoped_names() {
        assert_eq!(split_key("chalk@2.4.2"), Some(("chalk", "2.4.2")));
        assert_eq!(
            split_key("@types/node@20.1.0"),
            Some(("@types/node", "20.1.0"))
        );
        assert_eq!(split_key("no-version"), None);
    }
}
