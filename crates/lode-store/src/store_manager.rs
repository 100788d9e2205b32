use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use lode_constants::META_FILE;
use lode_error::{LodeError, Result};

use crate::paths::{default_store_root, entry_dir_name, parse_entry_dir_name};
use crate::tarball::extract_tarball;

/// Sidecar written next to every extracted package, after the payload.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StoreMeta {
    pub name: String,
    pub version: String,
    pub integrity: String,
    pub tarball: String,
    #[serde(rename = "fetchedAt")]
    pub fetched_at: u64,
}

#[derive(Debug, Clone)]
pub struct StoreEntry {
    pub name: String,
    pub version: String,
    pub path: PathBuf,
}

/// Content-addressable store of extracted packages. Entries are created by
/// extracting into a workspace inside the store root and atomically renaming
/// it into place; once created they are never mutated.
pub struct PackageStore {
    root: PathBuf,
}

impl PackageStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn at_default_root() -> Self {
        Self::new(default_store_root())
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn path_for(&self, name: &str, version: &str, integrity: &str) -> PathBuf {
        self.root.join(entry_dir_name(name, version, integrity))
    }

    /// An entry counts as present only when its package manifest survived
    /// extraction.
    #[must_use]
    pub fn has(&self, name: &str, version: &str, integrity: &str) -> bool {
        self.path_for(name, version, integrity)
            .join("package.json")
            .is_file()
    }

    /// Present *and* carrying its `.meta` sidecar, i.e. a fully committed
    /// entry rather than a partially written one.
    #[must_use]
    pub fn is_complete(&self, path: &Path) -> bool {
        path.join("package.json").is_file() && path.join(META_FILE).is_file()
    }

    #[must_use]
    pub fn read_meta(&self, path: &Path) -> Option<StoreMeta> {
        let raw = fs::read_to_string(path.join(META_FILE)).ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// Enumerate store entries, skipping workspaces and anything whose
    /// directory name does not parse back into a package identity.
    #[must_use]
    pub fn list(&self) -> Vec<StoreEntry> {
        let mut entries = Vec::new();
        let Ok(dir) = fs::read_dir(&self.root) else {
            return entries;
        };
        for item in dir.flatten() {
            if !item.path().is_dir() {
                continue;
            }
            let file_name = item.file_name();
            let Some((name, version)) = parse_entry_dir_name(&file_name.to_string_lossy()) else {
                continue;
            };
            entries.push(StoreEntry {
                name,
                version,
                path: item.path(),
            });
        }
        entries.sort_by(|a, b| (&a.name, &a.version).cmp(&(&b.name, &b.version)));
        entries
    }

    pub fn remove(&self, name: &str, version: &str, integrity: &str) -> Result<()> {
        let path = self.path_for(name, version, integrity);
        if path.exists() {
            fs::remove_dir_all(&path)?;
        }
        Ok(())
    }

    /// Extract verified tarball bytes into the store and return the final
    /// entry path. Extraction happens in a workspace on the same filesystem,
    /// the rename is atomic, and `.meta` is written last, so concurrent
    /// writers of one entry race safely: the later rename wins.
    pub fn insert_from_tarball(
        &self,
        name: &str,
        version: &str,
        integrity: &str,
        tarball_url: &str,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)?;

        let label = format!("{name}@{version}");
        let workspace = tempfile::Builder::new()
            .prefix(".extract-")
            .tempdir_in(&self.root)?;
        extract_tarball(bytes, workspace.path(), &label)?;

        let final_path = self.path_for(name, version, integrity);
        if final_path.exists() {
            fs::remove_dir_all(&final_path)?;
        }

        let workspace = workspace.into_path();
        if let Err(err) = fs::rename(&workspace, &final_path) {
            let _ = fs::remove_dir_all(&workspace);
            return Err(LodeError::IoError(format!(
                "failed to commit {label} to the store: {err}"
            )));
        }

        let meta = StoreMeta {
            name: name.to_string(),
            version: version.to_string(),
            integrity: integrity.to_string(),
            tarball: tarball_url.to_string(),
            fetched_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        };
        fs::write(
            final_path.join(META_FILE),
            serde_json::to_string_pretty(&meta)?,
        )?;

        Ok(final_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tarball::create_tarball;

    fn demo_tarball(name: &str) -> Vec<u8> {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(
            src.path().join("package.json"),
            format!(r#"{{"name":"{name}","version":"1.0.0"}}"#),
        )
        .unwrap();
        std::fs::write(src.path().join("index.js"), "module.exports = {};").unwrap();
        let bytes = create_tarball(src.path()).unwrap();
        bytes
    }

    #[test]
    fn insert_then_has_and_meta() {
        let td = tempfile::tempdir().unwrap();
        let store = PackageStore::new(td.path().join("store"));
        let bytes = demo_tarball("demo");

        let path = store
            .insert_from_tarball("demo", "1.0.0", "sha512-abc", "https://reg/demo.tgz", &bytes)
            .unwrap();

        assert!(store.has("demo", "1.0.0", "sha512-abc"));
        assert!(store.is_complete(&path));
        assert!(path.join("index.js").is_file());

        let meta = store.read_meta(&path).unwrap();
        assert_eq!(meta.name, "demo");
        assert_eq!(meta.integrity, "sha512-abc");
        assert_eq!(meta.tarball, "https://reg/demo.tgz");
    }

    #[test]
    fn reinsert_wins_over_previous_entry() {
        let td = tempfile::tempdir().unwrap();
        let store = PackageStore::new(td.path().join("store"));
        let bytes = demo_tarball("demo");

        let first = store
            .insert_from_tarball("demo", "1.0.0", "sha512-abc", "https://reg/a.tgz", &bytes)
            .unwrap();
        let second = store
            .insert_from_tarball("demo", "1.0.0", "sha512-abc", "https://reg/b.tgz", &bytes)
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.read_meta(&second).unwrap().tarball, "https://reg/b.tgz");
    }

    #[test]
    fn list_reconstructs_names() {
        let td = tempfile::tempdir().unwrap();
        let store = PackageStore::new(td.path().join("store"));
        store
            .insert_from_tarball("demo", "1.0.0", "sha512-abc", "url", &demo_tarball("demo"))
            .unwrap();
        store
            .insert_from_tarball(
                "@scope/tool",
                "2.0.0",
                "sha512-def",
                "url",
                &demo_tarball("@scope/tool"),
            )
            .unwrap();
        // stray directory that should be skipped
        std::fs::create_dir_all(store.root().join("not-an-entry")).unwrap();

        let listed = store.list();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "@scope/tool");
        assert_eq!(listed[0].version, "2.0.0");
        assert_eq!(listed[1].name, "demo");
    }

    #[test]
    fn remove_deletes_the_entry() {
        let td = tempfile::tempdir().unwrap();
        let store = PackageStore::new(td.path().join("store"));
        store
            .insert_from_tarball("demo", "1.0.0", "sha512-abc", "url", &demo_tarball("demo"))
            .unwrap();

        store.remove("demo", "1.0.0", "sha512-abc").unwrap();
        assert!(!store.has("demo", "1.0.0", "sha512-abc"));
    }
}
