use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};

use lode_constants::{METADATA_CACHE_MAX_BYTES, METADATA_TTL_SECS};
use lode_utils::safe_name;

/// On-disk cache of packument JSON, one file per `(name, abbreviated?)`
/// pair. Entries older than the TTL are treated as absent. A miss is never
/// an error; any unreadable entry is simply a miss.
pub struct MetadataCache {
    dir: PathBuf,
    ttl: Duration,
    max_bytes: u64,
}

impl MetadataCache {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            ttl: Duration::from_secs(METADATA_TTL_SECS),
            max_bytes: METADATA_CACHE_MAX_BYTES,
        }
    }

    #[must_use]
    pub fn with_ttl(dir: PathBuf, ttl: Duration) -> Self {
        Self {
            dir,
            ttl,
            max_bytes: METADATA_CACHE_MAX_BYTES,
        }
    }

    #[must_use]
    pub fn max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Safe filename plus a short hash so that distinct names can never
    /// collide after escaping.
    fn entry_path(&self, name: &str, abbreviated: bool) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        let kind = if abbreviated { "min" } else { "full" };
        self.dir
            .join(format!("{}-{}.{kind}.json", safe_name(name), &digest[..8]))
    }

    pub fn get(&self, name: &str, abbreviated: bool) -> Option<String> {
        let path = self.entry_path(name, abbreviated);
        let meta = fs::metadata(&path).ok()?;
        let age = meta.modified().ok()?.elapsed().ok()?;
        if age > self.ttl {
            return None;
        }
        fs::read_to_string(&path).ok()
    }

    pub fn set(&self, name: &str, abbreviated: bool, json: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.entry_path(name, abbreviated), json)
    }

    /// Drop both the abbreviated and the full entry for a name.
    pub fn invalidate(&self, name: &str) {
        let _ = fs::remove_file(self.entry_path(name, true));
        let _ = fs::remove_file(self.entry_path(name, false));
    }

    /// Remove oldest entries until the cache is at or below 80% of its
    /// size budget.
    pub fn prune(&self) -> std::io::Result<()> {
        let mut entries: Vec<(PathBuf, std::time::SystemTime, u64)> = Vec::new();
        let mut total: u64 = 0;

        let Ok(dir) = fs::read_dir(&self.dir) else {
            return Ok(());
        };
        for entry in dir.flatten() {
            let Ok(meta) = entry.metadata() else { continue };
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().unwrap_or(std::time::UNIX_EPOCH);
            total += meta.len();
            entries.push((entry.path(), modified, meta.len()));
        }

        let target = self.max_bytes * 8 / 10;
        entries.sort_by_key(|(_, modified, _)| *modified);
        for (path, _, len) in entries {
            if total <= target {
                break;
            }
            if fs::remove_file(&path).is_ok() {
                total = total.saturating_sub(len);
            }
        }
        Ok(())
    }

    pub fn clear(&self) -> std::io::Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)?;
        }
        fs::create_dir_all(&self.dir)
    }
}
