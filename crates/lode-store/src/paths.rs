use std::path::PathBuf;

use sha2::{Digest, Sha256};

use lode_utils::{restore_name, safe_name};

/// Root of all tool-owned global state (`~/.lode`).
#[must_use]
pub fn lode_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lode")
}

#[must_use]
pub fn default_store_root() -> PathBuf {
    lode_home().join("store")
}

#[must_use]
pub fn default_cache_root() -> PathBuf {
    lode_home().join("cache")
}

#[must_use]
pub fn content_hash(seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Store entry directory name: `safeName@version_hash8`, where the hash is
/// taken over the integrity string, or over `name@version` when no
/// integrity is known. Pure in its inputs, which is what makes the store
/// content-addressable.
#[must_use]
pub fn entry_dir_name(name: &str, version: &str, integrity: &str) -> String {
    let seed = if integrity.is_empty() {
        format!("{name}@{version}")
    } else {
        integrity.to_string()
    };
    let hash = content_hash(&seed);
    format!("{}@{version}_{}", safe_name(name), &hash[..8])
}

/// Recover `(name, version)` from an entry directory name; `None` for
/// anything that does not look like one (extraction workspaces, strays).
#[must_use]
pub fn parse_entry_dir_name(dir_name: &str) -> Option<(String, String)> {
    let (rest, hash) = dir_name.rsplit_once('_')?;
    if hash.len() != 8 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let (safe, version) = rest.rsplit_once('@')?;
    if safe.is_empty() || version.is_empty() {
        return None;
    }
    Some((restore_name(safe), version.to_string()))
}
