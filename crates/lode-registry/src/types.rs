use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use lode_project::{BinField, PeerMeta};

/// `dist` sub-record of a version: where the tarball lives and how to check
/// it.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Dist {
    #[serde(default)]
    pub tarball: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shasum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
}

/// One version entry of an abbreviated packument: just the fields needed for
/// resolution and fetching.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct VersionRecord {
    #[serde(default)]
    pub dependencies: HashMap<String, String>,
    #[serde(rename = "optionalDependencies", default)]
    pub optional_dependencies: HashMap<String, String>,
    #[serde(rename = "peerDependencies", default)]
    pub peer_dependencies: HashMap<String, String>,
    #[serde(rename = "peerDependenciesMeta", default)]
    pub peer_dependencies_meta: HashMap<String, PeerMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bin: Option<BinField>,
    // string in practice, but old documents carry `false` here
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<serde_json::Value>,
    #[serde(default)]
    pub dist: Dist,
}

impl VersionRecord {
    #[must_use]
    pub fn deprecation_message(&self) -> Option<&str> {
        self.deprecated.as_ref().and_then(|v| v.as_str())
    }
}

/// Abbreviated registry document for one package name.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Packument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub versions: HashMap<String, VersionRecord>,
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: HashMap<String, String>,
}
