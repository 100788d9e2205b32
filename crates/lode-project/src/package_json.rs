use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The `bin` field of a manifest: either a single path (the executable takes
/// the package's unscoped name) or an explicit name → path map.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(untagged)]
pub enum BinField {
    Path(String),
    Map(IndexMap<String, String>),
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct PeerMeta {
    #[serde(default)]
    pub optional: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct PackageJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin: Option<BinField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scripts: Option<IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<IndexMap<String, String>>,
    #[serde(rename = "devDependencies", skip_serializing_if = "Option::is_none")]
    pub dev_dependencies: Option<IndexMap<String, String>>,
    #[serde(rename = "peerDependencies", skip_serializing_if = "Option::is_none")]
    pub peer_dependencies: Option<IndexMap<String, String>>,
    #[serde(
        rename = "peerDependenciesMeta",
        skip_serializing_if = "Option::is_none"
    )]
    pub peer_dependencies_meta: Option<IndexMap<String, PeerMeta>>,
    #[serde(
        rename = "optionalDependencies",
        skip_serializing_if = "Option::is_none"
    )]
    pub optional_dependencies: Option<IndexMap<String, String>>,
    // Catch-all so unknown fields survive a rewrite
    #[serde(flatten)]
    pub other: IndexMap<String, serde_json::Value>,
}

impl PackageJson {
    /// Direct dependencies to install, in declaration order:
    /// `(name, range, dev, optional)`.
    ///
    /// `optionalDependencies` override plain `dependencies` of the same name,
    /// and `devDependencies` are skipped for production installs.
    #[must_use]
    pub fn direct_dependencies(&self, production: bool) -> Vec<(String, String, bool, bool)> {
        let mut out: Vec<(String, String, bool, bool)> = Vec::new();

        if let Some(deps) = &self.dependencies {
            let optional_names = self.optional_dependencies.as_ref();
            for (name, range) in deps {
                if optional_names.is_some_and(|o| o.contains_key(name)) {
                    continue;
                }
                out.push((name.clone(), range.clone(), false, false));
            }
        }
        if !production && let Some(deps) = &self.dev_dependencies {
            for (name, range) in deps {
                out.push((name.clone(), range.clone(), true, false));
            }
        }
        if let Some(deps) = &self.optional_dependencies {
            for (name, range) in deps {
                out.push((name.clone(), range.clone(), false, true));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_field_accepts_string_and_map() {
        let single: PackageJson =
            serde_json::from_str(r#"{"name":"demo","bin":"bin/cli.js"}"#).unwrap();
        assert!(matches!(single.bin, Some(BinField::Path(ref p)) if p == "bin/cli.js"));

        let map: PackageJson =
            serde_json::from_str(r#"{"name":"demo","bin":{"demo":"bin/cli.js"}}"#).unwrap();
        assert!(matches!(map.bin, Some(BinField::Map(_))));
    }

    #[test]
    fn direct_dependencies_respects_production() {
        let pkg: PackageJson = serde_json::from_str(
            r#"{
                "dependencies": {"a": "^1.0.0"},
                "devDependencies": {"b": "^2.0.0"},
                "optionalDependencies": {"c": "^3.0.0"}
            }"#,
        )
        .unwrap();

        let all = pkg.direct_dependencies(false);
        assert_eq!(all.len(), 3);
        assert!(all.iter().any(|(n, _, dev, _)| n == "b" && *dev));
        assert!(all.iter().any(|(n, _, _, opt)| n == "c" && *opt));

        let prod = pkg.direct_dependencies(true);
        assert_eq!(prod.len(), 2);
        assert!(!prod.iter().any(|(n, _, _, _)| n == "b"));
    }

    #[test]
    fn optional_overrides_regular_dependency() {
        let pkg: PackageJson = serde_json::from_str(
            r#"{
                "dependencies": {"fsevents": "^2.0.0"},
                "optionalDependencies": {"fsevents": "^2.3.0"}
            }"#,
        )
        .unwrap();

        let deps = pkg.direct_dependencies(false);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].1, "^2.3.0");
        assert!(deps[0].3);
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let raw = r#"{"name":"demo","version":"1.0.0","keywords":["a","b"]}"#;
        let pkg: PackageJson = serde_json::from_str(raw).unwrap();
        let back = serde_json::to_value(&pkg).unwrap();
        assert_eq!(back["keywords"][0], "a");
    }
}
