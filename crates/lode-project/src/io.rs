use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::package_json::PackageJson;

/// Read `package.json` from a project directory.
pub fn read_package_json(project_dir: &Path) -> Result<PackageJson> {
    let path = project_dir.join("package.json");
    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let pkg = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(pkg)
}

pub fn write_package_json(project_dir: &Path, pkg: &PackageJson) -> Result<()> {
    let path = project_dir.join("package.json");
    let content = serde_json::to_string_pretty(pkg)?;
    fs::write(&path, format!("{content}\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
