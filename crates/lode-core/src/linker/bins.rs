use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use lode_constants::BIN_DIR;
use lode_error::{LodeError, Result};

/// Install the bin entries of one package into the `.bin` directory of the
/// modules root it was materialized under. Returns the number of entries
/// installed.
///
/// `claimed` tracks bin names already taken within this `.bin`; a duplicate
/// is overwritten (last writer wins) with a warning naming both packages.
pub fn install_package_bins(
    modules_root: &Path,
    pkg_name: &str,
    bin: &HashMap<String, String>,
    claimed: &mut HashMap<String, String>,
) -> Result<usize> {
    if bin.is_empty() {
        return Ok(0);
    }

    let bin_dir = modules_root.join(BIN_DIR);
    fs::create_dir_all(&bin_dir)?;

    let mut entries: Vec<(&String, &String)> = bin.iter().collect();
    entries.sort();

    let mut installed = 0usize;
    for (bin_name, rel_target) in entries {
        let target = modules_root.join(pkg_name).join(rel_target);
        if !target.exists() {
            continue;
        }

        if let Some(previous) = claimed.insert(bin_name.clone(), pkg_name.to_string())
            && previous != pkg_name
        {
            lode_logger::warn(&format!(
                "bin '{bin_name}' of {pkg_name} overwrites the one from {previous}"
            ));
        }

        create_bin_link(&bin_dir, bin_name, pkg_name, rel_target)
            .map_err(|err| LodeError::LinkError(pkg_name.to_string(), err))?;
        make_executable(&target);
        installed += 1;
    }
    Ok(installed)
}

/// Path of a shim's target relative to the `.bin` directory.
fn relative_target(pkg_name: &str, rel_target: &str) -> PathBuf {
    let mut rel = PathBuf::from("..");
    for segment in pkg_name.split('/') {
        rel.push(segment);
    }
    for segment in rel_target.split('/') {
        rel.push(segment);
    }
    rel
}

#[cfg(unix)]
fn create_bin_link(
    bin_dir: &Path,
    bin_name: &str,
    pkg_name: &str,
    rel_target: &str,
) -> std::result::Result<(), String> {
    let link_path = bin_dir.join(bin_name);
    if link_path.symlink_metadata().is_ok() {
        fs::remove_file(&link_path).map_err(|e| e.to_string())?;
    }
    let rel = relative_target(pkg_name, rel_target);
    std::os::unix::fs::symlink(&rel, &link_path).map_err(|e| e.to_string())
}

#[cfg(windows)]
fn create_bin_link(
    bin_dir: &Path,
    bin_name: &str,
    pkg_name: &str,
    rel_target: &str,
) -> std::result::Result<(), String> {
    let rel = relative_target(pkg_name, rel_target);
    let rel_win = rel.to_string_lossy().replace('/', "\\");

    let cmd = format!("@echo off\r\nnode \"%~dp0\\{rel_win}\" %*\r\n");
    fs::write(bin_dir.join(format!("{bin_name}.cmd")), cmd).map_err(|e| e.to_string())?;

    let ps1 = format!("$target = Join-Path $PSScriptRoot '{rel_win}'\nnode $target $args\nexit $LASTEXITCODE\n");
    fs::write(bin_dir.join(format!("{bin_name}.ps1")), ps1).map_err(|e| e.to_string())?;
    Ok(())
}

/// Owner-execute on the target; chmod failures are ignored.
#[cfg(unix)]
fn make_executable(target: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = fs::metadata(target) {
        let mut perms = meta.permissions();
        perms.set_mode(perms.mode() | 0o100);
        let _ = fs::set_permissions(target, perms);
    }
}

#[cfg(not(unix))]
fn make_executable(_target: &Path) {}
