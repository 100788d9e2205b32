use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tar::{Archive, Builder, EntryType, Header};

use lode_error::{LodeError, Result};

/// Extract a gzip-compressed ustar stream into `dest`.
///
/// Registry tarballs wrap their payload under a `package/` directory; more
/// generally the longest directory prefix shared by every non-directory
/// entry is stripped, so the payload lands directly in `dest`. Returns the
/// number of files written. `label` names the package in errors.
pub fn extract_tarball(bytes: &[u8], dest: &Path, label: &str) -> Result<usize> {
    let prefix = common_prefix(bytes, label)?;

    let mut archive = Archive::new(GzDecoder::new(bytes));
    let mut written = 0usize;

    for entry in archive.entries().map_err(|e| extract_err(label, &e))? {
        let mut entry = entry.map_err(|e| extract_err(label, &e))?;
        let entry_type = entry.header().entry_type();
        if is_special(entry_type) {
            continue;
        }

        let path = entry.path().map_err(|e| extract_err(label, &e))?.into_owned();
        // entries escaping the destination are dropped outright
        let Some(components) = sanitize(&path) else {
            continue;
        };
        if !components.starts_with(&prefix) {
            continue;
        }
        let stripped = &components[prefix.len()..];
        if stripped.is_empty() {
            continue;
        }

        let mut target = dest.to_path_buf();
        for component in stripped {
            target.push(component);
        }

        if entry_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if entry_type.is_symlink() {
            let link = entry
                .link_name()
                .map_err(|e| extract_err(label, &e))?
                .ok_or_else(|| {
                    LodeError::ExtractionError(label.to_string(), "symlink without target".into())
                })?;
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            #[cfg(unix)]
            {
                let _ = fs::remove_file(&target);
                std::os::unix::fs::symlink(link.as_ref(), &target)?;
            }
            #[cfg(windows)]
            {
                let _ = std::os::windows::fs::symlink_file(link.as_ref(), &target);
            }
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::File::create(&target)?;
            io::copy(&mut entry, &mut file)?;
            written += 1;

            // chmod failures are non-fatal
            #[cfg(unix)]
            if let Ok(mode) = entry.header().mode() {
                use std::os::unix::fs::PermissionsExt;
                let _ = fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o7777));
            }
        }
    }

    Ok(written)
}

/// First pass over the stream: the longest directory prefix shared by every
/// non-directory entry (`package` for npm tarballs).
fn common_prefix(bytes: &[u8], label: &str) -> Result<Vec<String>> {
    let mut archive = Archive::new(GzDecoder::new(bytes));
    let mut prefix: Option<Vec<String>> = None;

    for entry in archive.entries().map_err(|e| extract_err(label, &e))? {
        let entry = entry.map_err(|e| extract_err(label, &e))?;
        let entry_type = entry.header().entry_type();
        if is_special(entry_type) || entry_type.is_dir() {
            continue;
        }
        let path = entry.path().map_err(|e| extract_err(label, &e))?.into_owned();
        let Some(components) = sanitize(&path) else {
            continue;
        };
        if components.is_empty() {
            continue;
        }

        let parent = &components[..components.len() - 1];
        prefix = Some(match prefix {
            None => parent.to_vec(),
            Some(current) => current
                .iter()
                .zip(parent.iter())
                .take_while(|(a, b)| a == b)
                .map(|(a, _)| a.clone())
                .collect(),
        });
        if prefix.as_ref().is_some_and(Vec::is_empty) {
            break;
        }
    }

    Ok(prefix.unwrap_or_default())
}

/// PAX and GNU extension headers carry metadata, not payload.
fn is_special(entry_type: EntryType) -> bool {
    entry_type.is_pax_global_extensions()
        || entry_type.is_pax_local_extensions()
        || entry_type.is_gnu_longname()
        || entry_type.is_gnu_longlink()
}

/// Normal path components only; absolute paths and `..` disqualify the
/// entry.
fn sanitize(path: &Path) -> Option<Vec<String>> {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => components.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(components)
}

fn extract_err(label: &str, err: &dyn std::fmt::Display) -> LodeError {
    LodeError::ExtractionError(label.to_string(), err.to_string())
}

/// Pack a directory into a gzipped ustar stream under the conventional
/// `package/` prefix. Entries are sorted so the output is deterministic.
pub fn create_tarball(src_dir: &Path) -> Result<Vec<u8>> {
    let mut builder = Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    append_dir(&mut builder, "package", src_dir)?;
    let encoder = builder.into_inner().map_err(LodeError::from)?;
    let bytes = encoder.finish().map_err(LodeError::from)?;
    Ok(bytes)
}

fn append_dir<W: Write>(builder: &mut Builder<W>, prefix: &str, dir: &Path) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<io::Result<_>>()?;
    entries.sort_by_key(std::fs::DirEntry::file_name);

    for entry in entries {
        let path = entry.path();
        let name = format!("{prefix}/{}", entry.file_name().to_string_lossy());
        let meta = fs::symlink_metadata(&path)?;

        if meta.file_type().is_symlink() {
            let target = fs::read_link(&path)?;
            let mut header = Header::new_ustar();
            header.set_entry_type(EntryType::Symlink);
            header.set_size(0);
            header.set_mode(0o777);
            header.set_cksum();
            builder.append_link(&mut header, &name, &target)?;
        } else if meta.is_dir() {
            let mut header = Header::new_ustar();
            header.set_entry_type(EntryType::Directory);
            header.set_size(0);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, format!("{name}/"), io::empty())?;
            append_dir(builder, &name, &path)?;
        } else {
            let mut header = Header::new_ustar();
            header.set_size(meta.len());
            header.set_mode(file_mode(&meta));
            header.set_cksum();
            let mut file = fs::File::open(&path)?;
            builder.append_data(&mut header, &name, &mut file)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn file_mode(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn file_mode(_meta: &fs::Metadata) -> u32 {
    0o644
}
