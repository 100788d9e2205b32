use std::fs;
use std::io;
use std::path::Path;

/// Mirror `src` into `dst`: directories are recreated, every regular file is
/// hardlinked with a copy fallback, and symlinks are recreated with the same
/// target text. The source tree is never modified, which is safe because
/// store entries are immutable once committed.
pub fn link_tree(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let from = entry.path();
        let to = dst.join(entry.file_name());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            link_tree(&from, &to)?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(&from)?;
            let _ = fs::remove_file(&to);
            #[cfg(unix)]
            std::os::unix::fs::symlink(&target, &to)?;
            #[cfg(windows)]
            let _ = std::os::windows::fs::symlink_file(&target, &to);
        } else {
            link_file(&from, &to)?;
        }
    }
    Ok(())
}

/// Hard link `src` to `dst`, copying instead when the link fails (typically
/// a store on another filesystem).
pub fn link_file(src: &Path, dst: &Path) -> io::Result<()> {
    let _ = fs::remove_file(dst);
    if fs::hard_link(src, dst).is_ok() {
        return Ok(());
    }
    fs::copy(src, dst).map(|_| ())
}
