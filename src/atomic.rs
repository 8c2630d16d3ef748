//! Atomic file replacement.
//!
//! Readers of a path written here observe either the previous content or the
//! complete new content, never a partial write. A replaced file keeps its
//! permissions; a new one gets [`NEW_FILE_MODE`].

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Mode for files that did not exist before the write.
pub const NEW_FILE_MODE: u32 = 0o644;

/// Create `path`'s parent directory if it has one.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Write `contents` to a temp file next to `path`, fsync, then rename over it.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    ensure_parent_dir(path)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(contents)?;
    // The temp file starts out 0600
    match fs::metadata(path) {
        Ok(existing) => temp.as_file().set_permissions(existing.permissions())?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => set_new_file_mode(temp.as_file())?,
        Err(e) => return Err(e),
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(unix)]
fn set_new_file_mode(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(NEW_FILE_MODE))
}

#[cfg(not(unix))]
fn set_new_file_mode(_file: &fs::File) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_creates_parents_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.conf");

        write_atomic(&path, b"first").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first");

        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");

        // Only the target remains; no temp files left behind.
        let entries: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    fn mode(path: &Path) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[cfg(unix)]
    #[test]
    fn test_new_file_is_world_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.conf");
        write_atomic(&path, b"x").unwrap();
        assert_eq!(mode(&path), NEW_FILE_MODE);
    }

    #[cfg(unix)]
    #[test]
    fn test_replacement_keeps_existing_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.json");
        fs::write(&path, b"old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o664)).unwrap();

        write_atomic(&path, b"new").unwrap();
        assert_eq!(mode(&path), 0o664);
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }
}
