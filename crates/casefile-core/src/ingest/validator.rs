/// Existence and readability checks for local source paths.
///
/// Checks run in a fixed order (existence, then readability) and the first
/// failure is reported. Special files are never opened: opening a fifo
/// would block the caller.
use crate::error::ValidationFailure;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

/// What a validated local path turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalPathKind {
    File,
    Directory,
    /// Fifo, socket, device, or an unfollowed symlink.
    Other,
}

/// Make `path` absolute and fold away `.` and `..` components.
///
/// Resolution is purely lexical: `case1/work/../evidence` becomes
/// `case1/evidence` without consulting the filesystem, so a `..` after a
/// symlinked directory climbs the link's own parent. `..` at the
/// filesystem root stays at the root.
pub fn normalize(path: &Path) -> io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut out = PathBuf::with_capacity(absolute.as_os_str().len());
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `pop` refuses to remove the root or a prefix.
                out.pop();
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Classify `path` and check that it can be read.
///
/// Symlinks are followed when `follow_links` is set; otherwise a link is
/// reported as [`LocalPathKind::Other`] without touching its target.
pub fn inspect(path: &Path, follow_links: bool) -> Result<LocalPathKind, ValidationFailure> {
    let meta = if follow_links {
        fs::metadata(path)
    } else {
        fs::symlink_metadata(path)
    }
    .map_err(|_| ValidationFailure::Missing)?;

    let kind = if meta.is_dir() {
        LocalPathKind::Directory
    } else if meta.is_file() {
        LocalPathKind::File
    } else {
        LocalPathKind::Other
    };

    let readable = match kind {
        LocalPathKind::File => fs::File::open(path).is_ok(),
        LocalPathKind::Directory => fs::read_dir(path).is_ok(),
        LocalPathKind::Other => true,
    };
    if !readable {
        return Err(ValidationFailure::Unreadable);
    }
    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_classifies_file_and_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.txt");
        fs::write(&file, b"hello").unwrap();

        assert_eq!(inspect(&file, false), Ok(LocalPathKind::File));
        assert_eq!(inspect(tmp.path(), false), Ok(LocalPathKind::Directory));
    }

    #[cfg(unix)]
    #[test]
    fn test_normalize_folds_dot_components() {
        assert_eq!(
            normalize(Path::new("/x/case1/work/../evidence")).unwrap(),
            PathBuf::from("/x/case1/evidence")
        );
        assert_eq!(
            normalize(Path::new("/x/case1/evidence/..")).unwrap(),
            PathBuf::from("/x/case1")
        );
        assert_eq!(
            normalize(Path::new("/x/./case1/")).unwrap(),
            PathBuf::from("/x/case1")
        );
        assert_eq!(normalize(Path::new("/..")).unwrap(), PathBuf::from("/"));
        assert!(normalize(Path::new("rel/dir")).unwrap().is_absolute());
    }

    #[test]
    fn test_missing_path() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(
            inspect(&tmp.path().join("nope"), false),
            Err(ValidationFailure::Missing)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_file_and_directory() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("locked.txt");
        fs::write(&file, b"secret").unwrap();
        let dir = tmp.path().join("locked");
        fs::create_dir(&dir).unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o000)).unwrap();
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not bind a privileged user.
        if fs::File::open(&file).is_ok() {
            fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        assert_eq!(inspect(&file, false), Err(ValidationFailure::Unreadable));
        assert_eq!(inspect(&dir, false), Err(ValidationFailure::Unreadable));

        // Let TempDir clean up.
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_classification() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("target.txt");
        fs::write(&target, b"x").unwrap();
        let link = tmp.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert_eq!(inspect(&link, false), Ok(LocalPathKind::Other));
        assert_eq!(inspect(&link, true), Ok(LocalPathKind::File));

        // A dangling link exists as a link but not as a target.
        fs::remove_file(&target).unwrap();
        assert_eq!(inspect(&link, false), Ok(LocalPathKind::Other));
        assert_eq!(inspect(&link, true), Err(ValidationFailure::Missing));
    }
}
