use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};

/// File access consumed by the loader and the `file` tag.
///
/// The pipeline never touches the filesystem directly, so documents can be
/// served from memory in tests or embedded hosts.
pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    fn is_file(&self, path: &Path) -> bool;

    /// Canonical form of `path`, or `None` when it cannot be resolved.
    fn canonicalize(&self, path: &Path) -> Option<PathBuf>;

    /// Canonical form when available, otherwise `path` unchanged.
    fn real_path(&self, path: &Path) -> PathBuf {
        self.canonicalize(path).unwrap_or_else(|| path.to_path_buf())
    }
}

/// The host filesystem via `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn canonicalize(&self, path: &Path) -> Option<PathBuf> {
        std::fs::canonicalize(path).ok()
    }
}
