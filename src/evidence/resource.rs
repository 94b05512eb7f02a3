use std::io;
use std::path::{Path, PathBuf};

/// A temporary filesystem resource created during one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceHandle {
    /// A single file (uploaded artifact, materialized sample).
    File(PathBuf),
    /// A directory removed recursively.
    Directory(PathBuf),
}

/// What a release attempt found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The resource existed and was removed.
    Removed,
    /// Nothing was on disk at that path.
    Missing,
    /// The handle had already been released or handed off.
    AlreadyReleased,
    /// The handle was never tracked by this ledger.
    Untracked,
}

impl ResourceHandle {
    pub fn path(&self) -> &Path {
        match self {
            ResourceHandle::File(path) | ResourceHandle::Directory(path) => path,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, ResourceHandle::Directory(_))
    }

    /// Removes the resource. A path that no longer exists is not an error.
    pub async fn release(&self) -> io::Result<ReleaseOutcome> {
        let result = match self {
            ResourceHandle::File(path) => tokio::fs::remove_file(path).await,
            ResourceHandle::Directory(path) => tokio::fs::remove_dir_all(path).await,
        };
        map_removal(result)
    }

    /// Blocking variant used from `Drop`.
    pub fn release_blocking(&self) -> io::Result<ReleaseOutcome> {
        let result = match self {
            ResourceHandle::File(path) => std::fs::remove_file(path),
            ResourceHandle::Directory(path) => std::fs::remove_dir_all(path),
        };
        map_removal(result)
    }
}

fn map_removal(result: io::Result<()>) -> io::Result<ReleaseOutcome> {
    match result {
        Ok(()) => Ok(ReleaseOutcome::Removed),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ReleaseOutcome::Missing),
        Err(e) => Err(e),
    }
}

impl std::fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceHandle::File(path) => write!(f, "file:{}", path.display()),
            ResourceHandle::Directory(path) => write!(f, "dir:{}", path.display()),
        }
    }
}
