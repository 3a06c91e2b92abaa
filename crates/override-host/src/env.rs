//! Environment layout and directory listing.
//!
//! Computed overrides derive their values from where the SDK, toolchain and
//! packages are installed. These services expose that layout read-only.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::HostError;

/// Read-only accessors into the host's install layout.
pub trait EnvironmentPaths: Send + Sync {
    fn packages_root(&self) -> PathBuf;
    fn toolchain_bin_root(&self) -> PathBuf;
    fn toolchain_root(&self) -> PathBuf;
    fn sdk_root(&self) -> PathBuf;
}

/// Lists the subdirectories of one directory.
pub trait DirectoryLister: Send + Sync {
    /// Names of the subdirectories of `path`, sorted by name.
    fn list_dirs(&self, path: &Path) -> Result<Vec<String>, HostError>;
}

/// Join `segments` beneath `root`.
///
/// Empty segments and `.` are skipped so callers can compose optional parts.
pub fn resolve_path<S: AsRef<str>>(root: &Path, segments: &[S]) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in segments {
        let segment = segment.as_ref();
        if segment.is_empty() || segment == "." {
            continue;
        }
        path.push(segment);
    }
    path
}

/// Fixed install layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticPaths {
    pub packages_root: PathBuf,
    pub toolchain_bin_root: PathBuf,
    pub toolchain_root: PathBuf,
    pub sdk_root: PathBuf,
}

impl StaticPaths {
    /// Layout under a single install prefix: `<prefix>/packages`,
    /// `<prefix>/toolchain`, `<prefix>/toolchain/bin`, `<prefix>/sdk`.
    pub fn under(prefix: &Path) -> Self {
        Self {
            packages_root: prefix.join("packages"),
            toolchain_bin_root: prefix.join("toolchain").join("bin"),
            toolchain_root: prefix.join("toolchain"),
            sdk_root: prefix.join("sdk"),
        }
    }
}

impl EnvironmentPaths for StaticPaths {
    fn packages_root(&self) -> PathBuf {
        self.packages_root.clone()
    }

    fn toolchain_bin_root(&self) -> PathBuf {
        self.toolchain_bin_root.clone()
    }

    fn toolchain_root(&self) -> PathBuf {
        self.toolchain_root.clone()
    }

    fn sdk_root(&self) -> PathBuf {
        self.sdk_root.clone()
    }
}

/// Directory lister backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLister;

impl DirectoryLister for FsLister {
    fn list_dirs(&self, path: &Path) -> Result<Vec<String>, HostError> {
        if !path.is_dir() {
            return Err(HostError::NotFound(path.to_path_buf()));
        }

        let walker = WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        let mut names = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| HostError::Io(e.into()))?;
            // Symlinked version directories count; dangling links do not.
            let is_dir = entry.file_type().is_dir()
                || (entry.path_is_symlink() && entry.path().is_dir());
            if is_dir {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }
}
