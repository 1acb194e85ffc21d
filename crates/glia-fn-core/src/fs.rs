//! Filesystem abstraction used by project creation.
//!
//! [`StdFileSystem`] talks to the real disk. [`MemoryFileSystem`] keeps files
//! in memory and can be told to fail writes under a path, which is how the
//! abort-on-first-failure behaviour of [`crate::project`] is exercised.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use walkdir::WalkDir;

/// The filesystem operations project creation and the CLI need.
pub trait FileSystem: Send + Sync {
    /// Write `contents`, creating parent directories and replacing any existing file.
    fn write(&self, path: &Path, contents: &str) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Every file below `dir`, recursively, sorted.
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1) {
            let entry = entry.map_err(io::Error::other)?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }
}

/// In-memory filesystem.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, String>>,
    fail_writes: Mutex<BTreeSet<PathBuf>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write to `path`, or below it, fail with `PermissionDenied`.
    pub fn fail_writes_under(&self, path: impl Into<PathBuf>) {
        lock(&self.fail_writes).insert(path.into());
    }

    /// Snapshot of every stored file.
    pub fn files(&self) -> BTreeMap<PathBuf, String> {
        lock(&self.files).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FileSystem for MemoryFileSystem {
    fn write(&self, path: &Path, contents: &str) -> io::Result<()> {
        if lock(&self.fail_writes).iter().any(|p| path.starts_with(p)) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("write to {} denied", path.display()),
            ));
        }
        lock(&self.files).insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        lock(&self.files).keys().any(|p| p.starts_with(path))
    }

    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        Ok(lock(&self.files)
            .keys()
            .filter(|p| p.starts_with(dir) && p.as_path() != dir)
            .cloned()
            .collect())
    }
}
