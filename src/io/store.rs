//! File-system access for artifacts and charts.
//!
//! The analysis side never touches `std::fs` directly; it goes through an
//! [`ArtifactStore`] so tests can run against [`MemoryStore`] and nothing
//! depends on the process working directory beyond the paths it is given.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::AppError;

pub trait ArtifactStore {
    fn exists(&self, path: &Path) -> bool;

    /// Read a whole file. A missing file is a `MissingArtifact` error.
    fn read(&self, path: &Path) -> Result<Vec<u8>, AppError>;

    /// Write a whole file, replacing any previous content.
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), AppError>;

    /// Files directly under `dir` with the given extension, sorted by path.
    fn list(&self, dir: &Path, extension: &str) -> Result<Vec<PathBuf>, AppError>;

    fn create_dir_all(&self, dir: &Path) -> Result<(), AppError>;
}

/// The real file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStore;

impl ArtifactStore for LocalStore {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, AppError> {
        fs::read(path).map_err(|e| {
            if e.kind() == IoErrorKind::NotFound {
                AppError::missing_artifact(format!("Artifact '{}' not found.", path.display()))
            } else {
                AppError::data_format(format!("Failed to read '{}': {e}", path.display()))
            }
        })
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), AppError> {
        fs::write(path, bytes)
            .map_err(|e| AppError::render(format!("Failed to write '{}': {e}", path.display())))
    }

    fn list(&self, dir: &Path, extension: &str) -> Result<Vec<PathBuf>, AppError> {
        let entries = fs::read_dir(dir).map_err(|e| {
            AppError::missing_artifact(format!("Failed to list '{}': {e}", dir.display()))
        })?;

        let mut out = Vec::new();
        for entry in entries {
            let entry = entry
                .map_err(|e| AppError::data_format(format!("Failed to list '{}': {e}", dir.display())))?;
            let path = entry.path();
            if path.is_file() && has_extension(&path, extension) {
                out.push(path);
            }
        }
        out.sort();
        Ok(out)
    }

    fn create_dir_all(&self, dir: &Path) -> Result<(), AppError> {
        fs::create_dir_all(dir)
            .map_err(|e| AppError::config(format!("Failed to create directory '{}': {e}", dir.display())))
    }
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        self.lock().insert(path.into(), bytes.into());
    }

    pub fn get(&self, path: &Path) -> Option<Vec<u8>> {
        self.lock().get(path).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, Vec<u8>>> {
        // A poisoned map is still a valid map.
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ArtifactStore for MemoryStore {
    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(path)
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>, AppError> {
        self.get(path)
            .ok_or_else(|| AppError::missing_artifact(format!("Artifact '{}' not found.", path.display())))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), AppError> {
        self.insert(path, bytes);
        Ok(())
    }

    fn list(&self, dir: &Path, extension: &str) -> Result<Vec<PathBuf>, AppError> {
        Ok(self
            .lock()
            .keys()
            .filter(|p| p.parent() == Some(dir) && has_extension(p, extension))
            .cloned()
            .collect())
    }

    fn create_dir_all(&self, _dir: &Path) -> Result<(), AppError> {
        Ok(())
    }
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}
