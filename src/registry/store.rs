//! Registry persistence and locking.
//!
//! # Responsibilities
//! - Load the registry document, tolerating missing or corrupt files
//! - Persist the full document atomically
//! - Serialize read-modify-write cycles across processes
//!
//! # Design Decisions
//! - `load` never fails: problems yield the empty registry plus a warning,
//!   which the caller reports
//! - Writes go through temp file + rename, so readers never see partial JSON
//! - The lock lives on a sibling file because rename replaces the registry
//!   inode; a lock on the registry itself would not survive a save
//! - `RegistryLock` is RAII: the lock is released on every exit path

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::model::Registry;
use crate::atomic::{ensure_parent_dir, write_atomic};

/// Default lock file suffix appended to the registry path.
pub const DEFAULT_LOCK_SUFFIX: &str = ".lock";

/// Errors raised while persisting or locking the registry.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to write registry {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize registry: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to lock registry {}: {source}", path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Why `load` fell back to the empty registry.
#[derive(Debug)]
pub enum LoadWarning {
    /// No registry exists yet.
    Missing,
    /// The file exists but could not be read.
    Unreadable(io::Error),
    /// The file is not a valid registry document.
    Corrupt(serde_json::Error),
}

impl LoadWarning {
    /// A missing registry is the normal first-run state.
    pub fn is_missing(&self) -> bool {
        matches!(self, LoadWarning::Missing)
    }
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadWarning::Missing => write!(f, "registry does not exist yet"),
            LoadWarning::Unreadable(e) => write!(f, "could not read registry: {}", e),
            LoadWarning::Corrupt(e) => write!(f, "could not parse registry: {}", e),
        }
    }
}

/// Result of a tolerant load.
#[derive(Debug)]
pub struct Loaded {
    pub registry: Registry,
    pub warning: Option<LoadWarning>,
}

/// Location of a registry document and its lock file.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_lock_suffix(path, DEFAULT_LOCK_SUFFIX)
    }

    pub fn with_lock_suffix(path: impl Into<PathBuf>, suffix: &str) -> Self {
        let path = path.into();
        let mut lock_name = path.clone().into_os_string();
        lock_name.push(suffix);
        Self {
            path,
            lock_path: PathBuf::from(lock_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Read the registry without taking the lock.
    ///
    /// Safe for read-only use: atomic saves mean a reader always sees a
    /// complete document.
    pub fn load(&self) -> Loaded {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "Registry not found, starting empty");
                return Loaded {
                    registry: Registry::empty(),
                    warning: Some(LoadWarning::Missing),
                };
            }
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "Could not read registry, starting empty");
                return Loaded {
                    registry: Registry::empty(),
                    warning: Some(LoadWarning::Unreadable(e)),
                };
            }
        };

        match serde_json::from_str(&content) {
            Ok(registry) => Loaded {
                registry,
                warning: None,
            },
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "Could not parse registry, starting empty");
                Loaded {
                    registry: Registry::empty(),
                    warning: Some(LoadWarning::Corrupt(e)),
                }
            }
        }
    }

    /// Overwrite the persisted registry with `registry`.
    ///
    /// Callers mutating the registry should hold a [`RegistryLock`] from load
    /// through save; [`RegistryLock::save`] does exactly that.
    pub fn save(&self, registry: &Registry) -> Result<(), StoreError> {
        let mut serialized = serde_json::to_vec_pretty(registry)?;
        serialized.push(b'\n');
        write_atomic(&self.path, &serialized).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!(path = %self.path.display(), "Registry saved");
        Ok(())
    }

    /// Block until this process holds the exclusive registry lock.
    pub fn lock(&self) -> Result<RegistryLock<'_>, StoreError> {
        let lock_err = |source| StoreError::Lock {
            path: self.lock_path.clone(),
            source,
        };

        ensure_parent_dir(&self.lock_path).map_err(lock_err)?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(lock_err)?;
        FileExt::lock_exclusive(&file).map_err(lock_err)?;

        tracing::debug!(lock = %self.lock_path.display(), "Registry lock acquired");
        Ok(RegistryLock { store: self, file })
    }
}

/// Exclusive hold on a registry; released on drop.
#[derive(Debug)]
pub struct RegistryLock<'a> {
    store: &'a RegistryStore,
    file: File,
}

impl RegistryLock<'_> {
    pub fn load(&self) -> Loaded {
        self.store.load()
    }

    pub fn save(&self, registry: &Registry) -> Result<(), StoreError> {
        self.store.save(registry)
    }

    pub fn store(&self) -> &RegistryStore {
        self.store
    }
}

impl Drop for RegistryLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(lock = %self.store.lock_path.display(), error = %e, "Failed to release registry lock");
        } else {
            tracing::debug!(lock = %self.store.lock_path.display(), "Registry lock released");
        }
    }
}
