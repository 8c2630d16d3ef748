//! Fatal error taxonomy for a pipeline run.
//!
//! Registry load problems are absent on purpose: they are recovered as a
//! [`LoadWarning`](crate::registry::LoadWarning), never raised.

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::descriptor::{DescriptorError, ProviderError};
use crate::fragment::RenderError;
use crate::registry::{Conflict, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum IsleError {
    /// Extraction tool missing, failed to start, or exited nonzero.
    #[error("{0}")]
    ProviderFailure(ProviderError),

    /// Provider output was not parseable descriptor data.
    #[error("{0}")]
    MalformedDescriptors(ProviderError),

    /// Descriptors are internally inconsistent.
    #[error("invalid service descriptors: {}", join(.0))]
    InvalidDescriptors(Vec<DescriptorError>),

    /// Nothing routable is left after removing reserved names.
    #[error("no services found in manifest {}", .0.display())]
    EmptyServiceSet(PathBuf),

    /// Names are owned by other applications and no override was given.
    #[error("{} conflict(s) with existing registrations", .0.len())]
    ConflictDetected(Vec<Conflict>),

    /// A required input path does not exist.
    #[error("{what} not found: {}", path.display())]
    PathMissing { what: &'static str, path: PathBuf },

    /// The fragment or registry could not be written.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Registry lock or serialization failure.
    #[error(transparent)]
    Registry(StoreError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<ProviderError> for IsleError {
    fn from(err: ProviderError) -> Self {
        if err.is_malformed() {
            IsleError::MalformedDescriptors(err)
        } else {
            IsleError::ProviderFailure(err)
        }
    }
}

impl From<StoreError> for IsleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Write { path, source } => IsleError::WriteFailure { path, source },
            other => IsleError::Registry(other),
        }
    }
}

impl IsleError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
