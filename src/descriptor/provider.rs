//! Descriptor providers.
//!
//! # Responsibilities
//! - Turn a deployment manifest into an ordered list of descriptors
//! - Surface extraction tool failures verbatim
//!
//! # Design Decisions
//! - Providers are synchronous; an extraction either completes or fails
//! - No retries: a failing tool is a fatal, deterministic error

use std::path::{Path, PathBuf};
use std::process::Command;

use super::{ProviderOutput, ServiceDescriptor};

/// Errors raised while extracting descriptors from a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The extraction tool could not be launched.
    #[error("failed to run descriptor provider '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The extraction tool exited unsuccessfully.
    #[error("descriptor provider '{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    /// The manifest could not be read.
    #[error("failed to read manifest {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Provider output was not the expected structured data.
    #[error("malformed descriptor data: {reason}")]
    Malformed { reason: String, output: String },
}

impl ProviderError {
    /// True when the error is about unparseable output rather than a failed tool.
    pub fn is_malformed(&self) -> bool {
        matches!(self, ProviderError::Malformed { .. })
    }
}

/// Source of service descriptors for one application.
pub trait DescriptorProvider {
    /// Extract descriptors from `manifest`, preserving manifest order.
    fn extract(&self, manifest: &Path) -> Result<Vec<ServiceDescriptor>, ProviderError>;
}

/// Runs an external tool that prints `{"services": [...]}` on stdout.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: String,
    args: Vec<String>,
}

impl CommandProvider {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Arguments placed before the manifest path.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

impl DescriptorProvider for CommandProvider {
    fn extract(&self, manifest: &Path) -> Result<Vec<ServiceDescriptor>, ProviderError> {
        tracing::debug!(program = %self.program, manifest = %manifest.display(), "Running descriptor provider");

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(manifest)
            .output()
            .map_err(|source| ProviderError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProviderError::Failed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed: ProviderOutput =
            serde_json::from_str(&stdout).map_err(|e| ProviderError::Malformed {
                reason: e.to_string(),
                output: stdout.to_string(),
            })?;

        Ok(parsed.services)
    }
}

/// Returns a fixed descriptor list regardless of manifest.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    services: Vec<ServiceDescriptor>,
}

impl StaticProvider {
    pub fn new(services: Vec<ServiceDescriptor>) -> Self {
        Self { services }
    }
}

impl DescriptorProvider for StaticProvider {
    fn extract(&self, _manifest: &Path) -> Result<Vec<ServiceDescriptor>, ProviderError> {
        Ok(self.services.clone())
    }
}
