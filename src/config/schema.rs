//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the fragment
//! generator. All types derive Serde traits for deserialization from config
//! files, and every field has a default so an empty file is valid.

use serde::{Deserialize, Serialize};

use crate::descriptor::filter::DEFAULT_RESERVED_NAMES;
use crate::registry::store::DEFAULT_LOCK_SUFFIX;

/// Well-known registry location shared by every application on the host.
pub const DEFAULT_REGISTRY_PATH: &str = "/etc/isle-mesh/agent/registry.json";

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct IsleConfig {
    /// Registry document location and locking.
    pub registry: RegistryConfig,

    /// Descriptor extraction.
    pub provider: ProviderConfig,

    /// Reserved-name filtering.
    pub filter: FilterConfig,

    /// Fragment rendering options.
    pub render: RenderConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Path to the registry document.
    pub path: String,

    /// Suffix appended to `path` to form the lock file.
    pub lock_suffix: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_REGISTRY_PATH.to_string(),
            lock_suffix: DEFAULT_LOCK_SUFFIX.to_string(),
        }
    }
}

/// Descriptor provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProviderConfig {
    /// External extraction tool. The native compose reader is used when unset.
    pub command: Option<String>,

    /// Arguments placed before the manifest path.
    pub args: Vec<String>,
}

/// Reserved-name filter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Service names that belong to the ingress itself.
    pub reserved_names: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            reserved_names: DEFAULT_RESERVED_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Fragment rendering configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// HTTPS listen port.
    pub listen_port: u16,

    /// Plain HTTP port used by the redirect block.
    pub http_port: u16,

    /// Directory relative certificate/key names resolve against.
    pub ssl_dir: String,

    /// CA bundle used to verify client certificates for mTLS services.
    pub client_ca: String,

    /// Emit an HTTP→HTTPS redirect block.
    pub redirect_http: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            listen_port: 443,
            http_port: 80,
            ssl_dir: "/etc/nginx/ssl".to_string(),
            client_ca: "ca.crt".to_string(),
            redirect_http: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
