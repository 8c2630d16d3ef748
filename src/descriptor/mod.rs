//! Service descriptor subsystem.
//!
//! # Data Flow
//! ```text
//! deployment manifest
//!     → provider.rs (external tool or native compose reader)
//!     → Vec<ServiceDescriptor> (manifest order)
//!     → filter.rs (drop reserved names, apply mTLS overrides, lowercase subdomains)
//!     → filter.rs (validate: unique names/subdomains, ports, DNS labels)
//!     → conflict checking and fragment composition
//! ```
//!
//! # Design Decisions
//! - Descriptors are plain data; ordering is the manifest's ordering
//! - The fqdn (`subdomain.domain`) is the uniqueness key, never the bare subdomain
//! - Providers are a trait so new manifest formats don't touch the core

pub mod compose;
pub mod filter;
pub mod provider;

use serde::{Deserialize, Serialize};

pub use compose::ComposeFileProvider;
pub use filter::{
    apply_mtls_overrides, filter_reserved, normalize_subdomains, validate, DescriptorError,
};
pub use provider::{CommandProvider, DescriptorProvider, ProviderError, StaticProvider};

/// One routable backend within an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Service name, unique within the application.
    pub name: String,

    /// Backend port the proxy forwards to.
    pub port: u16,

    /// Subdomain label, unique within the application.
    pub subdomain: String,

    /// Whether clients must present a certificate.
    #[serde(default)]
    pub mtls: bool,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>, port: u16, subdomain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port,
            subdomain: subdomain.into(),
            mtls: false,
        }
    }

    /// Builder-style toggle for mutual TLS.
    pub fn with_mtls(mut self, mtls: bool) -> Self {
        self.mtls = mtls;
        self
    }

    /// Fully-qualified subdomain under `domain`.
    pub fn fqdn(&self, domain: &str) -> String {
        fqdn(&self.subdomain, domain)
    }
}

/// Join a subdomain label and its base domain.
pub fn fqdn(subdomain: &str, domain: &str) -> String {
    format!("{}.{}", subdomain, domain)
}

/// Wire shape produced by external descriptor providers.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProviderOutput {
    #[serde(default)]
    pub services: Vec<ServiceDescriptor>,
}
