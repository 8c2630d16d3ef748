//! Fragment composition.
//!
//! # Data Flow
//! ```text
//! descriptors + domain + cert/key names (+ injected timestamp)
//!     → context.rs (FragmentContext, manifest order)
//!     → renderer.rs (Renderer impl, default nginx)
//!     → configuration text
//! ```
//!
//! # Design Decisions
//! - Pure: never consults or mutates the registry
//! - Deterministic given the same inputs and timestamp
//! - Renderer is a trait so the output syntax can be swapped

pub mod context;
pub mod renderer;

pub use context::{FragmentContext, ServiceContext};
pub use renderer::{NginxRenderer, RenderError, Renderer};

use crate::descriptor::ServiceDescriptor;

/// Default certificate and key file names for a domain.
pub fn default_cert_names(domain: &str) -> (String, String) {
    (format!("{}.crt", domain), format!("{}.key", domain))
}

/// Compose one application's fragment.
pub fn compose_fragment(
    renderer: &dyn Renderer,
    app_name: &str,
    descriptors: &[ServiceDescriptor],
    domain: &str,
    cert: &str,
    key: &str,
    timestamp: Option<String>,
) -> Result<String, RenderError> {
    let ctx = FragmentContext::new(app_name, descriptors, domain, cert, key, timestamp);
    renderer.render(&ctx)
}
