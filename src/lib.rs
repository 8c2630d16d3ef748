//! Shared-ingress fragment generator and domain registry.
//!
//! Many independently deployed applications share one reverse-proxy ingress.
//! For each application this crate renders a routing fragment (subdomain →
//! backend, optional mTLS) and records in a shared registry which application
//! owns which domain and subdomain, so two applications never silently claim
//! the same routable name.
//!
//! # Architecture Overview
//!
//! ```text
//!   manifest ──▶ descriptor ──▶ filter ──▶ registry::conflict ──▶ fragment ──▶ output file
//!                 provider                      ▲                                  │
//!                                               │                                  ▼
//!                              registry::store (locked load)  ◀──  registry::update (save)
//! ```

pub mod atomic;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod fragment;
pub mod observability;
pub mod pipeline;
pub mod registry;

pub use config::schema::IsleConfig;
pub use descriptor::ServiceDescriptor;
pub use error::IsleError;
pub use pipeline::{Pipeline, Prepared, RunOutcome, RunRequest};
pub use registry::{Registry, RegistryStore};
