//! Conflict detection.
//!
//! # Responsibilities
//! - Compare a candidate registration against a registry snapshot
//! - Report one conflict per clashing domain or fqdn
//!
//! # Design Decisions
//! - Pure evaluation: never blocks, never mutates
//! - Ownership by the same application is never a conflict, so re-running for
//!   an application is conflict-free
//! - Whether conflicts are fatal is the caller's decision
//! - Names are compared in ASCII lowercase, as DNS and `server_name` match

use std::fmt;

use serde::Serialize;

use super::model::Registry;
use crate::descriptor::ServiceDescriptor;

/// A name already owned by a different application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conflict {
    Domain { domain: String, owner: String },
    Subdomain { fqdn: String, owner: String },
}

impl Conflict {
    pub fn owner(&self) -> &str {
        match self {
            Conflict::Domain { owner, .. } | Conflict::Subdomain { owner, .. } => owner,
        }
    }

    pub fn is_domain(&self) -> bool {
        matches!(self, Conflict::Domain { .. })
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::Domain { domain, owner } => {
                write!(f, "Domain '{}' is already claimed by app '{}'", domain, owner)
            }
            Conflict::Subdomain { fqdn, owner } => {
                write!(f, "Subdomain '{}' is already claimed by app '{}'", fqdn, owner)
            }
        }
    }
}

/// Evaluate `app_name`'s claims on `domain` and each descriptor's fqdn.
///
/// Conflicts are ordered domain first, then descriptors in input order.
/// Reported names are lowercased.
pub fn check_conflicts(
    registry: &Registry,
    app_name: &str,
    domain: &str,
    descriptors: &[ServiceDescriptor],
) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    let domain = domain.to_ascii_lowercase();

    if let Some(owner) = registry.owner_of_domain(&domain) {
        if owner != app_name {
            conflicts.push(Conflict::Domain {
                domain: domain.clone(),
                owner: owner.to_string(),
            });
        }
    }

    for svc in descriptors {
        let fqdn = svc.fqdn(&domain).to_ascii_lowercase();
        if let Some(owner) = registry.owner_of_subdomain(&fqdn) {
            if owner != app_name {
                conflicts.push(Conflict::Subdomain {
                    fqdn,
                    owner: owner.to_string(),
                });
            }
        }
    }

    conflicts
}
