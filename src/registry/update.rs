//! Registry merge.
//!
//! # Responsibilities
//! - Record one application's claims in a registry snapshot
//! - Refresh the application's summary
//!
//! # Design Decisions
//! - Last writer wins: claims overwrite existing owners without checking.
//!   Collision prevention belongs to the conflict check run beforehand
//! - Existing claims of the same application are never pruned; there is no
//!   deletion path
//! - The timestamp is a parameter so callers and tests control it
//! - Keys are stored in ASCII lowercase, matching the conflict check

use chrono::{DateTime, SecondsFormat, Utc};

use super::model::{AppSummary, Registry};
use crate::descriptor::ServiceDescriptor;

/// Render a registry timestamp (ISO-8601, UTC, microseconds).
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Merge `app_name`'s claims on `domain` and every descriptor's fqdn.
pub fn merge_claims(
    registry: &mut Registry,
    app_name: &str,
    domain: &str,
    descriptors: &[ServiceDescriptor],
    at: DateTime<Utc>,
) {
    let domain = domain.to_ascii_lowercase();
    if let Some(previous) = registry.domains.insert(domain.clone(), app_name.to_string()) {
        if previous != app_name {
            tracing::warn!(domain = %domain, previous_owner = %previous, new_owner = app_name, "Domain ownership overwritten");
        }
    }

    let fqdns: Vec<String> = descriptors
        .iter()
        .map(|svc| svc.fqdn(&domain).to_ascii_lowercase())
        .collect();
    for fqdn in &fqdns {
        if let Some(previous) = registry.subdomains.insert(fqdn.clone(), app_name.to_string()) {
            if previous != app_name {
                tracing::warn!(fqdn = %fqdn, previous_owner = %previous, new_owner = app_name, "Subdomain ownership overwritten");
            }
        }
    }

    registry.apps.insert(
        app_name.to_string(),
        AppSummary {
            domain,
            subdomain_count: descriptors.len(),
            subdomain_list: fqdns,
            updated_at: format_timestamp(at),
        },
    );
}
