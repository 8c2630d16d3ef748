//! Descriptor filtering and validation.
//!
//! # Responsibilities
//! - Remove ingress infrastructure (reserved names) before any processing
//! - Apply operator-forced mTLS flags
//! - Lowercase subdomains so every later comparison is exact
//! - Validate the remaining set
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Filtering is stable: operator ordering survives

use std::collections::HashSet;

use super::ServiceDescriptor;

/// Reserved ingress identities used when no configuration overrides them.
pub const DEFAULT_RESERVED_NAMES: &[&str] = &["proxy", "mesh-proxy", "isle-agent"];

/// A single problem with the descriptor set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("duplicate service name '{0}'")]
    DuplicateName(String),

    #[error("subdomain '{subdomain}' used by both '{first}' and '{second}'")]
    DuplicateSubdomain {
        subdomain: String,
        first: String,
        second: String,
    },

    #[error("service '{0}' has port 0")]
    ZeroPort(String),

    #[error("service '{name}' has invalid subdomain '{subdomain}'")]
    InvalidSubdomain { name: String, subdomain: String },
}

/// Drop descriptors whose name is reserved.
pub fn filter_reserved<S: AsRef<str>>(
    descriptors: Vec<ServiceDescriptor>,
    reserved: &[S],
) -> Vec<ServiceDescriptor> {
    descriptors
        .into_iter()
        .filter(|svc| {
            let keep = !reserved.iter().any(|r| r.as_ref() == svc.name);
            if !keep {
                tracing::debug!(service = %svc.name, "Filtered reserved service");
            }
            keep
        })
        .collect()
}

/// Force mTLS on for every descriptor named in `names`.
///
/// Names that match nothing are reported back so the caller can warn.
pub fn apply_mtls_overrides<S: AsRef<str>>(
    descriptors: &mut [ServiceDescriptor],
    names: &[S],
) -> Vec<String> {
    let mut unmatched = Vec::new();
    for name in names {
        let name = name.as_ref();
        let mut found = false;
        for svc in descriptors.iter_mut().filter(|svc| svc.name == name) {
            svc.mtls = true;
            found = true;
        }
        if !found {
            unmatched.push(name.to_string());
        }
    }
    unmatched
}

/// Lowercase every subdomain; hostnames are case-insensitive.
pub fn normalize_subdomains(descriptors: &mut [ServiceDescriptor]) {
    for svc in descriptors {
        svc.subdomain.make_ascii_lowercase();
    }
}

/// RFC 1123 hostname label, optionally multi-label (`api.v2`).
fn is_valid_subdomain(subdomain: &str) -> bool {
    !subdomain.is_empty()
        && subdomain.len() <= 253
        && subdomain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

/// Check the descriptor set for internal consistency.
pub fn validate(descriptors: &[ServiceDescriptor]) -> Result<(), Vec<DescriptorError>> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();
    let mut subdomains: Vec<(&str, &str)> = Vec::new();

    for svc in descriptors {
        if !names.insert(svc.name.as_str()) {
            errors.push(DescriptorError::DuplicateName(svc.name.clone()));
        }

        if svc.port == 0 {
            errors.push(DescriptorError::ZeroPort(svc.name.clone()));
        }

        if !is_valid_subdomain(&svc.subdomain) {
            errors.push(DescriptorError::InvalidSubdomain {
                name: svc.name.clone(),
                subdomain: svc.subdomain.clone(),
            });
        }

        let existing = subdomains
            .iter()
            .find(|(sub, _)| sub.eq_ignore_ascii_case(&svc.subdomain))
            .map(|(_, first)| first.to_string());
        match existing {
            Some(first) => errors.push(DescriptorError::DuplicateSubdomain {
                subdomain: svc.subdomain.clone(),
                first,
                second: svc.name.clone(),
            }),
            None => subdomains.push((svc.subdomain.as_str(), svc.name.as_str())),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
