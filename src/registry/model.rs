//! Registry document model.
//!
//! # Responsibilities
//! - Mirror the persisted JSON document
//! - Answer ownership queries
//! - Audit the denormalized `apps` summaries against the authoritative maps
//!
//! # Design Decisions
//! - BTreeMap keys so the serialized document is stable across runs
//! - Every section defaults, so partial documents still load
//! - `updated_at` is kept as text; documents written by other tools may use
//!   any ISO-8601 flavour

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The shared ownership document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Registry {
    /// Domain → owning application.
    pub domains: BTreeMap<String, String>,

    /// Fully-qualified subdomain → owning application.
    pub subdomains: BTreeMap<String, String>,

    /// Application → summary of its last registration. Not authoritative.
    pub apps: BTreeMap<String, AppSummary>,
}

/// Denormalized per-application summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSummary {
    pub domain: String,

    #[serde(rename = "services")]
    pub subdomain_count: usize,

    #[serde(rename = "subdomains")]
    pub subdomain_list: Vec<String>,

    pub updated_at: String,
}

/// Every name an application currently owns in the authoritative maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Claims {
    pub domains: Vec<String>,
    pub subdomains: Vec<String>,
}

/// A disagreement between an `apps` summary and the authoritative maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditFinding {
    /// Summary names a domain the app no longer owns.
    StaleDomain {
        app: String,
        domain: String,
        owner: Option<String>,
    },
    /// Summary lists an fqdn the app no longer owns.
    StaleSubdomain {
        app: String,
        fqdn: String,
        owner: Option<String>,
    },
    /// App owns a name its summary does not mention.
    UnlistedClaim { app: String, name: String },
    /// App owns names but has no summary at all.
    MissingSummary { app: String },
}

impl fmt::Display for AuditFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let owner_text = |owner: &Option<String>| match owner {
            Some(o) => format!("owned by '{}'", o),
            None => "unowned".to_string(),
        };
        match self {
            AuditFinding::StaleDomain { app, domain, owner } => write!(
                f,
                "app '{}' lists domain '{}' which is {}",
                app,
                domain,
                owner_text(owner)
            ),
            AuditFinding::StaleSubdomain { app, fqdn, owner } => write!(
                f,
                "app '{}' lists subdomain '{}' which is {}",
                app,
                fqdn,
                owner_text(owner)
            ),
            AuditFinding::UnlistedClaim { app, name } => {
                write!(f, "app '{}' owns '{}' but its summary does not list it", app, name)
            }
            AuditFinding::MissingSummary { app } => {
                write!(f, "app '{}' owns names but has no summary", app)
            }
        }
    }
}

impl Registry {
    /// The canonical empty registry.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn owner_of_domain(&self, domain: &str) -> Option<&str> {
        self.domains.get(domain).map(String::as_str)
    }

    pub fn owner_of_subdomain(&self, fqdn: &str) -> Option<&str> {
        self.subdomains.get(fqdn).map(String::as_str)
    }

    /// Owner of either a domain or an fqdn, domains first.
    pub fn owner_of(&self, name: &str) -> Option<&str> {
        self.owner_of_domain(name)
            .or_else(|| self.owner_of_subdomain(name))
    }

    /// Names `app` owns in the authoritative maps, sorted.
    pub fn claims_of(&self, app: &str) -> Claims {
        let owned = |map: &BTreeMap<String, String>| -> Vec<String> {
            map.iter()
                .filter(|(_, owner)| owner.as_str() == app)
                .map(|(name, _)| name.clone())
                .collect()
        };
        Claims {
            domains: owned(&self.domains),
            subdomains: owned(&self.subdomains),
        }
    }

    /// Compare every summary with the authoritative maps.
    pub fn audit(&self) -> Vec<AuditFinding> {
        let mut findings = Vec::new();

        for (app, summary) in &self.apps {
            let domain_owner = self.owner_of_domain(&summary.domain);
            if domain_owner != Some(app.as_str()) {
                findings.push(AuditFinding::StaleDomain {
                    app: app.clone(),
                    domain: summary.domain.clone(),
                    owner: domain_owner.map(str::to_string),
                });
            }

            for fqdn in &summary.subdomain_list {
                let owner = self.owner_of_subdomain(fqdn);
                if owner != Some(app.as_str()) {
                    findings.push(AuditFinding::StaleSubdomain {
                        app: app.clone(),
                        fqdn: fqdn.clone(),
                        owner: owner.map(str::to_string),
                    });
                }
            }
        }

        let mut owners: Vec<&str> = self
            .domains
            .values()
            .chain(self.subdomains.values())
            .map(String::as_str)
            .collect();
        owners.sort_unstable();
        owners.dedup();

        for app in owners {
            let Some(summary) = self.apps.get(app) else {
                findings.push(AuditFinding::MissingSummary { app: app.to_string() });
                continue;
            };
            let claims = self.claims_of(app);
            for domain in claims.domains {
                if domain != summary.domain {
                    findings.push(AuditFinding::UnlistedClaim {
                        app: app.to_string(),
                        name: domain,
                    });
                }
            }
            for fqdn in claims.subdomains {
                if !summary.subdomain_list.contains(&fqdn) {
                    findings.push(AuditFinding::UnlistedClaim {
                        app: app.to_string(),
                        name: fqdn,
                    });
                }
            }
        }

        findings
    }
}
