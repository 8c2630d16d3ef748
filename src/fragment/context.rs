//! Render context shaping.

use serde::Serialize;

use crate::descriptor::ServiceDescriptor;

/// Everything a renderer may reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FragmentContext {
    pub app_name: String,
    pub base_domain: String,
    pub base_cert: String,
    pub base_key: String,
    /// Services in manifest order.
    pub services: Vec<ServiceContext>,
    /// Injected by the caller; `None` keeps output fully reproducible.
    pub timestamp: Option<String>,
}

/// Per-service render data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceContext {
    pub service_name: String,
    pub service_port: u16,
    pub subdomain: String,
    pub fqdn: String,
    pub mtls: bool,
}

impl FragmentContext {
    pub fn new(
        app_name: &str,
        descriptors: &[ServiceDescriptor],
        domain: &str,
        cert: &str,
        key: &str,
        timestamp: Option<String>,
    ) -> Self {
        let services = descriptors
            .iter()
            .map(|svc| ServiceContext {
                service_name: svc.name.clone(),
                service_port: svc.port,
                subdomain: svc.subdomain.clone(),
                fqdn: svc.fqdn(domain),
                mtls: svc.mtls,
            })
            .collect();

        Self {
            app_name: app_name.to_string(),
            base_domain: domain.to_string(),
            base_cert: cert.to_string(),
            base_key: key.to_string(),
            services,
            timestamp,
        }
    }

    pub fn has_mtls(&self) -> bool {
        self.services.iter().any(|svc| svc.mtls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keeps_order_and_derives_fqdn() {
        let services = vec![
            ServiceDescriptor::new("zeta", 9000, "z"),
            ServiceDescriptor::new("alpha", 8000, "a").with_mtls(true),
        ];
        let ctx = FragmentContext::new("app", &services, "d.local", "d.crt", "d.key", None);

        assert_eq!(ctx.services[0].service_name, "zeta");
        assert_eq!(ctx.services[1].fqdn, "a.d.local");
        assert!(ctx.has_mtls());
    }
}
