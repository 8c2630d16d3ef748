//! Fragment renderers.
//!
//! # Responsibilities
//! - Turn a [`FragmentContext`] into proxy configuration text
//! - Refuse values that would break out of a directive
//!
//! # Design Decisions
//! - Renderers are pure: same context, same bytes
//! - One HTTPS server block per service, in context order
//! - Optional shared HTTP→HTTPS redirect block ahead of the services

use std::fmt::Write;

use super::context::{FragmentContext, ServiceContext};
use crate::config::RenderConfig;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("{field} value '{value}' cannot be embedded in a config directive")]
    UnsafeValue { field: &'static str, value: String },

    #[error("formatting failed: {0}")]
    Format(#[from] std::fmt::Error),
}

/// Produces configuration text from a render context.
pub trait Renderer {
    fn render(&self, ctx: &FragmentContext) -> Result<String, RenderError>;
}

/// Built-in nginx fragment renderer.
#[derive(Debug, Clone, Default)]
pub struct NginxRenderer {
    options: RenderConfig,
}

impl NginxRenderer {
    pub fn new(options: RenderConfig) -> Self {
        Self { options }
    }

    fn ssl_path(&self, file: &str) -> String {
        if file.starts_with('/') {
            file.to_string()
        } else {
            format!("{}/{}", self.options.ssl_dir.trim_end_matches('/'), file)
        }
    }

    fn write_redirect(&self, out: &mut String, ctx: &FragmentContext) -> std::fmt::Result {
        let names: Vec<&str> = ctx.services.iter().map(|s| s.fqdn.as_str()).collect();
        writeln!(out, "server {{")?;
        writeln!(out, "    listen {};", self.options.http_port)?;
        writeln!(out, "    server_name {};", names.join(" "))?;
        writeln!(out, "    return 301 https://$host$request_uri;")?;
        writeln!(out, "}}")?;
        writeln!(out)
    }

    fn write_service(
        &self,
        out: &mut String,
        ctx: &FragmentContext,
        svc: &ServiceContext,
    ) -> std::fmt::Result {
        let mtls_note = if svc.mtls { " (mTLS)" } else { "" };
        writeln!(out, "# {}{}", svc.service_name, mtls_note)?;
        writeln!(out, "server {{")?;
        writeln!(out, "    listen {} ssl;", self.options.listen_port)?;
        writeln!(out, "    server_name {};", svc.fqdn)?;
        writeln!(out)?;
        writeln!(out, "    ssl_certificate {};", self.ssl_path(&ctx.base_cert))?;
        writeln!(out, "    ssl_certificate_key {};", self.ssl_path(&ctx.base_key))?;
        if svc.mtls {
            writeln!(out, "    ssl_client_certificate {};", self.ssl_path(&self.options.client_ca))?;
            writeln!(out, "    ssl_verify_client on;")?;
        }
        writeln!(out)?;
        writeln!(out, "    location / {{")?;
        writeln!(out, "        proxy_pass http://{}:{};", svc.service_name, svc.service_port)?;
        writeln!(out, "        proxy_set_header Host $host;")?;
        writeln!(out, "        proxy_set_header X-Real-IP $remote_addr;")?;
        writeln!(out, "        proxy_set_header X-Forwarded-For $proxy_add_x_forwarded_for;")?;
        writeln!(out, "        proxy_set_header X-Forwarded-Proto $scheme;")?;
        if svc.mtls {
            writeln!(out, "        proxy_set_header X-SSL-Client-Verify $ssl_client_verify;")?;
            writeln!(out, "        proxy_set_header X-SSL-Client-DN $ssl_client_s_dn;")?;
        }
        writeln!(out, "    }}")?;
        writeln!(out, "}}")
    }
}

/// Reject characters nginx would treat as syntax.
fn ensure_safe(field: &'static str, value: &str) -> Result<(), RenderError> {
    let unsafe_char = |c: char| c.is_whitespace() || matches!(c, ';' | '{' | '}' | '#' | '"' | '\'' | '$');
    if value.is_empty() || value.chars().any(unsafe_char) {
        return Err(RenderError::UnsafeValue {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

impl Renderer for NginxRenderer {
    fn render(&self, ctx: &FragmentContext) -> Result<String, RenderError> {
        ensure_safe("app name", &ctx.app_name)?;
        ensure_safe("domain", &ctx.base_domain)?;
        ensure_safe("certificate", &ctx.base_cert)?;
        ensure_safe("key", &ctx.base_key)?;
        for svc in &ctx.services {
            ensure_safe("service name", &svc.service_name)?;
            ensure_safe("subdomain", &svc.fqdn)?;
        }

        let mut out = String::new();
        writeln!(out, "# Fragment for app '{}'", ctx.app_name)?;
        writeln!(out, "# Domain: {}", ctx.base_domain)?;
        if let Some(ts) = &ctx.timestamp {
            writeln!(out, "# Generated: {}", ts)?;
        }
        writeln!(out)?;

        if self.options.redirect_http && !ctx.services.is_empty() {
            self.write_redirect(&mut out, ctx)?;
        }

        for (i, svc) in ctx.services.iter().enumerate() {
            if i > 0 {
                writeln!(out)?;
            }
            self.write_service(&mut out, ctx, svc)?;
        }

        Ok(out)
    }
}
