//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use isle_ingress::descriptor::StaticProvider;
use isle_ingress::fragment::NginxRenderer;
use isle_ingress::{Pipeline, RegistryStore, RunRequest, ServiceDescriptor};

/// A compose file exercising labels, inference and reserved names.
pub const SHOP_COMPOSE: &str = r#"
services:
  mesh-proxy:
    image: isle/mesh-proxy
    ports:
      - "443:443"
  web:
    image: shop/web
    expose:
      - 8080
    labels:
      isle.subdomain: www
  api:
    image: shop/api
    ports:
      - "3000:3000"
    labels:
      - "isle.mtls=true"
  worker:
    image: shop/worker
"#;

pub fn fixed_clock() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
}

pub fn later_clock() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_003_600, 0).unwrap_or_default()
}

pub fn services(subdomains: &[&str]) -> Vec<ServiceDescriptor> {
    subdomains
        .iter()
        .enumerate()
        .map(|(i, sub)| ServiceDescriptor::new(format!("svc-{sub}"), 8000 + i as u16, *sub))
        .collect()
}

/// Pipeline over a fixed descriptor list and a registry under `dir`.
pub fn static_pipeline(dir: &Path, descriptors: Vec<ServiceDescriptor>) -> Pipeline {
    Pipeline::new(
        Box::new(StaticProvider::new(descriptors)),
        Box::new(NginxRenderer::default()),
        RegistryStore::new(registry_path(dir)),
    )
    .with_clock(fixed_clock)
}

pub fn registry_path(dir: &Path) -> PathBuf {
    dir.join("agent").join("registry.json")
}

/// Request for `app` on `domain`, with a placeholder manifest on disk.
pub fn request(dir: &Path, app: &str, domain: &str) -> RunRequest {
    let manifest = write_manifest(dir, app, "services: {}\n");
    RunRequest::new(app, manifest, domain, dir.join("configs").join(format!("{app}.conf")))
}

pub fn write_manifest(dir: &Path, app: &str, content: &str) -> PathBuf {
    let path = dir.join(format!("{app}-compose.yml"));
    fs::write(&path, content).unwrap();
    path
}
