//! Native docker-compose reader.
//!
//! # Responsibilities
//! - Read a compose file without shelling out
//! - Derive name, port, subdomain and mTLS per service
//!
//! # Design Decisions
//! - Service declaration order is preserved (IndexMap)
//! - Labels override inferred values: `isle.port`, `isle.subdomain`, `isle.mtls`
//! - Port falls back to the first `expose` entry, then the container side of
//!   the first `ports` entry
//! - Services with no port are not routable and are skipped

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use super::provider::{DescriptorProvider, ProviderError};
use super::ServiceDescriptor;

pub const LABEL_PORT: &str = "isle.port";
pub const LABEL_SUBDOMAIN: &str = "isle.subdomain";
pub const LABEL_MTLS: &str = "isle.mtls";

#[derive(Debug, Deserialize)]
struct ComposeFile {
    #[serde(default)]
    services: IndexMap<String, Option<ComposeService>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ComposeService {
    expose: Vec<PortSpec>,
    ports: Vec<PortSpec>,
    labels: Labels,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortSpec {
    Number(u32),
    Text(String),
    Long { target: u32 },
}

impl PortSpec {
    /// The container-side port.
    fn container_port(&self) -> Option<u16> {
        match self {
            PortSpec::Number(n) | PortSpec::Long { target: n } => u16::try_from(*n).ok(),
            PortSpec::Text(s) => parse_container_port(s),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Labels {
    List(Vec<String>),
    Map(IndexMap<String, LabelValue>),
}

impl Default for Labels {
    fn default() -> Self {
        Labels::List(Vec::new())
    }
}

impl Labels {
    fn get(&self, key: &str) -> Option<String> {
        match self {
            Labels::List(entries) => entries.iter().find_map(|entry| {
                let (k, v) = entry.split_once('=')?;
                (k.trim() == key).then(|| v.trim().to_string())
            }),
            Labels::Map(map) => map.get(key).map(LabelValue::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LabelValue {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl std::fmt::Display for LabelValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LabelValue::Bool(b) => write!(f, "{}", b),
            LabelValue::Number(n) => write!(f, "{}", n),
            LabelValue::Text(s) => write!(f, "{}", s.trim()),
        }
    }
}

/// Parse the container side of a short-syntax port mapping.
///
/// Accepts `80`, `8080:80`, `127.0.0.1:8080:80/tcp` and ranges (`3000-3005`,
/// first port wins).
fn parse_container_port(spec: &str) -> Option<u16> {
    let without_proto = spec.split('/').next()?;
    let container = without_proto.rsplit(':').next()?;
    let first = container.split('-').next()?;
    first.trim().parse().ok()
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// Reads descriptors directly from a docker-compose file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComposeFileProvider;

impl ComposeFileProvider {
    pub fn new() -> Self {
        Self
    }

    /// Parse compose YAML text into descriptors.
    pub fn parse(&self, content: &str) -> Result<Vec<ServiceDescriptor>, ProviderError> {
        let file: ComposeFile =
            serde_saphyr::from_str(content).map_err(|e| ProviderError::Malformed {
                reason: e.to_string(),
                output: content.to_string(),
            })?;

        let mut descriptors = Vec::with_capacity(file.services.len());
        for (name, service) in file.services {
            let service = service.unwrap_or_default();

            let port = match service.labels.get(LABEL_PORT) {
                Some(raw) => Some(raw.parse::<u16>().map_err(|e| ProviderError::Malformed {
                    reason: format!("service '{}': invalid {} label '{}': {}", name, LABEL_PORT, raw, e),
                    output: content.to_string(),
                })?),
                None => service
                    .expose
                    .first()
                    .or_else(|| service.ports.first())
                    .and_then(PortSpec::container_port),
            };

            let Some(port) = port else {
                tracing::debug!(service = %name, "Skipping service without a routable port");
                continue;
            };

            let subdomain = service
                .labels
                .get(LABEL_SUBDOMAIN)
                .unwrap_or_else(|| name.clone());
            let mtls = service
                .labels
                .get(LABEL_MTLS)
                .map(|v| is_truthy(&v))
                .unwrap_or(false);

            descriptors.push(ServiceDescriptor {
                name,
                port,
                subdomain,
                mtls,
            });
        }

        Ok(descriptors)
    }
}

impl DescriptorProvider for ComposeFileProvider {
    fn extract(&self, manifest: &Path) -> Result<Vec<ServiceDescriptor>, ProviderError> {
        let content = fs::read_to_string(manifest).map_err(|source| ProviderError::Read {
            path: manifest.to_path_buf(),
            source,
        })?;
        self.parse(&content)
    }
}
