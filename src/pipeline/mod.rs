//! Fragment pipeline orchestration.
//!
//! # Responsibilities
//! - Sequence extraction, filtering, conflict checking, composition, the
//!   fragment write and the registry update
//! - Decide whether conflicts abort the run
//! - Hold the registry lock from load through save
//!
//! # Design Decisions
//! - Fail fast: every fatal condition ends the run immediately
//! - The conflict check and the merge see the same locked snapshot, so a
//!   concurrent run cannot slip a claim in between them
//! - No rollback: a written fragment stays written if the registry save fails
//! - One timestamp per run, shared by the fragment and the registry entry
//! - Domain and subdomains are lowercased once, in `prepare`
//! - Conditions reported to the operator are logged at debug only

pub mod stage;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::atomic::write_atomic;
use crate::config::IsleConfig;
use crate::descriptor::{
    apply_mtls_overrides, filter_reserved, normalize_subdomains, validate, CommandProvider,
    ComposeFileProvider, DescriptorProvider, ServiceDescriptor,
};
use crate::error::IsleError;
use crate::fragment::{compose_fragment, default_cert_names, NginxRenderer, Renderer};
use crate::registry::update::format_timestamp;
use crate::registry::{check_conflicts, merge_claims, Conflict, LoadWarning, RegistryStore};

pub use stage::Stage;

/// Inputs for one application's run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Application identity and registry owner key.
    pub app_name: String,
    /// Deployment manifest handed to the provider.
    pub manifest: PathBuf,
    /// Base routable domain.
    pub domain: String,
    /// Certificate file name; defaults to `<domain>.crt`.
    pub base_cert: Option<String>,
    /// Key file name; defaults to `<domain>.key`.
    pub base_key: Option<String>,
    /// Destination of the rendered fragment.
    pub output: PathBuf,
    /// Evaluate claims against the registry before writing.
    pub check_conflicts: bool,
    /// Proceed (and take ownership) despite conflicts.
    pub force: bool,
    /// Services forced to require mutual TLS.
    pub service_mtls: Vec<String>,
}

impl RunRequest {
    pub fn new(
        app_name: impl Into<String>,
        manifest: impl Into<PathBuf>,
        domain: impl Into<String>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            manifest: manifest.into(),
            domain: domain.into(),
            base_cert: None,
            base_key: None,
            output: output.into(),
            check_conflicts: true,
            force: false,
            service_mtls: Vec::new(),
        }
    }

    /// Certificate and key names after applying domain-derived defaults.
    pub fn cert_names(&self) -> (String, String) {
        let (cert, key) = default_cert_names(&self.domain);
        (
            self.base_cert.clone().unwrap_or(cert),
            self.base_key.clone().unwrap_or(key),
        )
    }
}

/// Shaped descriptors, ready for conflict checking.
#[derive(Debug, Clone)]
pub struct Prepared {
    /// Lowercased base domain.
    pub domain: String,
    pub descriptors: Vec<ServiceDescriptor>,
    /// `--service-mtls` names that matched no service.
    pub unmatched_mtls: Vec<String>,
}

/// What a successful run did.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: Uuid,
    /// Lowercased base domain the claims were registered under.
    pub domain: String,
    /// Descriptors used for the fragment and the registry claims.
    pub descriptors: Vec<ServiceDescriptor>,
    /// Conflicts that were overridden with force.
    pub overridden: Vec<Conflict>,
    /// Set when the registry had to be started from empty.
    pub load_warning: Option<LoadWarning>,
    /// `--service-mtls` names that matched no service.
    pub unmatched_mtls: Vec<String>,
    pub fragment_path: PathBuf,
    pub registry_path: PathBuf,
}

/// Composes a provider, a renderer and a registry store into one run.
pub struct Pipeline {
    provider: Box<dyn DescriptorProvider>,
    renderer: Box<dyn Renderer>,
    store: RegistryStore,
    reserved_names: Vec<String>,
    clock: fn() -> DateTime<Utc>,
}

impl Pipeline {
    pub fn new(
        provider: Box<dyn DescriptorProvider>,
        renderer: Box<dyn Renderer>,
        store: RegistryStore,
    ) -> Self {
        Self {
            provider,
            renderer,
            store,
            reserved_names: IsleConfig::default().filter.reserved_names,
            clock: Utc::now,
        }
    }

    /// Build the pipeline a configuration describes.
    pub fn from_config(config: &IsleConfig) -> Self {
        let provider: Box<dyn DescriptorProvider> = match &config.provider.command {
            Some(command) => {
                Box::new(CommandProvider::new(command).with_args(config.provider.args.clone()))
            }
            None => Box::new(ComposeFileProvider::new()),
        };
        let store =
            RegistryStore::with_lock_suffix(&config.registry.path, &config.registry.lock_suffix);

        Self::new(provider, Box::new(NginxRenderer::new(config.render.clone())), store)
            .with_reserved_names(config.filter.reserved_names.clone())
    }

    pub fn with_reserved_names(mut self, names: Vec<String>) -> Self {
        self.reserved_names = names;
        self
    }

    /// Replace the wall clock, for reproducible output.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Extract and shape descriptors without touching the registry.
    pub fn prepare(&self, req: &RunRequest) -> Result<Prepared, IsleError> {
        ensure_exists("manifest", &req.manifest)?;

        enter(Stage::Extract);
        let extracted = self.provider.extract(&req.manifest)?;
        tracing::debug!(count = extracted.len(), "Descriptors extracted");

        enter(Stage::Filter);
        let mut descriptors = filter_reserved(extracted, &self.reserved_names);
        if descriptors.is_empty() {
            return Err(IsleError::EmptyServiceSet(req.manifest.clone()));
        }
        let unmatched_mtls = apply_mtls_overrides(&mut descriptors, &req.service_mtls);
        for name in &unmatched_mtls {
            tracing::debug!(service = %name, "mTLS override names no service");
        }
        normalize_subdomains(&mut descriptors);
        validate(&descriptors).map_err(IsleError::InvalidDescriptors)?;

        Ok(Prepared {
            domain: req.domain.to_ascii_lowercase(),
            descriptors,
            unmatched_mtls,
        })
    }

    /// Run every stage for one application.
    pub fn run(&self, req: &RunRequest) -> Result<RunOutcome, IsleError> {
        let prepared = self.prepare(req)?;
        self.execute(req, prepared)
    }

    /// Run the stages after [`Pipeline::prepare`]: conflict check, compose,
    /// write and registry update.
    pub fn execute(&self, req: &RunRequest, prepared: Prepared) -> Result<RunOutcome, IsleError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id, app = %req.app_name);
        let _enter = span.enter();

        let Prepared {
            domain,
            descriptors,
            unmatched_mtls,
        } = prepared;
        for svc in &descriptors {
            tracing::info!(
                service = %svc.name,
                fqdn = %svc.fqdn(&domain),
                port = svc.port,
                mtls = svc.mtls,
                "Routable service"
            );
        }

        enter(Stage::CheckConflicts);
        let lock = self.store.lock()?;
        let loaded = lock.load();
        let mut registry = loaded.registry;

        let mut overridden = Vec::new();
        if req.check_conflicts {
            let conflicts = check_conflicts(&registry, &req.app_name, &domain, &descriptors);
            for conflict in &conflicts {
                tracing::debug!(owner = conflict.owner(), "{}", conflict);
            }
            if !conflicts.is_empty() {
                if !req.force {
                    return Err(IsleError::ConflictDetected(conflicts));
                }
                tracing::debug!(count = conflicts.len(), "Proceeding despite conflicts (force)");
                overridden = conflicts;
            }
        } else {
            tracing::debug!("Conflict checking disabled");
        }

        let now = (self.clock)();

        enter(Stage::Compose);
        let (cert, key) = req.cert_names();
        let fragment = compose_fragment(
            self.renderer.as_ref(),
            &req.app_name,
            &descriptors,
            &domain,
            &cert,
            &key,
            Some(format_timestamp(now)),
        )?;

        enter(Stage::Write);
        write_atomic(&req.output, fragment.as_bytes()).map_err(|source| {
            IsleError::WriteFailure {
                path: req.output.clone(),
                source,
            }
        })?;
        tracing::info!(path = %req.output.display(), "Fragment written");

        enter(Stage::UpdateRegistry);
        merge_claims(&mut registry, &req.app_name, &domain, &descriptors, now);
        lock.save(&registry)?;
        drop(lock);
        tracing::info!(path = %self.store.path().display(), "Registry updated");

        enter(Stage::Done);
        Ok(RunOutcome {
            run_id,
            domain,
            descriptors,
            overridden,
            load_warning: loaded.warning,
            unmatched_mtls,
            fragment_path: req.output.clone(),
            registry_path: self.store.path().to_path_buf(),
        })
    }
}

fn enter(stage: Stage) {
    tracing::debug!(%stage, "Entering stage");
}

fn ensure_exists(what: &'static str, path: &Path) -> Result<(), IsleError> {
    if path.exists() {
        Ok(())
    } else {
        Err(IsleError::PathMissing {
            what,
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::StaticProvider;
    use std::fs;

    fn fixed_clock() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default()
    }

    fn pipeline(dir: &Path, services: Vec<ServiceDescriptor>) -> Pipeline {
        Pipeline::new(
            Box::new(StaticProvider::new(services)),
            Box::new(NginxRenderer::default()),
            RegistryStore::new(dir.join("registry.json")),
        )
        .with_clock(fixed_clock)
    }

    fn request(dir: &Path, app: &str, domain: &str) -> RunRequest {
        let manifest = dir.join("compose.yml");
        fs::write(&manifest, "services: {}\n").unwrap();
        RunRequest::new(app, manifest, domain, dir.join(format!("{app}.conf")))
    }

    #[test]
    fn test_cert_defaults() {
        let mut req = RunRequest::new("a", "m", "d.local", "o");
        assert_eq!(req.cert_names(), ("d.local.crt".to_string(), "d.local.key".to_string()));
        req.base_cert = Some("wild.crt".into());
        assert_eq!(req.cert_names().0, "wild.crt");
    }

    #[test]
    fn test_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), vec![ServiceDescriptor::new("web", 80, "www")]);
        let req = RunRequest::new("a", dir.path().join("nope.yml"), "d", dir.path().join("a.conf"));
        assert!(matches!(p.run(&req), Err(IsleError::PathMissing { what: "manifest", .. })));
    }

    #[test]
    fn test_only_reserved_services_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), vec![ServiceDescriptor::new("mesh-proxy", 443, "proxy")]);
        let req = request(dir.path(), "a", "d");
        assert!(matches!(p.run(&req), Err(IsleError::EmptyServiceSet(_))));
        assert!(!req.output.exists());
    }

    #[test]
    fn test_invalid_descriptors_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(
            dir.path(),
            vec![ServiceDescriptor::new("web", 80, "www"), ServiceDescriptor::new("api", 81, "www")],
        );
        let req = request(dir.path(), "a", "d");
        assert!(matches!(p.run(&req), Err(IsleError::InvalidDescriptors(_))));
    }

    #[test]
    fn test_run_writes_fragment_and_registry() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(
            dir.path(),
            vec![
                ServiceDescriptor::new("isle-agent", 9000, "agent"),
                ServiceDescriptor::new("web", 80, "www"),
                ServiceDescriptor::new("api", 3000, "api"),
            ],
        );
        let mut req = request(dir.path(), "shop", "shop.local");
        req.service_mtls = vec!["api".into()];

        let outcome = p.run(&req).unwrap();
        assert_eq!(outcome.descriptors.len(), 2);
        assert!(outcome.descriptors[1].mtls);
        assert!(outcome.load_warning.unwrap().is_missing());

        let fragment = fs::read_to_string(&req.output).unwrap();
        assert!(fragment.contains("server_name www.shop.local;"));
        assert!(fragment.contains("ssl_verify_client on;"));
        assert!(!fragment.contains("agent.shop.local"));

        let registry = p.store().load().registry;
        assert_eq!(registry.owner_of_domain("shop.local"), Some("shop"));
        assert_eq!(registry.owner_of_subdomain("api.shop.local"), Some("shop"));
        assert_eq!(registry.apps["shop"].updated_at, "2023-11-14T22:13:20.000000Z");
    }

    #[test]
    fn test_conflict_aborts_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let services = vec![ServiceDescriptor::new("web", 80, "www")];
        pipeline(dir.path(), services.clone()).run(&request(dir.path(), "a", "d")).unwrap();

        let p = pipeline(dir.path(), services);
        let req = request(dir.path(), "b", "d");
        match p.run(&req) {
            Err(IsleError::ConflictDetected(conflicts)) => assert_eq!(conflicts.len(), 2),
            other => panic!("expected conflicts, got {other:?}"),
        }
        assert!(!req.output.exists());
        assert_eq!(p.store().load().registry.owner_of_domain("d"), Some("a"));
    }

    #[test]
    fn test_names_are_lowercased() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), vec![ServiceDescriptor::new("web", 80, "WWW")]);
        let req = request(dir.path(), "shop", "Shop.LOCAL");

        let prepared = p.prepare(&req).unwrap();
        assert_eq!(prepared.domain, "shop.local");
        assert_eq!(prepared.descriptors[0].subdomain, "www");

        let outcome = p.execute(&req, prepared).unwrap();
        assert_eq!(outcome.domain, "shop.local");
        let fragment = fs::read_to_string(&req.output).unwrap();
        assert!(fragment.contains("server_name www.shop.local;"));
        assert_eq!(p.store().load().registry.owner_of_subdomain("www.shop.local"), Some("shop"));
    }

    #[cfg(unix)]
    #[test]
    fn test_fragment_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(dir.path(), vec![ServiceDescriptor::new("web", 80, "www")]);
        let req = request(dir.path(), "a", "d");
        p.run(&req).unwrap();

        let mode = fs::metadata(&req.output).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn test_disabled_check_still_registers() {
        let dir = tempfile::tempdir().unwrap();
        let services = vec![ServiceDescriptor::new("web", 80, "www")];
        pipeline(dir.path(), services.clone()).run(&request(dir.path(), "a", "d")).unwrap();

        let p = pipeline(dir.path(), services);
        let mut req = request(dir.path(), "b", "d");
        req.check_conflicts = false;
        let outcome = p.run(&req).unwrap();
        assert!(outcome.overridden.is_empty());
        assert_eq!(p.store().load().registry.owner_of_domain("d"), Some("b"));
    }
}
