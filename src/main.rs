//! `isle-fragment`: generate one application's ingress fragment and register
//! its domain and subdomains.
//!
//! # Flow
//!
//! ```text
//!   --compose ──▶ provider ──▶ reserved-name filter ──▶ conflict check ──┬─▶ abort (exit 1)
//!                                                                       │
//!                                                                       └─▶ render ──▶ --output
//!                                                                                       │
//!                                                          --registry ◀── merge claims ◀┘
//! ```
//!
//! Exit code 0 on success, 1 on any fatal condition.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};

use isle_ingress::config::load_or_default;
use isle_ingress::observability::init_logging;
use isle_ingress::{IsleError, Pipeline, Prepared, RunOutcome, RunRequest};

#[derive(Parser)]
#[command(name = "isle-fragment")]
#[command(about = "Generate an ingress config fragment for one application", long_about = None)]
struct Cli {
    /// Application name (registry owner key)
    #[arg(long)]
    app_name: String,

    /// Deployment manifest (docker-compose file)
    #[arg(long, visible_alias = "manifest")]
    compose: PathBuf,

    /// Base domain (e.g. myapp.local)
    #[arg(long)]
    domain: String,

    /// Certificate file name (default: <domain>.crt)
    #[arg(long)]
    base_cert: Option<String>,

    /// Key file name (default: <domain>.key)
    #[arg(long)]
    base_key: Option<String>,

    /// Output path for the generated fragment
    #[arg(long)]
    output: PathBuf,

    /// Domain registry file (default from config, /etc/isle-mesh/agent/registry.json)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Check for domain/subdomain conflicts
    #[arg(long, default_value_t = true, num_args = 0..=1, default_missing_value = "true", action = ArgAction::Set)]
    check_conflicts: bool,

    /// Proceed and take ownership even if conflicts exist
    #[arg(long)]
    force: bool,

    /// Service that requires mTLS (repeatable)
    #[arg(long = "service-mtls")]
    service_mtls: Vec<String>,

    /// External descriptor provider command (default: built-in compose reader)
    #[arg(long)]
    provider: Option<String>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config.observability.log_level);

    if let Some(registry) = &cli.registry {
        config.registry.path = registry.to_string_lossy().into_owned();
    }
    if let Some(provider) = &cli.provider {
        config.provider.command = Some(provider.clone());
    }

    let request = RunRequest {
        app_name: cli.app_name,
        manifest: cli.compose,
        domain: cli.domain,
        base_cert: cli.base_cert,
        base_key: cli.base_key,
        output: cli.output,
        check_conflicts: cli.check_conflicts,
        force: cli.force,
        service_mtls: cli.service_mtls,
    };

    println!("Parsing manifest: {}", request.manifest.display());
    let pipeline = Pipeline::from_config(&config);
    let result = pipeline.prepare(&request).and_then(|prepared| {
        report_services(&request, &prepared);
        pipeline.execute(&request, prepared)
    });
    match result {
        Ok(outcome) => {
            report(&request, &outcome);
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_error(&e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Listed before conflict checking so an aborted run still shows what it found.
fn report_services(request: &RunRequest, prepared: &Prepared) {
    println!(
        "Found {} services for {}:",
        prepared.descriptors.len(),
        request.app_name
    );
    for svc in &prepared.descriptors {
        let mtls_flag = if svc.mtls { " (mTLS)" } else { "" };
        println!(
            "  - {}: {}:{}{}",
            svc.name,
            svc.fqdn(&prepared.domain),
            svc.port,
            mtls_flag
        );
    }

    for name in &prepared.unmatched_mtls {
        eprintln!("Warning: --service-mtls '{}' matches no service", name);
    }
}

fn report(request: &RunRequest, outcome: &RunOutcome) {
    if let Some(warning) = outcome.load_warning.as_ref().filter(|w| !w.is_missing()) {
        eprintln!("Warning: {}; registry was rebuilt from empty", warning);
    }

    if !outcome.overridden.is_empty() {
        eprintln!("\nCONFLICT ERRORS:");
        for conflict in &outcome.overridden {
            eprintln!("  ✗ {}", conflict);
        }
        eprintln!("\nWarning: Proceeding with --force flag");
    }

    println!("\n✓ Fragment written to: {}", outcome.fragment_path.display());
    println!("✓ Registry updated: {}", outcome.registry_path.display());
    println!(
        "\n✓ Config fragment for '{}' generated successfully",
        request.app_name
    );
    println!("  Domain: {}", outcome.domain);
    println!("  Services: {}", outcome.descriptors.len());
    println!("\nTo activate, reload the isle-agent:");
    println!("  sudo isle agent reload");
}

fn report_error(err: &IsleError) {
    match err {
        IsleError::ConflictDetected(conflicts) => {
            eprintln!("\nCONFLICT ERRORS:");
            for conflict in conflicts {
                eprintln!("  ✗ {}", conflict);
            }
            eprintln!("\nUse --force to override conflict checking");
        }
        IsleError::InvalidDescriptors(errors) => {
            eprintln!("Error: invalid service descriptors:");
            for e in errors {
                eprintln!("  ✗ {}", e);
            }
        }
        IsleError::MalformedDescriptors(isle_ingress::descriptor::ProviderError::Malformed {
            reason,
            output,
        }) => {
            eprintln!("Error decoding descriptor data: {}", reason);
            eprintln!("Provider output was: {}", output);
        }
        other => eprintln!("Error: {}", other),
    }
}
