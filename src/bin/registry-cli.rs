use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use isle_ingress::config::schema::DEFAULT_REGISTRY_PATH;
use isle_ingress::descriptor::ServiceDescriptor;
use isle_ingress::observability::init_logging;
use isle_ingress::registry::{check_conflicts, RegistryStore};

#[derive(Parser)]
#[command(name = "registry-cli")]
#[command(about = "Inspect the shared ingress domain registry", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = DEFAULT_REGISTRY_PATH)]
    registry: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the whole registry document
    Show,
    /// Print the application owning a domain or subdomain
    Owner {
        /// Domain or fully-qualified subdomain
        name: String,
    },
    /// Dry-run conflict check for a prospective registration
    Check {
        #[arg(long)]
        app_name: String,
        #[arg(long)]
        domain: String,
        /// Subdomain label to claim (repeatable)
        #[arg(long = "subdomain")]
        subdomains: Vec<String>,
    },
    /// Report summaries that disagree with the ownership maps
    Audit,
}

fn main() -> ExitCode {
    init_logging("warn");
    let cli = Cli::parse();
    let store = RegistryStore::new(&cli.registry);
    let loaded = store.load();
    if let Some(warning) = loaded.warning.as_ref().filter(|w| !w.is_missing()) {
        eprintln!("Warning: {}", warning);
    }
    let registry = loaded.registry;

    match cli.command {
        Commands::Show => match serde_json::to_string_pretty(&registry) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Owner { name } => match registry.owner_of(&name) {
            Some(owner) => {
                println!("{}", owner);
                ExitCode::SUCCESS
            }
            None => {
                eprintln!("'{}' is not claimed", name);
                ExitCode::FAILURE
            }
        },
        Commands::Check {
            app_name,
            domain,
            subdomains,
        } => {
            let descriptors: Vec<ServiceDescriptor> = subdomains
                .iter()
                .map(|sub| ServiceDescriptor::new(sub.clone(), 1, sub.clone()))
                .collect();
            let conflicts = check_conflicts(&registry, &app_name, &domain, &descriptors);
            if conflicts.is_empty() {
                println!("No conflicts for '{}' on {}", app_name, domain);
                ExitCode::SUCCESS
            } else {
                for conflict in &conflicts {
                    println!("  ✗ {}", conflict);
                }
                ExitCode::FAILURE
            }
        }
        Commands::Audit => {
            let findings = registry.audit();
            if findings.is_empty() {
                println!("Registry is consistent");
                ExitCode::SUCCESS
            } else {
                for finding in &findings {
                    println!("  ! {}", finding);
                }
                ExitCode::FAILURE
            }
        }
    }
}
