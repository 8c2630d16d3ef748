//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → IsleConfig (validated, immutable)
//!     → CLI flags override individual values
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; one process run sees one config
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_or_default, ConfigError};
pub use schema::IsleConfig;
pub use schema::RegistryConfig;
pub use schema::ProviderConfig;
pub use schema::RenderConfig;
