//! Domain/subdomain ownership registry.
//!
//! # Data Flow
//! ```text
//! registry.json
//!     → store.rs (lock, tolerant load)
//!     → model.rs (Registry snapshot)
//!     → conflict.rs (advisory evaluation of a candidate app)
//!     → update.rs (last-writer-wins merge)
//!     → store.rs (atomic save, unlock)
//! ```
//!
//! # Design Decisions
//! - Loaded fresh on every run; no long-lived in-memory instance
//! - Checking and merging are separate operations composed by the pipeline
//! - No deletion path: applications are never unregistered

pub mod conflict;
pub mod model;
pub mod store;
pub mod update;

pub use conflict::{check_conflicts, Conflict};
pub use model::{AppSummary, AuditFinding, Claims, Registry};
pub use store::{LoadWarning, Loaded, RegistryLock, RegistryStore, StoreError};
pub use update::merge_claims;
