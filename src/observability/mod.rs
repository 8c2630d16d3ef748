//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, stderr)
//!
//! Pipeline runs carry a run ID span so concurrent invocations against one
//! registry can be told apart in aggregated logs.
//! ```

pub mod logging;

pub use logging::init_logging;
