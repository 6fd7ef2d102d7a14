//! # Skypeload
//!
//! A Rust library (and CLI) that loads Skype chat export archives into
//! PostgreSQL.
//!
//! ## Overview
//!
//! Skype lets users download their personal history as a JSON document,
//! usually packaged inside a tar archive. Skypeload ingests such an export
//! end to end:
//!
//! 1. **Extract** — read the JSON payload from a path, an open stream, or a
//!    tar archive (picking the right member when several exist)
//! 2. **Validate** — structural and security checks before the input is
//!    trusted (export shape, archive member path safety, display names,
//!    database configuration)
//! 3. **Transform** — derive cleaned per-message records with human-readable
//!    message type descriptions
//! 4. **Store** — write the raw payload and the cleaned rows to PostgreSQL
//!    in one transaction, all-or-nothing per export
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use skypeload::prelude::*;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // defaults <- optional files <- environment
//!     let config = load_config(None, None)?;
//!
//!     let loader = Loader::connect(config).await?;
//!     let outcome = loader
//!         .load_archive(Path::new("skype_export.tar"), SelectionStrategy::FirstMatch)
//!         .await?;
//!
//!     println!(
//!         "stored raw export #{} with {} messages",
//!         outcome.raw_export_id,
//!         outcome.message_count()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - [`pipeline`] — [`Loader`](pipeline::Loader), one call per Load invocation
//! - [`reader`] — JSON/tar extraction, [`SelectionStrategy`](reader::SelectionStrategy)
//! - [`validate`] — stateless input validation
//! - [`transform`] — [`describe_message_type`](transform::describe_message_type), cleaning
//! - [`storage`] — [`SkypeStorage`](storage::SkypeStorage) Postgres gateway
//! - [`schema`] — the fixed SQL contract
//! - [`config`] — layered typed configuration
//! - [`logging`] — tracing subscriber setup
//! - [`model`] — export data model and cleaned records
//! - [`error`] — unified error types ([`SkypeloadError`], [`Result`])

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod reader;
pub mod schema;
pub mod storage;
pub mod transform;
pub mod validate;

#[cfg(feature = "cli")]
pub mod cli;

// Re-export the main types at the crate root for convenience
pub use error::{Result, SkypeloadError};
pub use model::{CleanedMessage, LoadOutcome, RawExport};

/// Convenient re-exports for common usage.
///
/// Import everything you need with a single line:
///
/// ```rust
/// use skypeload::prelude::*;
/// ```
pub mod prelude {
    // Error types
    pub use crate::error::{Result, SkypeloadError};

    // Configuration
    pub use crate::config::{Config, DatabaseConfig, load_config};

    // Data model
    pub use crate::model::{CleanedMessage, LoadOutcome, RawExport};

    // Pipeline
    pub use crate::pipeline::{ExportStore, Loader};

    // Extraction
    pub use crate::reader::SelectionStrategy;

    // Storage
    pub use crate::storage::SkypeStorage;

    // Transformation
    pub use crate::transform::describe_message_type;
}
