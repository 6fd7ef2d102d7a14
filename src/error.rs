//! Unified error types for skypeload.
//!
//! This module provides a single [`SkypeloadError`] enum that covers all error
//! cases in the library, from reading an export archive to committing the
//! final database transaction.
//!
//! # Error Handling Philosophy
//!
//! - **Library users** get typed errors they can match on
//! - **Application users** get clear, actionable error messages naming the
//!   offending path, archive member or field
//! - **Developers** get source error chains for debugging

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// A specialized [`Result`] type for skypeload operations.
///
/// This type is broadly used across the library for any operation that
/// may produce an error.
///
/// # Example
///
/// ```rust
/// use skypeload::error::Result;
///
/// fn my_function() -> Result<u64> {
///     // ... operations that may fail
///     Ok(0)
/// }
/// ```
pub type Result<T> = std::result::Result<T, SkypeloadError>;

/// The error type for all skypeload operations.
///
/// Each variant carries context about what went wrong and, where applicable,
/// the underlying source error. Validation and reader errors are never
/// swallowed by the pipeline: they propagate to the caller unchanged in kind.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SkypeloadError {
    /// The input path does not exist.
    #[error("File not found: {}", path.display())]
    NotFound {
        /// The missing path
        path: PathBuf,
    },

    /// An I/O error occurred.
    ///
    /// This typically happens when:
    /// - Permission denied
    /// - A stream cannot be rewound
    /// - Disk is full (when spooling an archive stream)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The content is not valid JSON.
    #[error("Invalid JSON{}: {source}", path.as_ref().map(|p| format!(" (file: {})", p.display())).unwrap_or_default())]
    Parse {
        /// The underlying parse error
        #[source]
        source: serde_json::Error,
        /// The file or member path, if available
        path: Option<PathBuf>,
    },

    /// Content that should be UTF-8 text was not.
    #[error("UTF-8 encoding error in {context}: {source}")]
    Utf8 {
        /// Description of where the error occurred
        context: String,
        /// The underlying UTF-8 error
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// The archive contains no JSON members at all.
    #[error("No JSON files found in archive {archive}")]
    EmptyArchive {
        /// The archive path (or a stream description)
        archive: String,
    },

    /// The archive is malformed or a member could not be read.
    #[error("Archive error in {archive}{}: {reason}", member.as_ref().map(|m| format!(" (member: {m})")).unwrap_or_default())]
    Extraction {
        /// The archive path (or a stream description)
        archive: String,
        /// The member involved, when the failure is member-specific
        member: Option<String>,
        /// Description of the failure
        reason: String,
    },

    /// The export document does not have the expected structure.
    ///
    /// Names the first missing or mistyped field, e.g.
    /// `conversations[2].MessageList`.
    #[error("Invalid export structure: field '{field}' {reason}")]
    Schema {
        /// The offending field
        field: String,
        /// What is wrong with it
        reason: String,
    },

    /// An archive member name would escape the extraction root.
    #[error("Unsafe archive member path '{path}': {reason}")]
    PathSafety {
        /// The rejected member name
        path: String,
        /// Which safety rule it violated
        reason: &'static str,
    },

    /// A general input validation failure (file type, stream capability,
    /// display name, ...).
    #[error("Validation failed for {subject}: {reason}")]
    Validation {
        /// What was being validated
        subject: String,
        /// Why it was rejected
        reason: String,
    },

    /// Required configuration is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A database statement or connection failed.
    ///
    /// The enclosing load transaction is rolled back before this is returned.
    #[error("Database error while {context}: {source}")]
    Storage {
        /// The operation that failed
        context: &'static str,
        /// The underlying driver error
        #[source]
        source: sqlx::Error,
    },
}

// ============================================================================
// Convenience constructors
// ============================================================================

impl SkypeloadError {
    /// Creates a not-found error for a path.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        SkypeloadError::NotFound { path: path.into() }
    }

    /// Creates a parse error, optionally naming the offending file.
    pub fn parse(source: serde_json::Error, path: Option<PathBuf>) -> Self {
        SkypeloadError::Parse { source, path }
    }

    /// Creates a UTF-8 error with context.
    pub fn utf8(context: impl Into<String>, source: std::string::FromUtf8Error) -> Self {
        SkypeloadError::Utf8 {
            context: context.into(),
            source,
        }
    }

    /// Creates an empty-archive error.
    pub fn empty_archive(archive: impl Into<String>) -> Self {
        SkypeloadError::EmptyArchive {
            archive: archive.into(),
        }
    }

    /// Creates an extraction error for an archive path.
    pub fn extraction(
        archive: impl AsRef<Path>,
        member: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        SkypeloadError::Extraction {
            archive: archive.as_ref().display().to_string(),
            member,
            reason: reason.into(),
        }
    }

    /// Creates a schema error naming the first offending field.
    pub fn schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        SkypeloadError::Schema {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates a path-safety error for an archive member name.
    pub fn path_safety(path: impl Into<String>, reason: &'static str) -> Self {
        SkypeloadError::PathSafety {
            path: path.into(),
            reason,
        }
    }

    /// Creates a general validation error.
    pub fn validation(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        SkypeloadError::Validation {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        SkypeloadError::Config(message.into())
    }

    /// Creates a storage error wrapping the underlying driver error.
    pub fn storage(context: &'static str, source: sqlx::Error) -> Self {
        SkypeloadError::Storage { context, source }
    }

    /// Returns `true` if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SkypeloadError::NotFound { .. })
    }

    /// Returns `true` if this is an IO error.
    pub fn is_io(&self) -> bool {
        matches!(self, SkypeloadError::Io(_))
    }

    /// Returns `true` if this is a JSON parse error.
    pub fn is_parse(&self) -> bool {
        matches!(self, SkypeloadError::Parse { .. })
    }

    /// Returns `true` if this is an empty-archive error.
    pub fn is_empty_archive(&self) -> bool {
        matches!(self, SkypeloadError::EmptyArchive { .. })
    }

    /// Returns `true` if this is an extraction error.
    pub fn is_extraction(&self) -> bool {
        matches!(self, SkypeloadError::Extraction { .. })
    }

    /// Returns `true` if this is a schema error.
    pub fn is_schema(&self) -> bool {
        matches!(self, SkypeloadError::Schema { .. })
    }

    /// Returns `true` if this is a path-safety error.
    pub fn is_path_safety(&self) -> bool {
        matches!(self, SkypeloadError::PathSafety { .. })
    }

    /// Returns `true` if this is a validation error.
    pub fn is_validation(&self) -> bool {
        matches!(self, SkypeloadError::Validation { .. })
    }

    /// Returns `true` if this is a configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, SkypeloadError::Config(_))
    }

    /// Returns `true` if this is a storage error.
    pub fn is_storage(&self) -> bool {
        matches!(self, SkypeloadError::Storage { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
