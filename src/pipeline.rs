//! The end-to-end Load pipeline.
//!
//! One [`Loader`] call is one Load invocation: read the export from its
//! source, validate the document, derive the cleaned rows, and store
//! everything in a single transaction. Control flows top-down; errors from
//! any stage propagate to the caller unchanged in kind.

use std::io::{Read, Seek};
use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::model::{CleanedMessage, LoadOutcome, RawExport};
use crate::reader::{self, SelectionStrategy};
use crate::storage::SkypeStorage;
use crate::{transform, validate};

/// Storage seam for the pipeline.
///
/// Production uses [`SkypeStorage`]; tests substitute an in-memory store.
#[allow(async_fn_in_trait)]
pub trait ExportStore {
    /// Stores one export atomically: the raw payload plus all cleaned rows.
    async fn load(&self, export: &RawExport, messages: &[CleanedMessage]) -> Result<LoadOutcome>;
}

impl ExportStore for SkypeStorage {
    async fn load(&self, export: &RawExport, messages: &[CleanedMessage]) -> Result<LoadOutcome> {
        SkypeStorage::load(self, export, messages).await
    }
}

/// Runs Extract → Validate → Transform → Store for single exports.
///
/// Owns one immutable [`Config`] and one store. Independent loaders may run
/// concurrently; nothing is shared between invocations except the store's
/// connection pool.
pub struct Loader<S = SkypeStorage> {
    config: Config,
    store: S,
    user_display_name: Option<String>,
}

impl Loader<SkypeStorage> {
    /// Validates the configuration and connects the Postgres-backed store.
    pub async fn connect(config: Config) -> Result<Self> {
        validate::validate_config(&config)?;
        let store = SkypeStorage::connect(&config.database).await?;
        Ok(Self {
            config,
            store,
            user_display_name: None,
        })
    }
}

impl<S: ExportStore> Loader<S> {
    /// Builds a loader over an arbitrary store.
    pub fn with_store(config: Config, store: S) -> Self {
        Self {
            config,
            store,
            user_display_name: None,
        }
    }

    /// Sets the display name recorded for the exporting user's own messages.
    ///
    /// Callers should pass the name through
    /// [`validate::validate_user_display_name`] first.
    pub fn with_user_display_name(mut self, name: impl Into<String>) -> Self {
        self.user_display_name = Some(name.into());
        self
    }

    /// The loader's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads a standalone JSON export file.
    pub async fn load_file(&self, path: &Path) -> Result<LoadOutcome> {
        let document = validate::validate_json_file(path)?;
        self.load_document(document).await
    }

    /// Loads the selected JSON member of a tar archive.
    pub async fn load_archive(
        &self,
        path: &Path,
        strategy: SelectionStrategy,
    ) -> Result<LoadOutcome> {
        let document = reader::read_json_from_archive(path, strategy)?;
        self.load_document(document).await
    }

    /// Loads a standalone JSON export from an open stream.
    pub async fn load_stream<R: Read + Seek>(&self, stream: &mut R) -> Result<LoadOutcome> {
        validate::validate_stream(stream)?;
        let document = reader::read_json_from_stream(stream)?;
        self.load_document(document).await
    }

    /// Loads a tar archive from an open stream.
    pub async fn load_archive_stream<R: Read + Seek>(
        &self,
        stream: &mut R,
        strategy: SelectionStrategy,
    ) -> Result<LoadOutcome> {
        validate::validate_stream(stream)?;
        let document = reader::read_json_from_archive_stream(stream, strategy)?;
        self.load_document(document).await
    }

    /// Validates, transforms and stores an already-parsed export document.
    pub async fn load_document(&self, document: Value) -> Result<LoadOutcome> {
        validate::validate_skype_data(&document)?;
        let (export, messages) = transform::clean_export(
            &self.config,
            document,
            self.user_display_name.as_deref(),
        )?;
        info!(
            user_id = %export.user_id,
            messages = messages.len(),
            "storing export"
        );
        self.store.load(&export, &messages).await
    }
}
