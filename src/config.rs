//! Layered runtime configuration.
//!
//! Configuration is a typed struct with one field per section, built by an
//! explicit layered merge with increasing precedence:
//!
//! 1. built-in defaults ([`Config::default`])
//! 2. an optional JSON configuration file
//! 3. an optional JSON message-types file
//! 4. environment variable overrides
//!
//! Missing or unreadable *optional* files are logged and skipped; malformed
//! *required* values (e.g. a non-numeric `POSTGRES_PORT`) are errors.
//!
//! # Example
//!
//! ```rust,no_run
//! use skypeload::config::load_config;
//!
//! let config = load_config(None, None)?;
//! assert_eq!(config.database.port, 5432);
//! # Ok::<(), skypeload::SkypeloadError>(())
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SkypeloadError};

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database host (default: `localhost`)
    pub host: String,

    /// Database port (default: 5432)
    pub port: u16,

    /// Database name (default: `skype_archive`)
    pub dbname: String,

    /// Database user (default: `postgres`)
    pub user: String,

    /// Database password (default: empty)
    pub password: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "skype_archive".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
        }
    }
}

/// Settings for file output (member extraction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory extracted members are written to (default: `output`)
    pub directory: PathBuf,

    /// Overwrite existing files on extraction (default: false)
    pub overwrite: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            overwrite: false,
        }
    }
}

/// Logging settings consumed by [`crate::logging::setup_logging`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level, e.g. `INFO` (default). `RUST_LOG` takes precedence.
    pub level: String,

    /// Optional log file; console output stays on either way.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: None,
        }
    }
}

/// Complete runtime configuration.
///
/// Built once per invocation and immutable afterwards. Every key present in
/// the defaults survives a merge unless a file or the environment explicitly
/// overrides it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Database connection settings
    pub database: DatabaseConfig,

    /// Extraction output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Raw message type -> human-readable description
    pub message_types: BTreeMap<String, String>,

    /// Format used for types absent from `message_types`; the
    /// `{message_type}` placeholder is replaced with the raw type.
    pub default_message_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
            message_types: default_message_types(),
            default_message_format: "***Sent a {message_type}***".to_string(),
        }
    }
}

impl Config {
    /// Creates a configuration with built-in defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Projects the database section.
    pub fn db_config(&self) -> &DatabaseConfig {
        &self.database
    }
}

/// The built-in message type description table.
fn default_message_types() -> BTreeMap<String, String> {
    [
        ("Event/Call", "***A call started/ended***"),
        ("Poll", "***Created a poll***"),
        ("RichText/Media_Album", "***Sent an album of images***"),
        ("RichText/Media_AudioMsg", "***Sent a voice message***"),
        ("RichText/Media_CallRecording", "***Sent a call recording***"),
        ("RichText/Media_Card", "***Sent a media card***"),
        ("RichText/Media_FlikMsg", "***Sent a moji***"),
        ("RichText/Media_GenericFile", "***Sent a file***"),
        ("RichText/Media_Video", "***Sent a video message***"),
        ("RichText/UriObject", "***Sent a photo***"),
        ("RichText/ScheduledCallInvite", "***Scheduled a call***"),
        ("RichText/Location", "***Sent a location***"),
        ("RichText/Contacts", "***Sent a contact***"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}

// ============================================================================
// File overlays
// ============================================================================

// Partial mirrors of the config sections. Absent keys leave the defaults
// untouched; `message_types` from the general config file merges per key.

#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    database: Option<DatabaseOverlay>,
    output: Option<OutputOverlay>,
    logging: Option<LoggingOverlay>,
    message_types: Option<BTreeMap<String, String>>,
    default_message_format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseOverlay {
    host: Option<String>,
    port: Option<u16>,
    dbname: Option<String>,
    user: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputOverlay {
    directory: Option<PathBuf>,
    overwrite: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingOverlay {
    level: Option<String>,
    file: Option<PathBuf>,
}

/// The dedicated message-types file replaces the table and the default
/// format wholesale when the keys are present.
#[derive(Debug, Default, Deserialize)]
struct MessageTypesOverlay {
    message_types: Option<BTreeMap<String, String>>,
    default_message_format: Option<String>,
}

impl ConfigOverlay {
    fn apply(self, config: &mut Config) {
        if let Some(database) = self.database {
            database.apply(&mut config.database);
        }
        if let Some(output) = self.output {
            output.apply(&mut config.output);
        }
        if let Some(logging) = self.logging {
            logging.apply(&mut config.logging);
        }
        if let Some(message_types) = self.message_types {
            config.message_types.extend(message_types);
        }
        if let Some(format) = self.default_message_format {
            config.default_message_format = format;
        }
    }
}

impl DatabaseOverlay {
    fn apply(self, database: &mut DatabaseConfig) {
        if let Some(host) = self.host {
            database.host = host;
        }
        if let Some(port) = self.port {
            database.port = port;
        }
        if let Some(dbname) = self.dbname {
            database.dbname = dbname;
        }
        if let Some(user) = self.user {
            database.user = user;
        }
        if let Some(password) = self.password {
            database.password = password;
        }
    }
}

impl OutputOverlay {
    fn apply(self, output: &mut OutputConfig) {
        if let Some(directory) = self.directory {
            output.directory = directory;
        }
        if let Some(overwrite) = self.overwrite {
            output.overwrite = overwrite;
        }
    }
}

impl LoggingOverlay {
    fn apply(self, logging: &mut LoggingConfig) {
        if let Some(level) = self.level {
            logging.level = level;
        }
        if let Some(file) = self.file {
            logging.file = Some(file);
        }
    }
}

impl MessageTypesOverlay {
    fn apply(self, config: &mut Config) {
        if let Some(message_types) = self.message_types {
            config.message_types = message_types;
        }
        if let Some(format) = self.default_message_format {
            config.default_message_format = format;
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Loads the merged configuration.
///
/// Both files are optional; a missing or unreadable file is logged and
/// skipped, never fatal. Environment overrides are applied last and always
/// win.
pub fn load_config(
    config_file: Option<&Path>,
    message_types_file: Option<&Path>,
) -> Result<Config> {
    let mut config = Config::default();

    if let Some(path) = config_file {
        match read_overlay::<ConfigOverlay>(path) {
            Ok(overlay) => {
                overlay.apply(&mut config);
                info!(path = %path.display(), "loaded configuration file");
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping configuration file");
            }
        }
    }

    if let Some(path) = message_types_file {
        match read_overlay::<MessageTypesOverlay>(path) {
            Ok(overlay) => {
                overlay.apply(&mut config);
                info!(path = %path.display(), "loaded message types file");
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping message types file");
            }
        }
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

fn read_overlay<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(SkypeloadError::not_found(path));
    }
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|err| SkypeloadError::parse(err, Some(path.to_path_buf())))
}

/// Applies environment variable overrides through a lookup function.
///
/// Production code passes `|key| std::env::var(key).ok()`; tests pass a map
/// so they never mutate the process environment.
pub fn apply_env_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(host) = lookup("POSTGRES_HOST") {
        config.database.host = host;
    }
    if let Some(port) = lookup("POSTGRES_PORT") {
        config.database.port = port.parse().map_err(|_| {
            SkypeloadError::config(format!("POSTGRES_PORT must be an integer, got '{port}'"))
        })?;
    }
    if let Some(dbname) = lookup("POSTGRES_DB") {
        config.database.dbname = dbname;
    }
    if let Some(user) = lookup("POSTGRES_USER") {
        config.database.user = user;
    }
    if let Some(password) = lookup("POSTGRES_PASSWORD") {
        config.database.password = password;
    }
    if let Some(directory) = lookup("OUTPUT_DIR") {
        config.output.directory = PathBuf::from(directory);
    }
    if let Some(overwrite) = lookup("OUTPUT_OVERWRITE") {
        config.output.overwrite = is_truthy(&overwrite);
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(file) = lookup("LOG_FILE") {
        config.logging.file = Some(PathBuf::from(file));
    }
    Ok(())
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "yes" | "1")
}
