//! Command-line interface definition using clap.
//!
//! This module only defines the argument surface; the binary entry point in
//! `main.rs` interprets it. [`Args::selection_strategy`] maps the selection
//! flags onto the library's [`SelectionStrategy`].

use std::path::Path;

use clap::Parser;

use crate::reader::SelectionStrategy;

/// Load a Skype chat export (JSON, optionally inside a tar archive)
/// into PostgreSQL.
#[derive(Parser, Debug, Clone)]
#[command(name = "skypeload")]
#[command(version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    skypeload export.tar
    skypeload messages.json
    skypeload export.tar --select-json 1
    skypeload export.tar --init-schema
    skypeload export.tar --list
    skypeload export.tar --extract-to ./members --pattern '\\.json$'")]
pub struct Args {
    /// Path to the export (JSON file or tar archive)
    pub input: String,

    /// Treat the input as a tar archive regardless of extension
    #[arg(long)]
    pub tar: bool,

    /// Index of the JSON member to load when the archive holds several
    #[arg(long, value_name = "INDEX")]
    pub select_json: Option<usize>,

    /// Prompt on stdin when several JSON members exist
    #[arg(long, conflicts_with = "select_json")]
    pub choose: bool,

    /// Path to a JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,

    /// Path to a JSON file with message type descriptions
    #[arg(long, value_name = "FILE")]
    pub message_types: Option<String>,

    /// Display name stored for the exporting user's own messages
    #[arg(short = 'u', long, value_name = "NAME")]
    pub user_display_name: Option<String>,

    /// List archive members and exit (no database access)
    #[arg(long)]
    pub list: bool,

    /// Extract matching members into DIR and exit (no database access)
    #[arg(long, value_name = "DIR", conflicts_with = "list")]
    pub extract_to: Option<String>,

    /// Regex filter for --list / --extract-to
    #[arg(long, value_name = "REGEX")]
    pub pattern: Option<String>,

    /// Create the raw/cleaned tables before loading
    #[arg(long)]
    pub init_schema: bool,
}

impl Args {
    /// Maps the selection flags onto a [`SelectionStrategy`].
    pub fn selection_strategy(&self) -> SelectionStrategy {
        if let Some(index) = self.select_json {
            SelectionStrategy::ExplicitIndex(index)
        } else if self.choose {
            SelectionStrategy::InteractivePrompt
        } else {
            SelectionStrategy::FirstMatch
        }
    }

    /// Whether the input should be read as a tar archive.
    pub fn is_archive(&self) -> bool {
        self.tar
            || Path::new(&self.input)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("tar"))
    }
}
