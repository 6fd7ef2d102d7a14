//! # skypeload CLI
//!
//! Command-line interface for the skypeload library.

use std::path::Path;
use std::process;
use std::time::Instant;

use clap::Parser as ClapParser;
use regex::Regex;

use skypeload::SkypeloadError;
use skypeload::cli::Args;
use skypeload::config::load_config;
use skypeload::logging::setup_logging;
use skypeload::pipeline::Loader;
use skypeload::reader;
use skypeload::validate;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("❌ Error: {e}");
        process::exit(1);
    }
}

async fn run() -> Result<(), SkypeloadError> {
    let total_start = Instant::now();
    let args = <Args as ClapParser>::parse();

    let config = load_config(
        args.config.as_deref().map(Path::new),
        args.message_types.as_deref().map(Path::new),
    )?;
    setup_logging(&config.logging)?;

    println!("📦 skypeload v{}", env!("CARGO_PKG_VERSION"));
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📂 Input:    {}", args.input);

    let input = Path::new(&args.input);
    let pattern = args
        .pattern
        .as_deref()
        .map(Regex::new)
        .transpose()
        .map_err(|e| SkypeloadError::validation("pattern", e.to_string()))?;

    // Member operations need no database.
    if args.list {
        let members = reader::list_archive_members(input, pattern.as_ref())?;
        println!("📜 {} member(s):", members.len());
        for name in members {
            println!("   {name}");
        }
        return Ok(());
    }
    if let Some(dir) = args.extract_to.as_deref() {
        let extracted =
            reader::extract_archive_members(input, Some(Path::new(dir)), pattern.as_ref())?;
        println!("📤 Extracted {} member(s) to {dir}", extracted.len());
        for path in extracted {
            println!("   {}", path.display());
        }
        return Ok(());
    }

    // Fail on a bad input before opening any database connection.
    validate::validate_file_exists(input)?;

    let user_display_name = args
        .user_display_name
        .as_deref()
        .map(validate::validate_user_display_name)
        .transpose()?;

    println!(
        "🗄️  Database: {}@{}:{}/{}",
        config.database.user, config.database.host, config.database.port, config.database.dbname
    );

    let mut loader = Loader::connect(config).await?;
    if let Some(name) = user_display_name {
        println!("👤 User:     {name}");
        loader = loader.with_user_display_name(name);
    }

    if args.init_schema {
        println!("🧱 Creating tables...");
        loader.store().init_schema().await?;
    }

    println!("⏳ Loading export...");
    let load_start = Instant::now();
    let outcome = if args.is_archive() {
        loader.load_archive(input, args.selection_strategy()).await?
    } else {
        loader.load_file(input).await?
    };
    let load_time = load_start.elapsed();

    println!("   Stored raw export #{}", outcome.raw_export_id);
    println!(
        "   Stored {} cleaned message(s) ({:.2}s)",
        outcome.message_count(),
        load_time.as_secs_f64()
    );

    println!();
    println!("✅ Done in {:.2}s", total_start.elapsed().as_secs_f64());
    Ok(())
}
