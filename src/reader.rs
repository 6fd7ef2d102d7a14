//! Reading JSON export payloads from files, streams and tar archives.
//!
//! This module is the extraction phase of the pipeline. It reads the export
//! document uniformly from:
//!
//! - a filesystem path ([`read_json`])
//! - an already-open byte stream ([`read_json_from_stream`])
//! - a tar archive on disk ([`read_json_from_archive`])
//! - a tar archive behind a stream ([`read_json_from_archive_stream`])
//!
//! Archives may bundle several files; members whose names end in `.json`
//! (case-sensitive) are the candidates, and a [`SelectionStrategy`] resolves
//! the ambiguity when more than one exists. Archive handles and temporary
//! spool files are scoped resources, closed and deleted on every exit path.
//!
//! # Example
//!
//! ```rust,no_run
//! use skypeload::reader::{read_json_from_archive, SelectionStrategy};
//! use std::path::Path;
//!
//! let doc = read_json_from_archive(Path::new("export.tar"), SelectionStrategy::FirstMatch)?;
//! # Ok::<(), skypeload::SkypeloadError>(())
//! ```

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::Value;
use tar::Archive;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Result, SkypeloadError};
use crate::validate;

/// Suffix identifying candidate export members inside an archive.
pub const JSON_MEMBER_SUFFIX: &str = ".json";

/// How to resolve ambiguity when an archive contains several JSON members.
///
/// Production and server code should use [`FirstMatch`] (the default) or
/// [`ExplicitIndex`]; [`InteractivePrompt`] blocks on stdin and is only
/// suitable for a human at a terminal.
///
/// [`FirstMatch`]: SelectionStrategy::FirstMatch
/// [`ExplicitIndex`]: SelectionStrategy::ExplicitIndex
/// [`InteractivePrompt`]: SelectionStrategy::InteractivePrompt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// Deterministically pick the first member in archive listing order.
    #[default]
    FirstMatch,

    /// Pick the candidate at this index (archive listing order). An
    /// out-of-range index falls back to the first member with a warning.
    ExplicitIndex(usize),

    /// Ask on stdin. Never the default; unusable in non-interactive runs.
    InteractivePrompt,
}

/// Opens and parses a JSON document from a filesystem path.
pub fn read_json(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(SkypeloadError::not_found(path));
    }
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|err| SkypeloadError::parse(err, Some(path.to_path_buf())))
}

/// Parses a JSON document from an already-open byte stream.
///
/// The stream is rewound to the start before reading; callers must not
/// assume the position is preserved. Bytes are decoded as UTF-8.
pub fn read_json_from_stream<R: Read + Seek>(stream: &mut R) -> Result<Value> {
    stream.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes)?;
    let text =
        String::from_utf8(bytes).map_err(|err| SkypeloadError::utf8("stream payload", err))?;
    serde_json::from_str(&text).map_err(|err| SkypeloadError::parse(err, None))
}

/// Extracts and parses the selected JSON member of a tar archive.
///
/// Fails with [`SkypeloadError::EmptyArchive`] when the archive has no JSON
/// members, and with [`SkypeloadError::Extraction`] when the archive is
/// malformed or the selected member cannot be read.
pub fn read_json_from_archive(path: &Path, strategy: SelectionStrategy) -> Result<Value> {
    let candidates = json_candidates(path)?;
    let index = select_member(&candidates, strategy, path)?;
    let member = &candidates[index];
    debug!(archive = %path.display(), member, "reading archive member");

    let bytes = read_member_bytes(path, member)?;
    let text = String::from_utf8(bytes)
        .map_err(|err| SkypeloadError::utf8(format!("archive member {member}"), err))?;
    serde_json::from_str(&text)
        .map_err(|err| SkypeloadError::parse(err, Some(PathBuf::from(member))))
}

/// Stream variant of [`read_json_from_archive`].
///
/// Tar needs random access, which an arbitrary stream does not guarantee, so
/// the stream is spooled into a uniquely-named temporary file first. The
/// temporary file is deleted afterwards whether or not extraction succeeds;
/// a failed deletion is logged, not raised.
pub fn read_json_from_archive_stream<R: Read + Seek>(
    stream: &mut R,
    strategy: SelectionStrategy,
) -> Result<Value> {
    with_spooled_archive(stream, |path| read_json_from_archive(path, strategy))
}

/// Lists archive member names, optionally filtered by a pattern.
///
/// Pure listing; nothing is extracted.
pub fn list_archive_members(path: &Path, pattern: Option<&Regex>) -> Result<Vec<String>> {
    let names = member_names(path)?;
    Ok(filter_names(names, pattern))
}

/// Stream variant of [`list_archive_members`].
pub fn list_archive_members_from_stream<R: Read + Seek>(
    stream: &mut R,
    pattern: Option<&Regex>,
) -> Result<Vec<String>> {
    with_spooled_archive(stream, |path| list_archive_members(path, pattern))
}

/// Extracts matching members to `output_dir` and returns the written paths.
///
/// Without an `output_dir` this is a dry run: the matching member names are
/// returned and nothing is extracted. With one, the directory is created if
/// absent and every member name passes the path-safety check before any
/// unpacking starts.
pub fn extract_archive_members(
    path: &Path,
    output_dir: Option<&Path>,
    pattern: Option<&Regex>,
) -> Result<Vec<PathBuf>> {
    let matching = list_archive_members(path, pattern)?;
    let Some(output_dir) = output_dir else {
        return Ok(matching.into_iter().map(PathBuf::from).collect());
    };

    for name in &matching {
        validate::validate_member_path(name)?;
    }
    fs::create_dir_all(output_dir)?;

    let mut archive = open_archive(path)?;
    let entries = entries_of(&mut archive, path)?;
    let mut extracted = Vec::with_capacity(matching.len());
    for entry in entries {
        let mut entry = entry.map_err(|err| SkypeloadError::extraction(path, None, err.to_string()))?;
        let name = entry_name(&entry, path)?;
        if !matching.iter().any(|m| *m == name) {
            continue;
        }
        let target = validate::safe_join(output_dir, &name)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        entry.unpack(&target).map_err(|err| {
            SkypeloadError::extraction(path, Some(name.clone()), err.to_string())
        })?;
        extracted.push(target);
    }
    info!(archive = %path.display(), count = extracted.len(), "extracted archive members");
    Ok(extracted)
}

/// Stream variant of [`extract_archive_members`].
pub fn extract_archive_members_from_stream<R: Read + Seek>(
    stream: &mut R,
    output_dir: Option<&Path>,
    pattern: Option<&Regex>,
) -> Result<Vec<PathBuf>> {
    with_spooled_archive(stream, |path| {
        extract_archive_members(path, output_dir, pattern)
    })
}

/// Lists the archive's JSON candidate members, in archive listing order.
pub fn json_candidates(path: &Path) -> Result<Vec<String>> {
    Ok(member_names(path)?
        .into_iter()
        .filter(|name| name.ends_with(JSON_MEMBER_SUFFIX))
        .collect())
}

// ============================================================================
// Internals
// ============================================================================

fn open_archive(path: &Path) -> Result<Archive<File>> {
    if !path.exists() {
        return Err(SkypeloadError::not_found(path));
    }
    Ok(Archive::new(File::open(path)?))
}

fn entries_of<'a>(
    archive: &'a mut Archive<File>,
    path: &Path,
) -> Result<tar::Entries<'a, File>> {
    archive
        .entries()
        .map_err(|err| SkypeloadError::extraction(path, None, err.to_string()))
}

fn entry_name(entry: &tar::Entry<'_, File>, path: &Path) -> Result<String> {
    Ok(entry
        .path()
        .map_err(|err| SkypeloadError::extraction(path, None, err.to_string()))?
        .to_string_lossy()
        .into_owned())
}

fn member_names(path: &Path) -> Result<Vec<String>> {
    let mut archive = open_archive(path)?;
    let entries = entries_of(&mut archive, path)?;
    let mut names = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|err| SkypeloadError::extraction(path, None, err.to_string()))?;
        names.push(entry_name(&entry, path)?);
    }
    Ok(names)
}

fn filter_names(names: Vec<String>, pattern: Option<&Regex>) -> Vec<String> {
    match pattern {
        Some(regex) => names.into_iter().filter(|n| regex.is_match(n)).collect(),
        None => names,
    }
}

fn read_member_bytes(path: &Path, member: &str) -> Result<Vec<u8>> {
    let mut archive = open_archive(path)?;
    let entries = entries_of(&mut archive, path)?;
    for entry in entries {
        let mut entry =
            entry.map_err(|err| SkypeloadError::extraction(path, None, err.to_string()))?;
        if entry_name(&entry, path)? == member {
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).map_err(|err| {
                SkypeloadError::extraction(path, Some(member.to_string()), err.to_string())
            })?;
            return Ok(bytes);
        }
    }
    Err(SkypeloadError::extraction(
        path,
        Some(member.to_string()),
        "member disappeared between listing and extraction",
    ))
}

fn select_member(
    candidates: &[String],
    strategy: SelectionStrategy,
    archive: &Path,
) -> Result<usize> {
    if candidates.is_empty() {
        return Err(SkypeloadError::empty_archive(
            archive.display().to_string(),
        ));
    }
    if candidates.len() == 1 {
        return Ok(0);
    }
    match strategy {
        SelectionStrategy::ExplicitIndex(index) if index < candidates.len() => Ok(index),
        SelectionStrategy::ExplicitIndex(index) => {
            warn!(
                index,
                count = candidates.len(),
                "selection index out of range, falling back to the first member"
            );
            Ok(0)
        }
        SelectionStrategy::FirstMatch => {
            info!(
                selected = %candidates[0],
                count = candidates.len(),
                "multiple JSON members found, auto-selecting the first"
            );
            Ok(0)
        }
        SelectionStrategy::InteractivePrompt => prompt_for_member(candidates),
    }
}

fn prompt_for_member(candidates: &[String]) -> Result<usize> {
    eprintln!("Multiple JSON files found in the archive:");
    for (index, name) in candidates.iter().enumerate() {
        eprintln!("{}: {name}", index + 1);
    }
    loop {
        eprintln!("Enter the number of the JSON file to use:");
        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            return Err(SkypeloadError::validation(
                "archive member selection",
                "stdin closed before a selection was made",
            ));
        }
        match line.trim().parse::<usize>() {
            Ok(choice) if (1..=candidates.len()).contains(&choice) => return Ok(choice - 1),
            _ => eprintln!(
                "Invalid selection. Enter a number between 1 and {}.",
                candidates.len()
            ),
        }
    }
}

fn spool_to_temp<R: Read + Seek>(stream: &mut R) -> Result<NamedTempFile> {
    let mut temp = NamedTempFile::new()?;
    stream.seek(SeekFrom::Start(0))?;
    io::copy(stream, temp.as_file_mut())?;
    temp.as_file_mut().flush()?;
    Ok(temp)
}

fn with_spooled_archive<R, T, F>(stream: &mut R, operation: F) -> Result<T>
where
    R: Read + Seek,
    F: FnOnce(&Path) -> Result<T>,
{
    let temp = spool_to_temp(stream)?;
    let result = operation(temp.path());
    if let Err(err) = temp.close() {
        warn!(error = %err, "failed to delete temporary archive copy");
    }
    result
}
