//! Input validation.
//!
//! Stateless checks that run before external input is trusted by the
//! pipeline: filesystem paths, file types, archive well-formedness, stream
//! capabilities, export structure, user-supplied names, database
//! configuration, and archive member path safety.
//!
//! Every function either returns the validated (and possibly normalized)
//! value or a typed [`SkypeloadError`]; nothing here has side effects beyond
//! reading.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use serde_json::Value;
use tar::Archive;

use crate::config::{Config, DatabaseConfig};
use crate::error::{Result, SkypeloadError};

/// Longest accepted user display name, in characters.
pub const MAX_DISPLAY_NAME_LEN: usize = 256;

/// Characters rejected in display names: path separators plus characters
/// that tend to survive into filenames or SQL string literals downstream.
const FORBIDDEN_NAME_CHARS: &[char] =
    &['/', '\\', ':', '*', '?', '"', '<', '>', '|', ';', '\''];

/// Confirms `path` exists and is a regular file.
pub fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(SkypeloadError::not_found(path));
    }
    if !path.is_file() {
        return Err(SkypeloadError::validation(
            path.display().to_string(),
            "not a regular file",
        ));
    }
    Ok(())
}

/// Confirms `path` exists and is a directory.
pub fn validate_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(SkypeloadError::not_found(path));
    }
    if !path.is_dir() {
        return Err(SkypeloadError::validation(
            path.display().to_string(),
            "not a directory",
        ));
    }
    Ok(())
}

/// Confirms `path` has one of the allowed extensions (case-insensitive).
pub fn validate_file_type(path: &Path, allowed: &[&str]) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    if allowed.iter().any(|a| a.eq_ignore_ascii_case(extension)) {
        return Ok(());
    }
    Err(SkypeloadError::validation(
        path.display().to_string(),
        format!("expected one of [{}], got '.{extension}'", allowed.join(", ")),
    ))
}

/// Existence + type + parse validation for a standalone JSON export file.
pub fn validate_json_file(path: &Path) -> Result<Value> {
    validate_file_exists(path)?;
    validate_file_type(path, &["json"])?;
    crate::reader::read_json(path)
}

/// Confirms `path` is a readable, well-formed tar archive.
///
/// Walks the entry headers without unpacking anything.
pub fn validate_tar_file(path: &Path) -> Result<()> {
    validate_file_exists(path)?;
    let file = File::open(path)?;
    let mut archive = Archive::new(file);
    let entries = archive
        .entries()
        .map_err(|err| SkypeloadError::extraction(path, None, err.to_string()))?;
    for entry in entries {
        entry.map_err(|err| SkypeloadError::extraction(path, None, err.to_string()))?;
    }
    Ok(())
}

/// Confirms a stream exposes the read/seek capability the reader requires.
///
/// Probes the current position and seeks back to it, leaving the stream
/// where it was.
pub fn validate_stream<R: Read + Seek>(stream: &mut R) -> Result<()> {
    let position = stream.stream_position().map_err(|err| {
        SkypeloadError::validation("input stream", format!("not seekable: {err}"))
    })?;
    stream.seek(SeekFrom::Start(position)).map_err(|err| {
        SkypeloadError::validation("input stream", format!("seek failed: {err}"))
    })?;
    Ok(())
}

/// Structural validation of a parsed export document.
///
/// Requires a top-level object with a string `userId` and an array of
/// conversation objects, each carrying a `MessageList` array. Fails with a
/// [`SkypeloadError::Schema`] naming the first missing or mistyped field.
pub fn validate_skype_data(doc: &Value) -> Result<()> {
    let root = doc
        .as_object()
        .ok_or_else(|| SkypeloadError::schema("<root>", "must be a JSON object"))?;

    match root.get("userId") {
        None => return Err(SkypeloadError::schema("userId", "is required")),
        Some(value) if !value.is_string() => {
            return Err(SkypeloadError::schema("userId", "must be a string"));
        }
        _ => {}
    }

    let conversations = match root.get("conversations") {
        None => return Err(SkypeloadError::schema("conversations", "is required")),
        Some(value) => value
            .as_array()
            .ok_or_else(|| SkypeloadError::schema("conversations", "must be an array"))?,
    };

    for (index, conversation) in conversations.iter().enumerate() {
        let object = conversation.as_object().ok_or_else(|| {
            SkypeloadError::schema(format!("conversations[{index}]"), "must be an object")
        })?;
        match object.get("MessageList") {
            None => {
                return Err(SkypeloadError::schema(
                    format!("conversations[{index}].MessageList"),
                    "is required",
                ));
            }
            Some(value) if !value.is_array() => {
                return Err(SkypeloadError::schema(
                    format!("conversations[{index}].MessageList"),
                    "must be an array",
                ));
            }
            _ => {}
        }
    }

    Ok(())
}

/// Validates and normalizes a user-supplied display name.
///
/// Trims surrounding whitespace and rejects names that are empty, too long,
/// or contain control or path/SQL-hostile characters.
pub fn validate_user_display_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(SkypeloadError::validation("display name", "must not be empty"));
    }
    if trimmed.chars().count() > MAX_DISPLAY_NAME_LEN {
        return Err(SkypeloadError::validation(
            "display name",
            format!("longer than {MAX_DISPLAY_NAME_LEN} characters"),
        ));
    }
    if let Some(bad) = trimmed
        .chars()
        .find(|c| c.is_control() || FORBIDDEN_NAME_CHARS.contains(c))
    {
        return Err(SkypeloadError::validation(
            "display name",
            format!("contains forbidden character {bad:?}"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Confirms the database section is usable before a connection is opened.
pub fn validate_db_config(database: &DatabaseConfig) -> Result<()> {
    if database.host.is_empty() {
        return Err(SkypeloadError::config("database.host must not be empty"));
    }
    if database.port == 0 {
        return Err(SkypeloadError::config("database.port must not be 0"));
    }
    if database.dbname.is_empty() {
        return Err(SkypeloadError::config("database.dbname must not be empty"));
    }
    if database.user.is_empty() {
        return Err(SkypeloadError::config("database.user must not be empty"));
    }
    Ok(())
}

/// Confirms the full configuration is usable by the pipeline.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_db_config(&config.database)?;
    if config.default_message_format.is_empty() {
        return Err(SkypeloadError::config(
            "default_message_format must not be empty",
        ));
    }
    Ok(())
}

/// Rejects archive member names that could escape the extraction root.
///
/// A member name must be relative, non-empty, free of NUL bytes, and must
/// not contain any parent-directory component.
pub fn validate_member_path(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SkypeloadError::path_safety(name, "empty member name"));
    }
    if name.contains('\0') {
        return Err(SkypeloadError::path_safety(name, "contains a NUL byte"));
    }
    let path = Path::new(name);
    if path.is_absolute() {
        return Err(SkypeloadError::path_safety(name, "absolute path"));
    }
    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(SkypeloadError::path_safety(
                    name,
                    "contains a parent-directory component",
                ));
            }
            Component::Prefix(_) | Component::RootDir => {
                return Err(SkypeloadError::path_safety(
                    name,
                    "escapes the extraction root",
                ));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }
    Ok(())
}

/// Joins a validated member name onto the extraction root.
///
/// Re-checks that the joined path stays under `root`.
pub fn safe_join(root: &Path, name: &str) -> Result<PathBuf> {
    validate_member_path(name)?;
    let joined = root.join(name);
    if !joined.starts_with(root) {
        return Err(SkypeloadError::path_safety(
            name,
            "escapes the extraction root",
        ));
    }
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_file_exists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        std::fs::write(&path, "{}").unwrap();

        assert!(validate_file_exists(&path).is_ok());
        assert!(
            validate_file_exists(&dir.path().join("missing.json"))
                .unwrap_err()
                .is_not_found()
        );
        // a directory is not a regular file
        assert!(validate_file_exists(dir.path()).unwrap_err().is_validation());
    }

    #[test]
    fn test_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(validate_directory(dir.path()).is_ok());

        let path = dir.path().join("file.txt");
        std::fs::write(&path, "x").unwrap();
        assert!(validate_directory(&path).unwrap_err().is_validation());
    }

    #[test]
    fn test_file_type() {
        assert!(validate_file_type(Path::new("export.json"), &["json"]).is_ok());
        assert!(validate_file_type(Path::new("export.JSON"), &["json"]).is_ok());
        assert!(validate_file_type(Path::new("export.tar"), &["json", "tar"]).is_ok());
        assert!(
            validate_file_type(Path::new("export.zip"), &["json", "tar"])
                .unwrap_err()
                .is_validation()
        );
        assert!(
            validate_file_type(Path::new("no_extension"), &["json"])
                .unwrap_err()
                .is_validation()
        );
    }

    #[test]
    fn test_stream_capability() {
        let mut stream = Cursor::new(b"payload".to_vec());
        stream.set_position(3);
        assert!(validate_stream(&mut stream).is_ok());
        assert_eq!(stream.position(), 3);
    }

    #[test]
    fn test_skype_data_accepts_minimal_export() {
        let doc = json!({
            "userId": "live:alice",
            "conversations": [{"id": "8:bob", "MessageList": []}]
        });
        assert!(validate_skype_data(&doc).is_ok());
    }

    #[test]
    fn test_skype_data_names_first_bad_field() {
        let err = validate_skype_data(&json!([])).unwrap_err();
        assert!(err.to_string().contains("<root>"));

        let err = validate_skype_data(&json!({"conversations": []})).unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("userId"));

        let err = validate_skype_data(&json!({"userId": 42, "conversations": []})).unwrap_err();
        assert!(err.to_string().contains("userId"));

        let err = validate_skype_data(&json!({"userId": "u"})).unwrap_err();
        assert!(err.to_string().contains("conversations"));

        let err = validate_skype_data(&json!({"userId": "u", "conversations": {}})).unwrap_err();
        assert!(err.to_string().contains("conversations"));

        let err = validate_skype_data(&json!({
            "userId": "u",
            "conversations": [{"id": "a", "MessageList": []}, {"id": "b"}]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("conversations[1].MessageList"));

        let err = validate_skype_data(&json!({
            "userId": "u",
            "conversations": [{"id": "a", "MessageList": "nope"}]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("conversations[0].MessageList"));
    }

    #[test]
    fn test_display_name_normalization() {
        assert_eq!(
            validate_user_display_name("  Alice Example ").unwrap(),
            "Alice Example"
        );
    }

    #[test]
    fn test_display_name_rejections() {
        assert!(validate_user_display_name("").unwrap_err().is_validation());
        assert!(validate_user_display_name("   ").unwrap_err().is_validation());
        assert!(
            validate_user_display_name("alice/..")
                .unwrap_err()
                .is_validation()
        );
        assert!(
            validate_user_display_name("alice'; DROP TABLE users; --")
                .unwrap_err()
                .is_validation()
        );
        assert!(
            validate_user_display_name("tab\there")
                .unwrap_err()
                .is_validation()
        );
        let too_long = "a".repeat(MAX_DISPLAY_NAME_LEN + 1);
        assert!(
            validate_user_display_name(&too_long)
                .unwrap_err()
                .is_validation()
        );
    }

    #[test]
    fn test_db_config() {
        let mut database = crate::config::DatabaseConfig::default();
        assert!(validate_db_config(&database).is_ok());

        database.host = String::new();
        assert!(validate_db_config(&database).unwrap_err().is_config());
    }

    #[test]
    fn test_member_path_safety() {
        assert!(validate_member_path("messages.json").is_ok());
        assert!(validate_member_path("media/photo.jpg").is_ok());
        assert!(validate_member_path("./messages.json").is_ok());

        assert!(
            validate_member_path("../../etc/passwd")
                .unwrap_err()
                .is_path_safety()
        );
        assert!(
            validate_member_path("media/../../escape.json")
                .unwrap_err()
                .is_path_safety()
        );
        assert!(
            validate_member_path("/etc/passwd")
                .unwrap_err()
                .is_path_safety()
        );
        assert!(validate_member_path("").unwrap_err().is_path_safety());
        assert!(
            validate_member_path("nul\0byte")
                .unwrap_err()
                .is_path_safety()
        );
    }

    #[test]
    fn test_safe_join() {
        let root = Path::new("/tmp/extract");
        assert_eq!(
            safe_join(root, "media/photo.jpg").unwrap(),
            root.join("media/photo.jpg")
        );
        assert!(safe_join(root, "../outside").unwrap_err().is_path_safety());
    }
}
