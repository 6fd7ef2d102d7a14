//! End-to-end pipeline tests against an in-memory store.
//!
//! The store double implements [`ExportStore`] the way the Postgres gateway
//! does, so a whole Load invocation can run without a database.

use std::fs::File;
use std::io::Cursor;
use std::sync::Mutex;

use serde_json::{Value, json};
use tempfile::TempDir;

use skypeload::config::Config;
use skypeload::pipeline::{ExportStore, Loader};
use skypeload::reader::SelectionStrategy;
use skypeload::{CleanedMessage, LoadOutcome, RawExport, Result, SkypeloadError};

#[derive(Default)]
struct MemoryStore {
    loads: Mutex<Vec<(RawExport, Vec<CleanedMessage>)>>,
    fail: bool,
}

impl MemoryStore {
    fn failing() -> Self {
        Self {
            loads: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn load_count(&self) -> usize {
        self.loads.lock().unwrap().len()
    }
}

impl ExportStore for MemoryStore {
    async fn load(&self, export: &RawExport, messages: &[CleanedMessage]) -> Result<LoadOutcome> {
        if self.fail {
            return Err(SkypeloadError::storage(
                "inserting raw export",
                sqlx::Error::PoolClosed,
            ));
        }
        let mut loads = self.loads.lock().unwrap();
        loads.push((export.clone(), messages.to_vec()));
        Ok(LoadOutcome {
            raw_export_id: loads.len() as i64,
            message_ids: (1..=messages.len() as i64).collect(),
            statements: Vec::new(),
        })
    }
}

fn sample_document() -> Value {
    json!({
        "userId": "live:alice",
        "exportDate": "2023-06-01T12:00:00Z",
        "conversations": [
            {
                "id": "19:abc@thread.skype",
                "displayName": "Project chat",
                "MessageList": [
                    {
                        "from": "live:bob",
                        "displayName": "Bob",
                        "originalarrivaltime": "2023-05-31T09:15:00.000Z",
                        "messagetype": "RichText",
                        "content": "hello"
                    },
                    {
                        "from": "live:alice",
                        "originalarrivaltime": "2023-05-31T09:16:00.000Z",
                        "messagetype": "RichText/Location",
                        "content": ""
                    }
                ]
            }
        ]
    })
}

fn loader() -> Loader<MemoryStore> {
    Loader::with_store(Config::default(), MemoryStore::default())
}

#[tokio::test]
async fn load_document_stores_raw_and_cleaned() {
    let loader = loader();
    let document = sample_document();

    let outcome = loader.load_document(document.clone()).await.unwrap();
    assert_eq!(outcome.raw_export_id, 1);
    assert_eq!(outcome.message_count(), 2);

    let loads = loader.store().loads.lock().unwrap();
    let (raw, messages) = &loads[0];
    // raw payload stored verbatim
    assert_eq!(raw.document, document);
    assert_eq!(raw.user_id, "live:alice");
    assert!(raw.export_date.is_some());
    // cleaned rows carry type descriptions
    assert_eq!(messages[0].type_description, "***Sent a RichText***");
    assert_eq!(messages[1].type_description, "***Sent a location***");
}

#[tokio::test]
async fn invalid_document_is_rejected_before_storage() {
    let loader = loader();

    let err = loader
        .load_document(json!({"conversations": []}))
        .await
        .unwrap_err();
    assert!(err.is_schema());
    assert!(err.to_string().contains("userId"));
    // the store never saw the invalid document
    assert_eq!(loader.store().load_count(), 0);
}

#[tokio::test]
async fn storage_failure_propagates_as_storage_error() {
    let loader = Loader::with_store(Config::default(), MemoryStore::failing());

    let err = loader.load_document(sample_document()).await.unwrap_err();
    assert!(err.is_storage());
}

#[tokio::test]
async fn load_file_reads_and_stores() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("export.json");
    std::fs::write(&path, sample_document().to_string()).unwrap();

    let loader = loader();
    let outcome = loader.load_file(&path).await.unwrap();
    assert_eq!(outcome.message_count(), 2);
}

#[tokio::test]
async fn load_file_rejects_wrong_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("export.txt");
    std::fs::write(&path, sample_document().to_string()).unwrap();

    let err = loader().load_file(&path).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn load_file_missing_is_not_found() {
    let err = loader()
        .load_file(std::path::Path::new("/no/such/export.json"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn load_archive_selects_and_stores() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("export.tar");
    let mut builder = tar::Builder::new(File::create(&path).unwrap());
    let content = sample_document().to_string();
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "messages.json", content.as_bytes())
        .unwrap();
    builder.finish().unwrap();

    let loader = loader();
    let outcome = loader
        .load_archive(&path, SelectionStrategy::FirstMatch)
        .await
        .unwrap();
    assert_eq!(outcome.message_count(), 2);
}

#[tokio::test]
async fn load_stream_round_trips_the_document() {
    let document = sample_document();
    let mut stream = Cursor::new(serde_json::to_vec(&document).unwrap());

    let loader = loader();
    loader.load_stream(&mut stream).await.unwrap();

    let loads = loader.store().loads.lock().unwrap();
    assert_eq!(loads[0].0.document, document);
}

#[tokio::test]
async fn load_archive_stream_spools_and_stores() {
    let content = sample_document().to_string();
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "messages.json", content.as_bytes())
        .unwrap();
    let mut stream = Cursor::new(builder.into_inner().unwrap());

    let loader = loader();
    let outcome = loader
        .load_archive_stream(&mut stream, SelectionStrategy::FirstMatch)
        .await
        .unwrap();
    assert_eq!(outcome.message_count(), 2);
}

#[tokio::test]
async fn user_display_name_applies_to_own_messages() {
    let loader = loader().with_user_display_name("Alice Example");
    loader.load_document(sample_document()).await.unwrap();

    let loads = loader.store().loads.lock().unwrap();
    let messages = &loads[0].1;
    assert_eq!(messages[0].sender_display_name.as_deref(), Some("Bob"));
    assert_eq!(
        messages[1].sender_display_name.as_deref(),
        Some("Alice Example")
    );
}
