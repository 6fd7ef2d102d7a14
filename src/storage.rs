//! PostgreSQL storage gateway.
//!
//! One Load invocation owns one database transaction: opened at the start,
//! committed when the raw record and every cleaned row are in, rolled back
//! and closed on any failure. There is no partial success — a statement
//! failure anywhere aborts the whole invocation's writes.
//!
//! The [`LoadTransaction`] trait is the seam between the load driver
//! ([`run_load`]) and the database: production uses [`PgLoadTx`] over a
//! `sqlx` transaction, tests use an in-memory double that records statement
//! order and commit/rollback calls.

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::{Postgres, Transaction};
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::error::{Result, SkypeloadError};
use crate::model::{CleanedMessage, LoadOutcome, RawExport};
use crate::schema;
use crate::validate;

/// One database transaction driving a single Load invocation.
///
/// Implementations must execute nothing outside the transaction and must
/// record every executed statement in order.
#[allow(async_fn_in_trait)]
pub trait LoadTransaction {
    /// Inserts the untransformed export payload, returning its row id.
    async fn insert_raw(&mut self, export: &RawExport) -> Result<i64>;

    /// Inserts one cleaned message referencing the raw row, returning its id.
    async fn insert_message(&mut self, raw_id: i64, message: &CleanedMessage) -> Result<i64>;

    /// Commits the transaction.
    async fn commit(self) -> Result<()>;

    /// Rolls the transaction back.
    async fn rollback(self) -> Result<()>;

    /// The statements executed so far, in order.
    fn statements(&self) -> &[&'static str];
}

/// [`LoadTransaction`] over a live Postgres transaction.
pub struct PgLoadTx {
    tx: Transaction<'static, Postgres>,
    statements: Vec<&'static str>,
}

impl PgLoadTx {
    /// Begins a new transaction on the pool.
    pub async fn begin(pool: &PgPool) -> Result<Self> {
        let tx = pool
            .begin()
            .await
            .map_err(|err| SkypeloadError::storage("opening transaction", err))?;
        Ok(Self {
            tx,
            statements: Vec::new(),
        })
    }
}

impl LoadTransaction for PgLoadTx {
    async fn insert_raw(&mut self, export: &RawExport) -> Result<i64> {
        self.statements.push(schema::INSERT_RAW_DATA_SQL);
        let id: i64 = sqlx::query_scalar(schema::INSERT_RAW_DATA_SQL)
            .bind(&export.user_id)
            .bind(export.export_date)
            .bind(sqlx::types::Json(&export.document))
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|err| SkypeloadError::storage("inserting raw export", err))?;
        Ok(id)
    }

    async fn insert_message(&mut self, raw_id: i64, message: &CleanedMessage) -> Result<i64> {
        self.statements.push(schema::INSERT_CLEANED_DATA_SQL);
        let id: i64 = sqlx::query_scalar(schema::INSERT_CLEANED_DATA_SQL)
            .bind(raw_id)
            .bind(&message.conversation_id)
            .bind(&message.conversation_display_name)
            .bind(&message.sender_id)
            .bind(&message.sender_display_name)
            .bind(message.sent_at)
            .bind(&message.message_type)
            .bind(&message.type_description)
            .bind(&message.content)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|err| SkypeloadError::storage("inserting cleaned message", err))?;
        Ok(id)
    }

    async fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|err| SkypeloadError::storage("committing load transaction", err))
    }

    async fn rollback(self) -> Result<()> {
        self.tx
            .rollback()
            .await
            .map_err(|err| SkypeloadError::storage("rolling back load transaction", err))
    }

    fn statements(&self) -> &[&'static str] {
        &self.statements
    }
}

/// The storage gateway: owns the connection pool and the load semantics.
pub struct SkypeStorage {
    pool: PgPool,
}

impl SkypeStorage {
    /// Validates the database configuration and opens a connection pool.
    pub async fn connect(database: &DatabaseConfig) -> Result<Self> {
        validate::validate_db_config(database)?;
        let options = PgConnectOptions::new()
            .host(&database.host)
            .port(database.port)
            .database(&database.dbname)
            .username(&database.user)
            .password(&database.password);
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|err| SkypeloadError::storage("connecting to database", err))?;
        info!(host = %database.host, dbname = %database.dbname, "connected to database");
        Ok(Self { pool })
    }

    /// Wraps an existing pool, e.g. one shared with other components.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the raw and cleaned tables if they do not exist.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(schema::CREATE_TABLES_SQL)
            .execute(&self.pool)
            .await
            .map_err(|err| SkypeloadError::storage("creating tables", err))?;
        Ok(())
    }

    /// Stores one export: the raw payload plus all cleaned rows, atomically.
    pub async fn load(
        &self,
        export: &RawExport,
        messages: &[CleanedMessage],
    ) -> Result<LoadOutcome> {
        let tx = PgLoadTx::begin(&self.pool).await?;
        run_load(tx, export, messages).await
    }
}

/// Drives one Load invocation over any [`LoadTransaction`].
///
/// Inserts the raw record first, then every cleaned row referencing it, and
/// commits. Any insert failure rolls the transaction back before the error
/// propagates; a failure of the rollback itself is logged, the original
/// error wins.
pub async fn run_load<T: LoadTransaction>(
    mut tx: T,
    export: &RawExport,
    messages: &[CleanedMessage],
) -> Result<LoadOutcome> {
    let raw_export_id = match tx.insert_raw(export).await {
        Ok(id) => id,
        Err(err) => return abort_load(tx, err).await,
    };

    let mut message_ids = Vec::with_capacity(messages.len());
    for message in messages {
        match tx.insert_message(raw_export_id, message).await {
            Ok(id) => message_ids.push(id),
            Err(err) => return abort_load(tx, err).await,
        }
    }

    let statements = tx.statements().to_vec();
    tx.commit().await?;
    debug!(raw_export_id, messages = message_ids.len(), "load committed");
    Ok(LoadOutcome {
        raw_export_id,
        message_ids,
        statements,
    })
}

async fn abort_load<T: LoadTransaction>(tx: T, err: SkypeloadError) -> Result<LoadOutcome> {
    if let Err(rollback_err) = tx.rollback().await {
        warn!(error = %rollback_err, "rollback failed after load error");
    }
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Shared observer for a [`MockTx`], usable after the transaction is
    /// consumed by commit/rollback.
    #[derive(Default)]
    struct MockState {
        statements: Mutex<Vec<&'static str>>,
        committed: AtomicBool,
        rolled_back: AtomicBool,
    }

    struct MockTx {
        state: Arc<MockState>,
        statements: Vec<&'static str>,
        fail_on_message: bool,
        next_id: i64,
    }

    impl MockTx {
        fn new(state: Arc<MockState>, fail_on_message: bool) -> Self {
            Self {
                state,
                statements: Vec::new(),
                fail_on_message,
                next_id: 0,
            }
        }

        fn record(&mut self, sql: &'static str) {
            self.statements.push(sql);
            self.state.statements.lock().unwrap().push(sql);
        }
    }

    impl LoadTransaction for MockTx {
        async fn insert_raw(&mut self, _export: &RawExport) -> Result<i64> {
            self.record(schema::INSERT_RAW_DATA_SQL);
            self.next_id += 1;
            Ok(self.next_id)
        }

        async fn insert_message(&mut self, _raw_id: i64, _message: &CleanedMessage) -> Result<i64> {
            if self.fail_on_message {
                return Err(SkypeloadError::storage(
                    "inserting cleaned message",
                    sqlx::Error::PoolClosed,
                ));
            }
            self.record(schema::INSERT_CLEANED_DATA_SQL);
            self.next_id += 1;
            Ok(self.next_id)
        }

        async fn commit(self) -> Result<()> {
            self.state.committed.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn rollback(self) -> Result<()> {
            self.state.rolled_back.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn statements(&self) -> &[&'static str] {
            &self.statements
        }
    }

    fn sample_export() -> RawExport {
        RawExport {
            user_id: "live:alice".to_string(),
            export_date: None,
            document: json!({"userId": "live:alice", "conversations": []}),
        }
    }

    fn sample_message(content: &str) -> CleanedMessage {
        CleanedMessage {
            conversation_id: "19:abc@thread.skype".to_string(),
            conversation_display_name: None,
            sender_id: Some("live:bob".to_string()),
            sender_display_name: Some("Bob".to_string()),
            sent_at: None,
            message_type: "RichText".to_string(),
            type_description: "***Sent a RichText***".to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_load_commits_statements_in_order() {
        let state = Arc::new(MockState::default());
        let tx = MockTx::new(Arc::clone(&state), false);
        let messages = vec![sample_message("one"), sample_message("two")];

        let outcome = run_load(tx, &sample_export(), &messages).await.unwrap();

        assert_eq!(outcome.raw_export_id, 1);
        assert_eq!(outcome.message_ids, vec![2, 3]);
        assert_eq!(
            outcome.statements,
            vec![
                schema::INSERT_RAW_DATA_SQL,
                schema::INSERT_CLEANED_DATA_SQL,
                schema::INSERT_CLEANED_DATA_SQL,
            ]
        );
        assert!(state.committed.load(Ordering::SeqCst));
        assert!(!state.rolled_back.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_failed_message_insert_rolls_back_everything() {
        let state = Arc::new(MockState::default());
        let tx = MockTx::new(Arc::clone(&state), true);
        let messages = vec![sample_message("doomed")];

        let err = run_load(tx, &sample_export(), &messages).await.unwrap_err();

        assert!(err.is_storage());
        // nothing committed, even though the raw insert succeeded
        assert!(!state.committed.load(Ordering::SeqCst));
        assert!(state.rolled_back.load(Ordering::SeqCst));
        assert_eq!(
            *state.statements.lock().unwrap(),
            vec![schema::INSERT_RAW_DATA_SQL]
        );
    }

    #[tokio::test]
    async fn test_load_with_no_messages_still_commits_raw() {
        let state = Arc::new(MockState::default());
        let tx = MockTx::new(Arc::clone(&state), false);

        let outcome = run_load(tx, &sample_export(), &[]).await.unwrap();

        assert_eq!(outcome.raw_export_id, 1);
        assert!(outcome.message_ids.is_empty());
        assert!(state.committed.load(Ordering::SeqCst));
    }
}
