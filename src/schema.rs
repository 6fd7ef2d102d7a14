//! Fixed SQL contract for the raw and cleaned tables.
//!
//! The table and column layout is an external contract this crate consumes;
//! the storage gateway executes these statements as-is and records which ones
//! ran.

/// Name of the raw export table.
pub const RAW_TABLE: &str = "skype_raw_exports";

/// Name of the cleaned message table.
pub const MESSAGES_TABLE: &str = "skype_messages";

/// Idempotent DDL for both tables.
pub const CREATE_TABLES_SQL: &str = r"
CREATE TABLE IF NOT EXISTS skype_raw_exports (
    id          BIGSERIAL PRIMARY KEY,
    user_id     TEXT NOT NULL,
    export_date TIMESTAMPTZ,
    raw_data    JSONB NOT NULL,
    loaded_at   TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS skype_messages (
    id                        BIGSERIAL PRIMARY KEY,
    raw_export_id             BIGINT NOT NULL REFERENCES skype_raw_exports(id) ON DELETE CASCADE,
    conversation_id           TEXT NOT NULL,
    conversation_display_name TEXT,
    sender_id                 TEXT,
    sender_display_name       TEXT,
    sent_at                   TIMESTAMPTZ,
    message_type              TEXT NOT NULL,
    type_description          TEXT NOT NULL,
    content                   TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_skype_messages_raw_export
    ON skype_messages (raw_export_id);
";

/// Inserts the untransformed export payload. Binds: user id, export date,
/// raw JSONB document.
pub const INSERT_RAW_DATA_SQL: &str = "\
INSERT INTO skype_raw_exports (user_id, export_date, raw_data) \
VALUES ($1, $2, $3) RETURNING id";

/// Inserts one cleaned message row referencing its raw export.
pub const INSERT_CLEANED_DATA_SQL: &str = "\
INSERT INTO skype_messages (raw_export_id, conversation_id, conversation_display_name, \
sender_id, sender_display_name, sent_at, message_type, type_description, content) \
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id";
