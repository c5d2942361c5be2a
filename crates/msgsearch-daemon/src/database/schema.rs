//! Database schema definitions.

use msgsearch_common::MessageCategory;

/// SQL to create the thread table.
pub const CREATE_THREAD_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS thread (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    recipient_id INTEGER NOT NULL
)
"#;

/// SQL to create the plain message table.
pub const CREATE_SMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sms (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    thread_id INTEGER NOT NULL,
    body TEXT,
    date_received INTEGER NOT NULL,
    recipient_id INTEGER NOT NULL,
    type INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (thread_id) REFERENCES thread(_id)
)
"#;

/// SQL to create the multimedia message table.
pub const CREATE_MMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS mms (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    thread_id INTEGER NOT NULL,
    body TEXT,
    date_received INTEGER NOT NULL,
    recipient_id INTEGER NOT NULL,
    msg_box INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (thread_id) REFERENCES thread(_id)
)
"#;

/// SQL to create indexes.
pub const CREATE_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_sms_thread_id ON sms(thread_id);
CREATE INDEX IF NOT EXISTS idx_sms_date_received ON sms(date_received DESC);
CREATE INDEX IF NOT EXISTS idx_mms_thread_id ON mms(thread_id);
CREATE INDEX IF NOT EXISTS idx_mms_date_received ON mms(date_received DESC)
"#;

/// SQL to create the FTS index over plain messages.
///
/// External content: the index stores postings only and reads `body` and
/// `thread_id` back from `sms`. It is kept in sync by [`crate::sync`].
pub const CREATE_SMS_FTS_TABLE: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS sms_fts USING fts5(
    body,
    thread_id UNINDEXED,
    content='sms',
    content_rowid='_id'
)
"#;

/// SQL to create the FTS index over multimedia messages.
pub const CREATE_MMS_FTS_TABLE: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS mms_fts USING fts5(
    body,
    thread_id UNINDEXED,
    content='mms',
    content_rowid='_id'
)
"#;

/// Content table backing a category.
pub fn table_name(category: MessageCategory) -> &'static str {
    match category {
        MessageCategory::Sms => "sms",
        MessageCategory::Mms => "mms",
    }
}

/// FTS index for a category.
pub fn fts_table_name(category: MessageCategory) -> &'static str {
    match category {
        MessageCategory::Sms => "sms_fts",
        MessageCategory::Mms => "mms_fts",
    }
}

/// Column holding the type/flags bitmask. The two tables predate a shared name.
pub fn type_column(category: MessageCategory) -> &'static str {
    match category {
        MessageCategory::Sms => "type",
        MessageCategory::Mms => "msg_box",
    }
}
