//! Database operations for stored messages and their search indexes.

use std::ops::ControlFlow;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use msgsearch_common::{MessageCategory, MessagePatch, NewMessage, SearchResultRow};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use tracing::{debug, info, warn};

use super::schema;
use crate::error::{Result, StoreError};
use crate::search::{self, FtsQuery, SearchScope, SnippetStyle};
use crate::sync::{self, Fts5Sink, IndexedFields, MessageChange};

/// Shared handle to the message database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open the database at a specific path.
    pub fn open_at(path: PathBuf) -> Result<Self> {
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!("Opened {:?} in {} mode", path, mode);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", true)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run database migrations.
    ///
    /// Fails if the SQLite build lacks FTS5: without the indexes every
    /// search would silently come back empty.
    pub fn migrate(&self) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;

        tx.execute_batch(schema::CREATE_THREAD_TABLE)?;
        tx.execute_batch(schema::CREATE_SMS_TABLE)?;
        tx.execute_batch(schema::CREATE_MMS_TABLE)?;
        tx.execute_batch(schema::CREATE_INDEXES)?;

        for ddl in [schema::CREATE_SMS_FTS_TABLE, schema::CREATE_MMS_FTS_TABLE] {
            tx.execute_batch(ddl)
                .map_err(|e| StoreError::FtsUnavailable(e.to_string()))?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Run `f` in a transaction, committing only if it succeeds.
    fn mutate<T>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T>) -> Result<T> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Create a conversation thread owned by `recipient_id`.
    pub fn create_thread(&self, recipient_id: i64) -> Result<i64> {
        self.mutate(|tx| {
            tx.execute(
                "INSERT INTO thread (recipient_id) VALUES (?1)",
                params![recipient_id],
            )?;
            Ok(tx.last_insert_rowid())
        })
    }

    /// Delete a thread and every message in it.
    ///
    /// Returns the number of messages removed.
    pub fn delete_thread(&self, thread_id: i64) -> Result<usize> {
        self.mutate(|tx| {
            ensure_thread(tx, thread_id)?;

            let mut removed = 0;
            for category in MessageCategory::ALL {
                let table = schema::table_name(category);
                let rows: Vec<IndexedFields> = {
                    let mut stmt = tx.prepare(&format!(
                        "SELECT _id, body, thread_id FROM {table} WHERE thread_id = ?1"
                    ))?;
                    let rows = stmt
                        .query_map(params![thread_id], row_to_fields)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                };

                for old in rows {
                    tx.execute(
                        &format!("DELETE FROM {table} WHERE _id = ?1"),
                        params![old.id],
                    )?;
                    sync::propagate(
                        &mut Fts5Sink::new(tx),
                        category,
                        &MessageChange::Deleted { old },
                    )?;
                    removed += 1;
                }
            }

            tx.execute("DELETE FROM thread WHERE _id = ?1", params![thread_id])?;
            info!("Deleted thread {} with {} messages", thread_id, removed);
            Ok(removed)
        })
    }

    /// Store a new message and index it.
    pub fn insert_message(&self, category: MessageCategory, message: &NewMessage) -> Result<i64> {
        self.mutate(|tx| {
            ensure_thread(tx, message.thread_id)?;

            let table = schema::table_name(category);
            let type_column = schema::type_column(category);
            tx.execute(
                &format!(
                    "INSERT INTO {table} (thread_id, body, date_received, recipient_id, {type_column})
                     VALUES (?1, ?2, ?3, ?4, ?5)"
                ),
                params![
                    message.thread_id,
                    message.body,
                    message.date_received,
                    message.recipient_id,
                    message.type_flags
                ],
            )?;
            let id = tx.last_insert_rowid();

            let new = IndexedFields {
                id,
                body: message.body.clone(),
                thread_id: message.thread_id,
            };
            sync::propagate(&mut Fts5Sink::new(tx), category, &MessageChange::Inserted { new })?;

            debug!("Stored {} message {} in thread {}", category, id, message.thread_id);
            Ok(id)
        })
    }

    /// Apply `patch` to a message and reindex it.
    ///
    /// Returns `false` if the message does not exist.
    pub fn update_message(
        &self,
        category: MessageCategory,
        id: i64,
        patch: &MessagePatch,
    ) -> Result<bool> {
        self.mutate(|tx| {
            let table = schema::table_name(category);
            let type_column = schema::type_column(category);

            let current: Option<(IndexedFields, i64)> = tx
                .query_row(
                    &format!(
                        "SELECT _id, body, thread_id, {type_column} FROM {table} WHERE _id = ?1"
                    ),
                    params![id],
                    |row| Ok((row_to_fields(row)?, row.get(3)?)),
                )
                .optional()?;

            let Some((old, old_flags)) = current else {
                return Ok(false);
            };

            let new = IndexedFields {
                id,
                body: patch.body.clone().unwrap_or_else(|| old.body.clone()),
                thread_id: patch.thread_id.unwrap_or(old.thread_id),
            };
            let flags = patch.type_flags.unwrap_or(old_flags);

            if new.thread_id != old.thread_id {
                ensure_thread(tx, new.thread_id)?;
            }

            tx.execute(
                &format!(
                    "UPDATE {table} SET body = ?1, thread_id = ?2, {type_column} = ?3 WHERE _id = ?4"
                ),
                params![new.body, new.thread_id, flags, id],
            )?;
            sync::propagate(&mut Fts5Sink::new(tx), category, &MessageChange::Updated { old, new })?;

            Ok(true)
        })
    }

    /// Delete a message and retract it from the index.
    ///
    /// Returns `false` if the message does not exist.
    pub fn delete_message(&self, category: MessageCategory, id: i64) -> Result<bool> {
        self.mutate(|tx| {
            let table = schema::table_name(category);

            let old = tx
                .query_row(
                    &format!("SELECT _id, body, thread_id FROM {table} WHERE _id = ?1"),
                    params![id],
                    row_to_fields,
                )
                .optional()?;

            let Some(old) = old else {
                return Ok(false);
            };

            tx.execute(&format!("DELETE FROM {table} WHERE _id = ?1"), params![id])?;
            sync::propagate(&mut Fts5Sink::new(tx), category, &MessageChange::Deleted { old })?;

            debug!("Deleted {} message {}", category, id);
            Ok(true)
        })
    }

    /// Check both search indexes against their source tables.
    pub fn verify_index(&self) -> Result<()> {
        let conn = self.lock();

        for category in MessageCategory::ALL {
            let fts = schema::fts_table_name(category);
            if let Err(e) = conn.execute(
                &format!("INSERT INTO {fts}({fts}, rank) VALUES ('integrity-check', 1)"),
                [],
            ) {
                warn!("Integrity check failed for {}: {}", fts, e);
                return Err(StoreError::IndexDesynchronized(category, e.to_string()));
            }
        }

        Ok(())
    }

    /// Search messages.
    ///
    /// Returns `None` without touching the database when `raw` contains no
    /// search terms.
    pub fn search_messages(
        &self,
        raw: &str,
        scope: SearchScope,
        style: &SnippetStyle,
    ) -> Result<Option<Vec<SearchResultRow>>> {
        let Some(query) = FtsQuery::parse(raw) else {
            return Ok(None);
        };

        let conn = self.lock();
        search::collect_rows(&conn, &query, scope, style).map(Some)
    }

    /// Search messages, handing each hit to `visitor` as it is read.
    ///
    /// Returns `None` when `raw` contains no search terms, otherwise the
    /// number of rows visited.
    pub fn search_messages_with<F>(
        &self,
        raw: &str,
        scope: SearchScope,
        style: &SnippetStyle,
        visitor: F,
    ) -> Result<Option<usize>>
    where
        F: FnMut(SearchResultRow) -> ControlFlow<()>,
    {
        let Some(query) = FtsQuery::parse(raw) else {
            return Ok(None);
        };

        let conn = self.lock();
        search::for_each_row(&conn, &query, scope, style, visitor).map(Some)
    }

    /// Count stored messages of one category.
    pub fn count_messages(&self, category: MessageCategory) -> Result<u64> {
        let conn = self.lock();
        let table = schema::table_name(category);
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Get database size in bytes. Zero for in-memory databases.
    pub fn database_size(&self) -> Result<u64> {
        match &self.path {
            Some(path) => Ok(std::fs::metadata(path)?.len()),
            None => Ok(0),
        }
    }
}

fn ensure_thread(conn: &Connection, thread_id: i64) -> Result<()> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM thread WHERE _id = ?1",
            params![thread_id],
            |_| Ok(()),
        )
        .optional()?;

    match exists {
        Some(()) => Ok(()),
        None => Err(StoreError::ThreadNotFound(thread_id)),
    }
}

fn row_to_fields(row: &rusqlite::Row) -> rusqlite::Result<IndexedFields> {
    Ok(IndexedFields {
        id: row.get(0)?,
        body: row.get(1)?,
        thread_id: row.get(2)?,
    })
}
