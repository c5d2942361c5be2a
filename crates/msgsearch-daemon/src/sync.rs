//! Search index maintenance.
//!
//! Every mutation of a source message is followed, inside the same
//! transaction, by a call to [`propagate`] describing the change. The FTS5
//! indexes use external content, so postings can only be retracted by
//! replaying the values that were indexed: updates and deletes must carry
//! the row as it was before the mutation.

use msgsearch_common::MessageCategory;
use rusqlite::{params, Connection};
use tracing::debug;

use crate::database::schema;
use crate::error::Result;

/// The indexed projection of a source message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFields {
    pub id: i64,
    pub body: Option<String>,
    pub thread_id: i64,
}

/// A committed-or-about-to-commit change to a source message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageChange {
    Inserted { new: IndexedFields },
    Updated { old: IndexedFields, new: IndexedFields },
    Deleted { old: IndexedFields },
}

/// Postings maintenance primitives of a full-text engine.
pub trait IndexSink {
    /// Index `fields` under `fields.id`.
    fn add(&mut self, category: MessageCategory, fields: &IndexedFields) -> Result<()>;

    /// Remove the postings previously added for exactly `fields`.
    fn retract(&mut self, category: MessageCategory, fields: &IndexedFields) -> Result<()>;
}

/// Apply `change` to the index behind `sink`.
///
/// Updates are a retract of the old values followed by an add of the new
/// ones. The first failing step is returned and the caller must discard
/// the enclosing transaction.
pub fn propagate<S>(sink: &mut S, category: MessageCategory, change: &MessageChange) -> Result<()>
where
    S: IndexSink + ?Sized,
{
    match change {
        MessageChange::Inserted { new } => {
            debug!("Indexing new {} message {}", category, new.id);
            sink.add(category, new)
        }
        MessageChange::Updated { old, new } => {
            debug!("Reindexing {} message {}", category, new.id);
            sink.retract(category, old)?;
            sink.add(category, new)
        }
        MessageChange::Deleted { old } => {
            debug!("Retracting {} message {}", category, old.id);
            sink.retract(category, old)
        }
    }
}

/// [`IndexSink`] writing to the FTS5 tables through a live connection.
///
/// Pass the open transaction the source mutation ran in.
pub struct Fts5Sink<'conn> {
    conn: &'conn Connection,
}

impl<'conn> Fts5Sink<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl IndexSink for Fts5Sink<'_> {
    fn add(&mut self, category: MessageCategory, fields: &IndexedFields) -> Result<()> {
        let fts = schema::fts_table_name(category);
        let mut stmt = self.conn.prepare_cached(&format!(
            "INSERT INTO {fts}(rowid, body, thread_id) VALUES (?1, ?2, ?3)"
        ))?;
        stmt.execute(params![fields.id, fields.body, fields.thread_id])?;
        Ok(())
    }

    fn retract(&mut self, category: MessageCategory, fields: &IndexedFields) -> Result<()> {
        let fts = schema::fts_table_name(category);
        let mut stmt = self.conn.prepare_cached(&format!(
            "INSERT INTO {fts}({fts}, rowid, body, thread_id) VALUES ('delete', ?1, ?2, ?3)"
        ))?;
        stmt.execute(params![fields.id, fields.body, fields.thread_id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use proptest::prelude::*;
    use std::collections::HashMap;

    /// In-memory index that, like FTS5, can only retract what it was given.
    #[derive(Default)]
    struct ModelIndex {
        entries: HashMap<(MessageCategory, i64), IndexedFields>,
        ops: Vec<&'static str>,
    }

    impl IndexSink for ModelIndex {
        fn add(&mut self, category: MessageCategory, fields: &IndexedFields) -> Result<()> {
            self.ops.push("add");
            if self.entries.contains_key(&(category, fields.id)) {
                return Err(StoreError::IndexDesynchronized(
                    category,
                    format!("duplicate entry {}", fields.id),
                ));
            }
            self.entries.insert((category, fields.id), fields.clone());
            Ok(())
        }

        fn retract(&mut self, category: MessageCategory, fields: &IndexedFields) -> Result<()> {
            self.ops.push("retract");
            match self.entries.get(&(category, fields.id)) {
                Some(existing) if existing == fields => {
                    self.entries.remove(&(category, fields.id));
                    Ok(())
                }
                _ => Err(StoreError::IndexDesynchronized(
                    category,
                    format!("stale retraction for {}", fields.id),
                )),
            }
        }
    }

    struct FailingSink;

    impl IndexSink for FailingSink {
        fn add(&mut self, _: MessageCategory, _: &IndexedFields) -> Result<()> {
            Err(StoreError::FtsUnavailable("disk full".to_string()))
        }

        fn retract(&mut self, _: MessageCategory, _: &IndexedFields) -> Result<()> {
            Ok(())
        }
    }

    fn fields(id: i64, body: &str, thread_id: i64) -> IndexedFields {
        IndexedFields {
            id,
            body: Some(body.to_string()),
            thread_id,
        }
    }

    #[test]
    fn test_update_retracts_before_adding() {
        let mut index = ModelIndex::default();
        let old = fields(1, "pizza party", 7);
        let new = fields(1, "taco party", 8);

        propagate(&mut index, MessageCategory::Sms, &MessageChange::Inserted { new: old.clone() })
            .unwrap();
        propagate(
            &mut index,
            MessageCategory::Sms,
            &MessageChange::Updated {
                old,
                new: new.clone(),
            },
        )
        .unwrap();

        assert_eq!(index.ops, vec!["add", "retract", "add"]);
        assert_eq!(index.entries.get(&(MessageCategory::Sms, 1)), Some(&new));
    }

    #[test]
    fn test_categories_are_independent() {
        let mut index = ModelIndex::default();
        let change = MessageChange::Inserted {
            new: fields(1, "hello", 1),
        };

        propagate(&mut index, MessageCategory::Sms, &change).unwrap();
        propagate(&mut index, MessageCategory::Mms, &change).unwrap();
        propagate(
            &mut index,
            MessageCategory::Sms,
            &MessageChange::Deleted {
                old: fields(1, "hello", 1),
            },
        )
        .unwrap();

        assert!(!index.entries.contains_key(&(MessageCategory::Sms, 1)));
        assert!(index.entries.contains_key(&(MessageCategory::Mms, 1)));
    }

    #[test]
    fn test_update_with_wrong_old_values_fails() {
        let mut index = ModelIndex::default();
        propagate(
            &mut index,
            MessageCategory::Mms,
            &MessageChange::Inserted {
                new: fields(4, "a", 1),
            },
        )
        .unwrap();

        let result = propagate(
            &mut index,
            MessageCategory::Mms,
            &MessageChange::Updated {
                old: fields(4, "b", 1),
                new: fields(4, "c", 1),
            },
        );

        assert!(matches!(result, Err(StoreError::IndexDesynchronized(..))));
        assert_eq!(index.ops, vec!["add", "retract"]);
    }

    #[test]
    fn test_sink_error_is_returned() {
        let result = propagate(
            &mut FailingSink,
            MessageCategory::Sms,
            &MessageChange::Updated {
                old: fields(1, "a", 1),
                new: fields(1, "b", 1),
            },
        );
        assert!(matches!(result, Err(StoreError::FtsUnavailable(_))));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(Option<String>, i64),
        Update(usize, Option<String>, i64),
        Delete(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        let body = proptest::option::of("[a-z ]{0,12}");
        prop_oneof![
            (body.clone(), 1..4i64).prop_map(|(b, t)| Op::Insert(b, t)),
            (any::<usize>(), body, 1..4i64).prop_map(|(i, b, t)| Op::Update(i, b, t)),
            any::<usize>().prop_map(Op::Delete),
        ]
    }

    proptest! {
        /// After every operation the index mirrors the source rows exactly.
        #[test]
        fn prop_index_mirrors_source(ops in proptest::collection::vec(op_strategy(), 1..40)) {
            let category = MessageCategory::Sms;
            let mut source: Vec<IndexedFields> = Vec::new();
            let mut index = ModelIndex::default();
            let mut next_id = 1;

            for op in ops {
                match op {
                    Op::Insert(body, thread_id) => {
                        let new = IndexedFields { id: next_id, body, thread_id };
                        next_id += 1;
                        propagate(&mut index, category, &MessageChange::Inserted { new: new.clone() }).unwrap();
                        source.push(new);
                    }
                    Op::Update(i, body, thread_id) if !source.is_empty() => {
                        let slot = i % source.len();
                        let old = source[slot].clone();
                        let new = IndexedFields { id: old.id, body, thread_id };
                        propagate(&mut index, category, &MessageChange::Updated { old, new: new.clone() }).unwrap();
                        source[slot] = new;
                    }
                    Op::Delete(i) if !source.is_empty() => {
                        let old = source.remove(i % source.len());
                        propagate(&mut index, category, &MessageChange::Deleted { old }).unwrap();
                    }
                    _ => {}
                }

                prop_assert_eq!(index.entries.len(), source.len());
                for row in &source {
                    prop_assert_eq!(index.entries.get(&(category, row.id)), Some(row));
                }
            }
        }
    }
}
