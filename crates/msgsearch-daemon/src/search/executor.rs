//! Running match expressions against both message indexes.

use std::ops::ControlFlow;

use msgsearch_common::message_types::{
    BASE_TYPE_MASK, GROUP_CALL_TYPE, GROUP_V2_BIT, PROFILE_CHANGE_TYPE,
    SPECIAL_TYPE_PAYMENTS_NOTIFICATION,
};
use msgsearch_common::{MessageCategory, SearchResultRow};
use rusqlite::{Connection, Row, ToSql};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::query::FtsQuery;
use crate::database::schema;
use crate::error::Result;

/// Hard cap on rows returned by one search.
pub const MAX_RESULTS: usize = 500;

/// Which messages a search covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    /// Every conversation, hiding synthetic notices.
    AllConversations,
    /// One thread, every message kind.
    Thread(i64),
}

/// How snippets are cut and marked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetStyle {
    /// Inserted before each matched term.
    #[serde(default)]
    pub open: String,
    /// Inserted after each matched term.
    #[serde(default)]
    pub close: String,
    /// Marks text cut from either end.
    #[serde(default = "default_ellipsis")]
    pub ellipsis: String,
    /// Approximate number of tokens in the excerpt (FTS5 allows 1..=64).
    #[serde(default = "default_tokens")]
    pub tokens: i64,
}

impl Default for SnippetStyle {
    fn default() -> Self {
        Self {
            open: String::new(),
            close: String::new(),
            ellipsis: default_ellipsis(),
            tokens: default_tokens(),
        }
    }
}

fn default_ellipsis() -> String {
    "...".to_string()
}

fn default_tokens() -> i64 {
    7
}

/// Predicates hiding synthetic messages from global search.
fn global_exclusions(category: MessageCategory) -> Vec<String> {
    let table = schema::table_name(category);
    let column = format!("{}.{}", table, schema::type_column(category));

    match category {
        MessageCategory::Sms => vec![
            format!("({column} & {GROUP_V2_BIT}) = 0"),
            format!("({column} & {BASE_TYPE_MASK}) != {PROFILE_CHANGE_TYPE}"),
            format!("({column} & {BASE_TYPE_MASK}) != {GROUP_CALL_TYPE}"),
        ],
        MessageCategory::Mms => vec![
            format!("({column} & {GROUP_V2_BIT}) = 0"),
            format!("({column} & {SPECIAL_TYPE_PAYMENTS_NOTIFICATION}) = 0"),
        ],
    }
}

/// One `SELECT` of the union: hits from a single category.
fn category_branch(category: MessageCategory, scope: SearchScope) -> String {
    let table = schema::table_name(category);
    let fts = schema::fts_table_name(category);

    let mut predicates = vec![format!("{fts} MATCH :query")];
    match scope {
        SearchScope::AllConversations => predicates.extend(global_exclusions(category)),
        SearchScope::Thread(_) => predicates.push(format!("{table}.thread_id = :thread_id")),
    }

    format!(
        "SELECT thread.recipient_id AS conversation_recipient, \
         {table}.recipient_id AS message_recipient, \
         snippet({fts}, -1, :snippet_open, :snippet_close, :snippet_ellipsis, :snippet_tokens) AS snippet, \
         {table}.date_received AS date_received, \
         {fts}.thread_id AS thread_id, \
         {fts}.body AS body, \
         {fts}.rowid AS message_id, \
         {is_mms} AS is_mms \
         FROM {table} \
         INNER JOIN {fts} ON {fts}.rowid = {table}._id \
         INNER JOIN thread ON {fts}.thread_id = thread._id \
         WHERE {predicates}",
        is_mms = i32::from(category.is_mms()),
        predicates = predicates.join(" AND "),
    )
}

/// Full search statement for `scope`: both categories, newest first, capped.
pub fn build_sql(scope: SearchScope) -> String {
    let branches: Vec<String> = MessageCategory::ALL
        .iter()
        .map(|category| category_branch(*category, scope))
        .collect();

    format!(
        "{} ORDER BY date_received DESC LIMIT {}",
        branches.join(" UNION ALL "),
        MAX_RESULTS
    )
}

fn row_to_result(row: &Row) -> rusqlite::Result<SearchResultRow> {
    Ok(SearchResultRow {
        conversation_recipient: row.get("conversation_recipient")?,
        message_recipient: row.get("message_recipient")?,
        snippet: row.get::<_, Option<String>>("snippet")?.unwrap_or_default(),
        date_received: row.get("date_received")?,
        thread_id: row.get("thread_id")?,
        body: row.get("body")?,
        message_id: row.get("message_id")?,
        is_mms: row.get("is_mms")?,
    })
}

/// Stream hits for `query` to `visitor`, newest first.
///
/// Rows are produced as SQLite steps the statement; returning
/// `ControlFlow::Break` from the visitor stops the scan. Returns the number
/// of rows handed to the visitor.
pub fn for_each_row<F>(
    conn: &Connection,
    query: &FtsQuery,
    scope: SearchScope,
    style: &SnippetStyle,
    mut visitor: F,
) -> Result<usize>
where
    F: FnMut(SearchResultRow) -> ControlFlow<()>,
{
    let sql = build_sql(scope);
    let mut stmt = conn.prepare_cached(&sql)?;

    let expression = query.as_str();
    let tokens = style.tokens.clamp(1, 64);
    let thread_id = match scope {
        SearchScope::AllConversations => None,
        SearchScope::Thread(id) => Some(id),
    };

    let mut params: Vec<(&str, &dyn ToSql)> = vec![
        (":query", &expression as &dyn ToSql),
        (":snippet_open", &style.open as &dyn ToSql),
        (":snippet_close", &style.close as &dyn ToSql),
        (":snippet_ellipsis", &style.ellipsis as &dyn ToSql),
        (":snippet_tokens", &tokens as &dyn ToSql),
    ];
    if let Some(id) = &thread_id {
        params.push((":thread_id", id as &dyn ToSql));
    }

    debug!("Searching {:?} for {}", scope, query);

    let mut rows = stmt.query(params.as_slice())?;
    let mut seen = 0;
    while let Some(row) = rows.next()? {
        seen += 1;
        if visitor(row_to_result(row)?).is_break() {
            break;
        }
    }

    debug!("Search yielded {} rows", seen);
    Ok(seen)
}

/// Collect every hit for `query`.
pub fn collect_rows(
    conn: &Connection,
    query: &FtsQuery,
    scope: SearchScope,
    style: &SnippetStyle,
) -> Result<Vec<SearchResultRow>> {
    let mut rows = Vec::new();
    for_each_row(conn, query, scope, style, |row| {
        rows.push(row);
        ControlFlow::Continue(())
    })?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_sql_filters_synthetic_messages() {
        let sql = build_sql(SearchScope::AllConversations);

        assert!(sql.contains("sms_fts MATCH :query"));
        assert!(sql.contains("mms_fts MATCH :query"));
        assert!(sql.contains(&format!("(sms.type & {}) = 0", GROUP_V2_BIT)));
        assert!(sql.contains(&format!("(sms.type & 31) != {}", GROUP_CALL_TYPE)));
        assert!(sql.contains(&format!("(sms.type & 31) != {}", PROFILE_CHANGE_TYPE)));
        assert!(sql.contains(&format!(
            "(mms.msg_box & {}) = 0",
            SPECIAL_TYPE_PAYMENTS_NOTIFICATION
        )));
        assert!(!sql.contains(":thread_id"));
    }

    #[test]
    fn test_thread_sql_scopes_both_branches() {
        let sql = build_sql(SearchScope::Thread(9));

        assert!(sql.contains("sms.thread_id = :thread_id"));
        assert!(sql.contains("mms.thread_id = :thread_id"));
        assert!(!sql.contains(&GROUP_V2_BIT.to_string()));
        assert!(!sql.contains("msg_box &"));
    }

    #[test]
    fn test_sql_shape() {
        let sql = build_sql(SearchScope::AllConversations);

        assert_eq!(sql.matches("UNION ALL").count(), 1);
        assert!(sql.contains("0 AS is_mms"));
        assert!(sql.contains("1 AS is_mms"));
        assert!(sql.ends_with("ORDER BY date_received DESC LIMIT 500"));
    }

    #[test]
    fn test_snippet_style_defaults() {
        let style: SnippetStyle = toml::from_str("").unwrap();
        assert_eq!(style, SnippetStyle::default());
        assert_eq!(style.ellipsis, "...");
        assert_eq!(style.tokens, 7);
    }
}
