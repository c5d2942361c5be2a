//! Full-text search over stored messages.

pub mod executor;
pub mod query;

pub use executor::{build_sql, collect_rows, for_each_row, SearchScope, SnippetStyle, MAX_RESULTS};
pub use query::{full_text_search_escape, unescape_phrase, FtsQuery};
