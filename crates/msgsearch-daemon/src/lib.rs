//! Full-text message search backed by SQLite FTS5.
//!
//! [`database::Database`] stores plain and multimedia messages and keeps one
//! FTS5 index per table in step with every write ([`sync`]). Searches go
//! through [`search`], which escapes user input and unions hits from both
//! indexes.

pub mod config;
pub mod database;
pub mod error;
pub mod handler;
pub mod ipc;
pub mod search;
pub mod sync;

pub use database::Database;
pub use error::{Result, StoreError};
