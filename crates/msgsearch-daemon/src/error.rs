use msgsearch_common::MessageCategory;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Thread not found: {0}")]
    ThreadNotFound(i64),

    #[error("Search index out of sync with {0} table: {1}")]
    IndexDesynchronized(MessageCategory, String),

    #[error("Full-text search is unavailable: {0}")]
    FtsUnavailable(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
