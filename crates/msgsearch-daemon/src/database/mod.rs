//! SQLite storage for messages and their search indexes.

mod operations;
pub mod schema;

pub use operations::Database;
