//! Shared types and utilities for the msgsearch message search service.

pub mod paths;
pub mod protocol;
pub mod types;

pub use paths::*;
pub use protocol::*;
pub use types::*;
