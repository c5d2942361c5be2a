//! IPC protocol types for communication between daemon and client.

use serde::{Deserialize, Serialize};

use crate::types::{MessageCategory, MessagePatch, NewMessage, SearchResultRow};

/// Request from client to daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Full-text search across all conversations, or within one thread.
    Search {
        /// Raw user input.
        query: String,
        /// Restrict results to this thread.
        #[serde(skip_serializing_if = "Option::is_none")]
        thread_id: Option<i64>,
    },

    /// Create a conversation thread.
    CreateThread {
        /// Recipient owning the conversation.
        recipient_id: i64,
    },

    /// Store a new message.
    InsertMessage {
        category: MessageCategory,
        message: NewMessage,
    },

    /// Modify a stored message.
    UpdateMessage {
        category: MessageCategory,
        id: i64,
        patch: MessagePatch,
    },

    /// Remove a stored message.
    DeleteMessage {
        category: MessageCategory,
        id: i64,
    },

    /// Check that both search indexes agree with their source tables.
    VerifyIndex,

    /// Get daemon status.
    GetStatus,

    /// Ping to check if daemon is alive.
    Ping,
}

/// Response from daemon to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Search hits, newest first. Empty when the query had no searchable terms.
    SearchResults { rows: Vec<SearchResultRow> },

    /// A thread was created.
    ThreadCreated { id: i64 },

    /// A message was stored.
    MessageStored { id: i64 },

    /// Generic success response.
    Ok,

    /// Error response.
    Error {
        /// Error code.
        code: ErrorCode,
        /// Human-readable error message.
        message: String,
    },

    /// Daemon status.
    Status {
        /// Daemon version.
        version: String,
        sms_count: u64,
        mms_count: u64,
        /// Database size in bytes.
        database_size_bytes: u64,
    },

    /// Pong response to ping.
    Pong,
}

/// Error codes for error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Message or thread not found.
    NotFound,
    /// Database error.
    DatabaseError,
    /// Search could not be executed.
    SearchFailed,
    /// Invalid request.
    InvalidRequest,
    /// Internal error.
    InternalError,
}

impl Response {
    /// Create an error response.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Response::Error {
            code,
            message: message.into(),
        }
    }

    /// Create a not found error response.
    pub fn not_found(category: MessageCategory, id: i64) -> Self {
        Self::error(
            ErrorCode::NotFound,
            format!("{} message {} not found", category, id),
        )
    }

    /// Check if this is an error response.
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

/// Encode a request to JSON bytes with newline delimiter.
pub fn encode_request(request: &Request) -> Result<Vec<u8>, serde_json::Error> {
    let mut json = serde_json::to_vec(request)?;
    json.push(b'\n');
    Ok(json)
}

/// Encode a response to JSON bytes with newline delimiter.
pub fn encode_response(response: &Response) -> Result<Vec<u8>, serde_json::Error> {
    let mut json = serde_json::to_vec(response)?;
    json.push(b'\n');
    Ok(json)
}

/// Decode a request from JSON bytes.
pub fn decode_request(data: &[u8]) -> Result<Request, serde_json::Error> {
    serde_json::from_slice(data)
}

/// Decode a response from JSON bytes.
pub fn decode_response(data: &[u8]) -> Result<Response, serde_json::Error> {
    serde_json::from_slice(data)
}
