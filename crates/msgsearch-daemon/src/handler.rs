//! Turning IPC requests into database calls.

use msgsearch_common::{ErrorCode, Request, Response};
use tracing::error;

use crate::config::Config;
use crate::database::Database;
use crate::error::StoreError;
use crate::search::SearchScope;

/// Daemon version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Execute one request against `db`.
pub fn handle_request(db: &Database, config: &Config, request: Request) -> Response {
    match request {
        Request::Search { query, thread_id } => {
            let scope = match thread_id {
                Some(id) => SearchScope::Thread(id),
                None => SearchScope::AllConversations,
            };

            match db.search_messages(&query, scope, &config.search.snippet) {
                Ok(rows) => Response::SearchResults {
                    rows: rows.unwrap_or_default(),
                },
                Err(e) => {
                    error!("Search for {:?} failed: {}", query, e);
                    Response::error(ErrorCode::SearchFailed, "Search failed")
                }
            }
        }

        Request::CreateThread { recipient_id } => match db.create_thread(recipient_id) {
            Ok(id) => Response::ThreadCreated { id },
            Err(e) => store_error(e),
        },

        Request::InsertMessage { category, message } => {
            match db.insert_message(category, &message) {
                Ok(id) => Response::MessageStored { id },
                Err(e) => store_error(e),
            }
        }

        Request::UpdateMessage {
            category,
            id,
            patch,
        } => {
            if patch.is_empty() {
                return Response::error(ErrorCode::InvalidRequest, "Patch changes nothing");
            }
            match db.update_message(category, id, &patch) {
                Ok(true) => Response::Ok,
                Ok(false) => Response::not_found(category, id),
                Err(e) => store_error(e),
            }
        }

        Request::DeleteMessage { category, id } => match db.delete_message(category, id) {
            Ok(true) => Response::Ok,
            Ok(false) => Response::not_found(category, id),
            Err(e) => store_error(e),
        },

        Request::VerifyIndex => match db.verify_index() {
            Ok(()) => Response::Ok,
            Err(e) => store_error(e),
        },

        Request::GetStatus => {
            match (
                db.count_messages(msgsearch_common::MessageCategory::Sms),
                db.count_messages(msgsearch_common::MessageCategory::Mms),
                db.database_size(),
            ) {
                (Ok(sms_count), Ok(mms_count), Ok(database_size_bytes)) => Response::Status {
                    version: VERSION.to_string(),
                    sms_count,
                    mms_count,
                    database_size_bytes,
                },
                _ => Response::error(ErrorCode::DatabaseError, "Failed to get status"),
            }
        }

        Request::Ping => Response::Pong,
    }
}

fn store_error(e: StoreError) -> Response {
    match e {
        StoreError::ThreadNotFound(id) => {
            Response::error(ErrorCode::NotFound, format!("Thread {} not found", id))
        }
        other => {
            error!("Database operation failed: {}", other);
            Response::error(ErrorCode::DatabaseError, other.to_string())
        }
    }
}
