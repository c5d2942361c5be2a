//! Unix socket IPC client using synchronous I/O.

use anyhow::{anyhow, bail, Result};
use msgsearch_common::{
    decode_response, encode_request, MessageCategory, MessagePatch, NewMessage, Request, Response,
    SearchResultRow,
};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use tracing::debug;

/// Connection to a running daemon.
pub struct IpcClient {
    stream: UnixStream,
}

impl IpcClient {
    pub fn connect(path: &Path) -> Result<Self> {
        debug!("Connecting to daemon at {:?}", path);

        let stream = UnixStream::connect(path).map_err(|e| {
            anyhow!(
                "Failed to connect to daemon at {:?}: {}. Is msgsearch-daemon running?",
                path,
                e
            )
        })?;

        Ok(Self { stream })
    }

    /// Send a request and wait for its response. Daemon errors become `Err`.
    fn request(&mut self, request: &Request) -> Result<Response> {
        self.stream.write_all(&encode_request(request)?)?;
        self.stream.flush()?;

        let mut reader = BufReader::new(&mut self.stream);
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            bail!("Daemon closed the connection");
        }

        match decode_response(line.trim().as_bytes())? {
            Response::Error { code, message } => {
                Err(anyhow!("Daemon error ({:?}): {}", code, message))
            }
            response => Ok(response),
        }
    }

    pub fn search(&mut self, query: String, thread_id: Option<i64>) -> Result<Vec<SearchResultRow>> {
        match self.request(&Request::Search { query, thread_id })? {
            Response::SearchResults { rows } => Ok(rows),
            other => Err(unexpected(other)),
        }
    }

    pub fn create_thread(&mut self, recipient_id: i64) -> Result<i64> {
        match self.request(&Request::CreateThread { recipient_id })? {
            Response::ThreadCreated { id } => Ok(id),
            other => Err(unexpected(other)),
        }
    }

    pub fn insert_message(&mut self, category: MessageCategory, message: NewMessage) -> Result<i64> {
        match self.request(&Request::InsertMessage { category, message })? {
            Response::MessageStored { id } => Ok(id),
            other => Err(unexpected(other)),
        }
    }

    pub fn update_message(
        &mut self,
        category: MessageCategory,
        id: i64,
        patch: MessagePatch,
    ) -> Result<()> {
        self.expect_ok(&Request::UpdateMessage {
            category,
            id,
            patch,
        })
    }

    pub fn delete_message(&mut self, category: MessageCategory, id: i64) -> Result<()> {
        self.expect_ok(&Request::DeleteMessage { category, id })
    }

    pub fn verify_index(&mut self) -> Result<()> {
        self.expect_ok(&Request::VerifyIndex)
    }

    /// Fetch the daemon's status response.
    pub fn status(&mut self) -> Result<Response> {
        match self.request(&Request::GetStatus)? {
            status @ Response::Status { .. } => Ok(status),
            other => Err(unexpected(other)),
        }
    }

    pub fn ping(&mut self) -> Result<()> {
        match self.request(&Request::Ping)? {
            Response::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    fn expect_ok(&mut self, request: &Request) -> Result<()> {
        match self.request(request)? {
            Response::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: Response) -> anyhow::Error {
    anyhow!("Unexpected response: {:?}", response)
}
