//! Unix socket IPC server.

use anyhow::Result;
use msgsearch_common::{decode_request, encode_response, ErrorCode, Request, Response};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

/// A decoded request waiting for the main loop to answer it.
pub struct IpcEvent {
    pub request: Request,
    pub response_tx: oneshot::Sender<Response>,
}

/// Accept clients on `socket_path` forever, forwarding requests to `event_tx`.
pub async fn serve(socket_path: PathBuf, event_tx: mpsc::Sender<IpcEvent>) -> Result<()> {
    // A stale socket from a previous run blocks bind()
    if socket_path.exists() {
        std::fs::remove_file(&socket_path)?;
    }

    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let listener = UnixListener::bind(&socket_path)?;
    info!("IPC server listening on {:?}", socket_path);

    loop {
        match listener.accept().await {
            Ok((stream, _)) => {
                let tx = event_tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_client(stream, tx).await {
                        debug!("Client connection ended: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

async fn handle_client(stream: UnixStream, event_tx: mpsc::Sender<IpcEvent>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }

        let response = match decode_request(line.trim().as_bytes()) {
            Ok(request) => dispatch(&event_tx, request).await,
            Err(e) => Some(Response::error(
                ErrorCode::InvalidRequest,
                format!("Invalid request: {}", e),
            )),
        };

        // Main loop shut down
        let Some(response) = response else {
            break;
        };

        writer.write_all(&encode_response(&response)?).await?;
        writer.flush().await?;
    }

    Ok(())
}

async fn dispatch(event_tx: &mpsc::Sender<IpcEvent>, request: Request) -> Option<Response> {
    debug!("Received request: {:?}", request);

    let (response_tx, response_rx) = oneshot::channel();
    let event = IpcEvent {
        request,
        response_tx,
    };
    event_tx.send(event).await.ok()?;

    Some(response_rx.await.unwrap_or_else(|_| {
        Response::error(
            ErrorCode::InternalError,
            "Internal error: response channel closed",
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgsearch_common::{decode_response, encode_request};

    #[tokio::test]
    async fn test_round_trip_over_socket() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("test.sock");
        let (tx, mut rx) = mpsc::channel::<IpcEvent>(4);

        tokio::spawn(serve(socket_path.clone(), tx));
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let response = match event.request {
                    Request::Ping => Response::Pong,
                    _ => Response::Ok,
                };
                let _ = event.response_tx.send(response);
            }
        });

        let mut stream = loop {
            match UnixStream::connect(&socket_path).await {
                Ok(stream) => break stream,
                Err(_) => tokio::time::sleep(std::time::Duration::from_millis(10)).await,
            }
        };

        stream.write_all(&encode_request(&Request::Ping).unwrap()).await.unwrap();
        stream.write_all(b"not json\n").await.unwrap();

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert!(matches!(decode_response(line.as_bytes()).unwrap(), Response::Pong));

        line.clear();
        reader.read_line(&mut line).await.unwrap();
        match decode_response(line.as_bytes()).unwrap() {
            Response::Error { code, .. } => assert_eq!(code, ErrorCode::InvalidRequest),
            other => panic!("Unexpected response: {:?}", other),
        }
    }
}
