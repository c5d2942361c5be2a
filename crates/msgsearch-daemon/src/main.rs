//! msgsearch daemon - full-text search over stored messages.

use anyhow::{Context, Result};
use msgsearch_daemon::config::Config;
use msgsearch_daemon::handler::{self, VERSION};
use msgsearch_daemon::ipc::{self, IpcEvent};
use msgsearch_daemon::Database;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("msgsearch_daemon=info".parse()?))
        .init();

    info!("Starting msgsearch daemon v{}", VERSION);

    let config = Config::load()?;
    info!("Loaded configuration: {:?}", config);

    let db_path = config.database_path();
    if let Some(dir) = db_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create database directory {:?}", dir))?;
    }

    let db = Database::open_at(db_path.clone())
        .with_context(|| format!("Failed to open database {:?}", db_path))?;
    db.migrate().context("Failed to migrate database")?;
    info!("Database initialized at {:?}", db_path);

    let (ipc_tx, mut ipc_rx) = tokio::sync::mpsc::channel::<IpcEvent>(100);
    let ipc_handle = tokio::spawn(ipc::serve(config.socket_path(), ipc_tx));

    info!("Daemon started, waiting for requests...");

    loop {
        tokio::select! {
            Some(event) = ipc_rx.recv() => {
                let db = db.clone();
                let config = config.clone();
                // SQLite calls block; keep them off the event loop
                tokio::task::spawn_blocking(move || {
                    let response = handler::handle_request(&db, &config, event.request);
                    let _ = event.response_tx.send(response);
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    ipc_handle.abort();
    let _ = std::fs::remove_file(config.socket_path());

    info!("Daemon stopped");
    Ok(())
}
