//! IPC between the daemon and its clients.

mod server;

pub use server::{serve, IpcEvent};
