//! XDG path utilities for msgsearch.

use std::path::PathBuf;

/// Get the socket path for IPC communication.
///
/// Returns `$XDG_RUNTIME_DIR/msgsearch/msgsearch.sock` or falls back to
/// `/tmp/msgsearch-$UID/msgsearch.sock`.
pub fn socket_path() -> PathBuf {
    if let Some(runtime_dir) = dirs::runtime_dir() {
        runtime_dir.join("msgsearch").join("msgsearch.sock")
    } else {
        let uid = unsafe { libc::getuid() };
        PathBuf::from(format!("/tmp/msgsearch-{}/msgsearch.sock", uid))
    }
}

/// Get the database path.
///
/// Returns `$XDG_DATA_HOME/msgsearch/messages.db` or falls back to
/// `~/.local/share/msgsearch/messages.db`.
pub fn database_path() -> PathBuf {
    let data_dir = dirs::data_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local/share")
    });
    data_dir.join("msgsearch").join("messages.db")
}

/// Get the configuration file path.
///
/// Returns `$XDG_CONFIG_HOME/msgsearch/config.toml` or falls back to
/// `~/.config/msgsearch/config.toml`.
pub fn config_path() -> PathBuf {
    let config_dir = dirs::config_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".config")
    });
    config_dir.join("msgsearch").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_valid() {
        let socket = socket_path();
        assert!(socket.to_str().unwrap().contains("msgsearch"));
        assert!(socket.to_str().unwrap().ends_with("msgsearch.sock"));

        let db = database_path();
        assert!(db.to_str().unwrap().contains("msgsearch"));
        assert!(db.to_str().unwrap().ends_with("messages.db"));

        let config = config_path();
        assert!(config.to_str().unwrap().ends_with("config.toml"));
    }
}
