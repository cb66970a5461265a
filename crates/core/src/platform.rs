//! Platform-specific filesystem locations.

use std::path::PathBuf;

const APP_DIR: &str = "mentorlink";

/// Directory holding the client configuration.
///
/// - Linux: `~/.config/mentorlink`
/// - Windows: `%APPDATA%\mentorlink`
/// - macOS: `~/Library/Application Support/mentorlink`
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Path of the main config file inside [`config_dir`].
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.json")
}
