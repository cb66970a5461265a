//! Configuration management for mentorlink.

use crate::error::Result;
use crate::platform;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default per-sender throttle window in milliseconds, both directions.
pub const DEFAULT_THROTTLE_MS: u64 = 4000;

/// Default idle time before a typing indicator is withdrawn.
pub const DEFAULT_TYPING_IDLE_MS: u64 = 1200;

/// Default lifetime of a remote typing indicator without fresh signals.
pub const DEFAULT_TYPING_EXPIRY_MS: u64 = 5000;

fn default_throttle_ms() -> u64 {
    DEFAULT_THROTTLE_MS
}

fn default_typing_idle_ms() -> u64 {
    DEFAULT_TYPING_IDLE_MS
}

fn default_typing_expiry_ms() -> u64 {
    DEFAULT_TYPING_EXPIRY_MS
}

fn default_strict_dedup() -> bool {
    true
}

/// Main configuration struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the platform HTTP API.
    pub api_base_url: String,

    /// URL of the bidirectional event channel endpoint.
    pub socket_url: String,

    /// Session cookie forwarded on API requests (None = unauthenticated).
    #[serde(default)]
    pub session_cookie: Option<String>,

    /// Minimum spacing between admitted inbound messages per sender, in ms.
    #[serde(default = "default_throttle_ms")]
    pub inbound_throttle_ms: u64,

    /// Minimum spacing between the local user's own sends, in ms.
    #[serde(default = "default_throttle_ms")]
    pub outbound_throttle_ms: u64,

    /// Drop messages whose (sender, body, second) identity was already seen.
    #[serde(default = "default_strict_dedup")]
    pub strict_dedup: bool,

    /// Input silence before typing=false is emitted, in ms.
    #[serde(default = "default_typing_idle_ms")]
    pub typing_idle_ms: u64,

    /// Lifetime of the remote typing indicator without fresh signals, in ms.
    #[serde(default = "default_typing_expiry_ms")]
    pub typing_expiry_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".to_string(),
            socket_url: "ws://localhost:5000/socket".to_string(),
            session_cookie: None,
            inbound_throttle_ms: DEFAULT_THROTTLE_MS,
            outbound_throttle_ms: DEFAULT_THROTTLE_MS,
            strict_dedup: true,
            typing_idle_ms: DEFAULT_TYPING_IDLE_MS,
            typing_expiry_ms: DEFAULT_TYPING_EXPIRY_MS,
        }
    }
}

impl Config {
    /// Load configuration from the default config file.
    pub fn load() -> Result<Self> {
        Self::load_from(&platform::config_file_path())
    }

    /// Load configuration from a specific path, falling back to defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let mut config: Config = serde_json::from_str(&contents)?;
            config.fix_invalid_values();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Fix any invalid or empty values with sensible defaults.
    fn fix_invalid_values(&mut self) {
        if self.api_base_url.trim().is_empty() {
            self.api_base_url = Config::default().api_base_url;
        }
        if self.socket_url.trim().is_empty() {
            self.socket_url = Config::default().socket_url;
        }
        // A zero idle or expiry timer would withdraw indicators instantly.
        if self.typing_idle_ms == 0 {
            self.typing_idle_ms = DEFAULT_TYPING_IDLE_MS;
        }
        if self.typing_expiry_ms == 0 {
            self.typing_expiry_ms = DEFAULT_TYPING_EXPIRY_MS;
        }
    }

    /// Save configuration to the default config file.
    pub fn save(&mut self) -> Result<()> {
        self.save_to(&platform::config_file_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to(&mut self, path: &Path) -> Result<()> {
        // Fix any invalid values before saving
        self.fix_invalid_values();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Load configuration from environment variables, falling back to file/defaults.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("MENTORLINK_API_URL") {
            self.api_base_url = url;
        }

        if let Ok(url) = std::env::var("MENTORLINK_SOCKET_URL") {
            self.socket_url = url;
        }

        if let Ok(cookie) = std::env::var("MENTORLINK_SESSION_COOKIE") {
            self.session_cookie = Some(cookie);
        }
    }

    /// Inbound throttle window as a [`Duration`].
    pub fn inbound_window(&self) -> Duration {
        Duration::from_millis(self.inbound_throttle_ms)
    }

    /// Outbound throttle window as a [`Duration`].
    pub fn outbound_window(&self) -> Duration {
        Duration::from_millis(self.outbound_throttle_ms)
    }

    /// Typing idle timeout as a [`Duration`].
    pub fn typing_idle(&self) -> Duration {
        Duration::from_millis(self.typing_idle_ms)
    }

    /// Remote typing indicator expiry as a [`Duration`].
    pub fn typing_expiry(&self) -> Duration {
        Duration::from_millis(self.typing_expiry_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.inbound_throttle_ms, 4000);
        assert_eq!(config.outbound_throttle_ms, 4000);
        assert!(config.strict_dedup);
        assert_eq!(config.typing_idle_ms, 1200);
        assert_eq!(config.typing_expiry_ms, 5000);
        assert!(config.session_cookie.is_none());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.api_base_url = "http://example.test:8080".to_string();
        config.outbound_throttle_ms = 2500;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_base_url, "http://example.test:8080");
        assert_eq!(loaded.outbound_throttle_ms, 2500);
        assert_eq!(loaded.inbound_throttle_ms, 4000);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(loaded.api_base_url, Config::default().api_base_url);
    }

    #[test]
    fn test_partial_file_fills_tunables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"api_base_url": "http://example.test", "socket_url": "ws://example.test/socket"}"#,
        )
        .unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.inbound_throttle_ms, DEFAULT_THROTTLE_MS);
        assert!(loaded.strict_dedup);
        assert_eq!(loaded.typing_expiry_ms, DEFAULT_TYPING_EXPIRY_MS);
    }

    #[test]
    fn test_fix_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = Config::default();
        config.socket_url = "  ".to_string();
        config.typing_idle_ms = 0;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.socket_url, Config::default().socket_url);
        assert_eq!(loaded.typing_idle_ms, DEFAULT_TYPING_IDLE_MS);
    }

    #[test]
    fn test_env_overrides_apply() {
        // No other test touches these variables, so set/remove is safe here.
        std::env::remove_var("MENTORLINK_SOCKET_URL");
        std::env::set_var("MENTORLINK_API_URL", "http://env-host:9000");
        std::env::set_var("MENTORLINK_SESSION_COOKIE", "session=abc123");

        let mut config = Config::default();
        config.apply_env();

        std::env::remove_var("MENTORLINK_API_URL");
        std::env::remove_var("MENTORLINK_SESSION_COOKIE");

        assert_eq!(config.api_base_url, "http://env-host:9000");
        assert_eq!(config.session_cookie.as_deref(), Some("session=abc123"));
        assert_eq!(config.socket_url, Config::default().socket_url);
    }
}
