//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and configuration
//! structures for controlling the client and terminal output.

use std::env;
use std::time::Duration;

use arrrg_derive::CommandLine;

/// Default backend API root.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api/";

/// Environment variable consulted when no base URL is given.
pub const BASE_URL_ENV: &str = "CHATTERBOX_BASE_URL";

/// Default timeout for list, history and delete requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Command-line arguments for the chatterbox tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Backend API root.
    #[arrrg(optional, "Backend API root (default: http://localhost:3000/api/)", "URL")]
    pub base_url: Option<String>,

    /// Timeout for non-streaming requests, in seconds.
    #[arrrg(optional, "Timeout for list/history/delete requests (default: 30)", "SECONDS")]
    pub timeout_secs: Option<u64>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat client.
///
/// This struct holds the resolved configuration values after processing
/// command-line arguments with appropriate defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// Backend API root; endpoint paths are joined onto it.
    pub base_url: String,

    /// Timeout for list, history and delete requests.  Sends only use a
    /// connect timeout so long replies are not cut off.
    pub timeout: Duration,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Base URL: `CHATTERBOX_BASE_URL`, else http://localhost:3000/api/
    /// - Timeout: 30 seconds
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            base_url: env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            use_color: true,
        }
    }

    /// Sets the backend API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let defaults = ChatConfig::new();
        ChatConfig {
            base_url: args.base_url.unwrap_or(defaults.base_url),
            timeout: args
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            use_color: !args.no_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new().with_base_url(DEFAULT_BASE_URL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            base_url: Some("http://chat.internal:8080/api/".to_string()),
            timeout_secs: Some(5),
            no_color: true,
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.base_url, "http://chat.internal:8080/api/");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.use_color);
    }

    #[test]
    fn config_from_args_keeps_default_timeout() {
        let config = ChatConfig::from(ChatArgs::default());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.use_color);
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_base_url("http://127.0.0.1:3000/api/")
            .with_timeout(Duration::from_secs(2))
            .without_color();
        assert_eq!(config.base_url, "http://127.0.0.1:3000/api/");
        assert_eq!(config.timeout, Duration::from_secs(2));
        assert!(!config.use_color);
    }
}
