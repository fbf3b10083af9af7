//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! the bot's tuning constants.

use config::{Config, ConfigError, Environment, File};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,

    /// Telegram application id, only meaningful together with the hash
    pub telegram_api_id: Option<String>,
    /// Telegram application hash
    pub telegram_api_hash: Option<String>,

    /// Alternative Bot API server, e.g. a self-hosted `telegram-bot-api`
    pub telegram_api_url: Option<String>,

    /// Target of the "Developer" button
    #[serde(default = "default_developer_url")]
    pub developer_url: String,

    /// yt-dlp executable name or path
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: String,

    /// Netscape cookies file passed to yt-dlp when present
    #[serde(default = "default_cookies_file")]
    pub cookies_file: String,
}

fn default_developer_url() -> String {
    DEFAULT_DEVELOPER_URL.to_string()
}

fn default_ytdlp_path() -> String {
    "yt-dlp".to_string()
}

fn default_cookies_file() -> String {
    "cookies.txt".to_string()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use oxide_media_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or the values are inconsistent.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Not checked into git
            .add_source(File::with_name("config/local").required(false))
            // TELEGRAM_TOKEN -> telegram_token; empty vars count as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let settings: Self = s.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check that the loaded values are usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` when the token is blank, only one of the
    /// application id and hash is set, the id is not numeric, or the API URL
    /// does not parse.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram_token.trim().is_empty() {
            return Err(ConfigError::Message(
                "TELEGRAM_TOKEN must not be empty".to_string(),
            ));
        }

        match (&self.telegram_api_id, &self.telegram_api_hash) {
            (Some(_), None) | (None, Some(_)) => {
                return Err(ConfigError::Message(
                    "TELEGRAM_API_ID and TELEGRAM_API_HASH must be set together".to_string(),
                ));
            }
            (Some(id), Some(_)) if id.trim().parse::<i32>().is_err() => {
                return Err(ConfigError::Message(format!(
                    "TELEGRAM_API_ID must be numeric, got '{id}'"
                )));
            }
            _ => {}
        }

        if let Some(url) = &self.telegram_api_url {
            Url::parse(url).map_err(|e| {
                ConfigError::Message(format!("TELEGRAM_API_URL is not a valid URL: {e}"))
            })?;
        }

        Ok(())
    }

    /// Numeric application id, if configured.
    #[must_use]
    pub fn api_id(&self) -> Option<i32> {
        self.telegram_api_id
            .as_deref()
            .and_then(|id| id.trim().parse().ok())
    }

    /// Parsed Bot API server URL, if configured.
    #[must_use]
    pub fn api_url(&self) -> Option<Url> {
        self.telegram_api_url
            .as_deref()
            .and_then(|url| Url::parse(url).ok())
    }

    /// Secrets that must never appear in log output.
    #[must_use]
    pub fn secrets(&self) -> Vec<String> {
        std::iter::once(self.telegram_token.clone())
            .chain(self.telegram_api_hash.clone())
            .filter(|s| !s.trim().is_empty())
            .collect()
    }
}


/// Target of the "Developer" button when `DEVELOPER_URL` is unset
pub const DEFAULT_DEVELOPER_URL: &str = "https://t.me/deweni2";

/// Telegram limit for inline button callback data, in bytes
pub const TELEGRAM_CALLBACK_DATA_LIMIT: usize = 64;
/// How long a long link stays resolvable from its button
pub const CALLBACK_LINK_TTL_SECS: u64 = 24 * 60 * 60;
/// Upper bound of cached long links
pub const CALLBACK_LINK_CAPACITY: u64 = 10_000;

/// Delay before retrying the initial connection after a network error
pub const CONNECT_RETRY_DELAY_SECS: u64 = 5;
/// Connection attempts before giving up on network errors
pub const CONNECT_MAX_ATTEMPTS: usize = 10;

/// How long a command's error status stays visible before it is deleted
pub const COMMAND_ERROR_LINGER_SECS: u64 = 4;

/// Initial backoff for retried Telegram API calls
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Backoff ceiling for retried Telegram API calls
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
/// Retries for Telegram API calls
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
