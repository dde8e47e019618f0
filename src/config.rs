//! Configuration management for MoodGroov.
//!
//! Configuration values come from environment variables, optionally seeded from a
//! `.env` file in the local data directory. The lookup order is:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (where applicable)
//!
//! Required values (client id, client secret, redirect URI) have no default; a
//! missing one surfaces as [`AuthError::Config`].

use std::{env, path::PathBuf, time::Duration};

use reqwest::Url;

use crate::error::AuthError;

pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_SCOPES: [&str; 8] = [
    "user-read-private",
    "user-read-email",
    "user-read-recently-played",
    "user-read-playback-state",
    "user-read-currently-playing",
    "user-top-read",
    "playlist-read-private",
    "user-library-read",
];

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the `moodgroov` directory if it doesn't exist and loads environment
/// variables from `moodgroov/.env` inside the platform-specific local data
/// directory:
/// - Linux: `~/.local/share/moodgroov/.env`
/// - macOS: `~/Library/Application Support/moodgroov/.env`
/// - Windows: `%LOCALAPPDATA%/moodgroov/.env`
///
/// A missing `.env` file is not an error; variables already present in the
/// process environment still apply.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or an existing `.env`
/// file cannot be parsed.
pub async fn load_env() -> Result<(), String> {
    let mut path = data_dir();
    path.push(".env");
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }

    match dotenv::from_path(&path) {
        Ok(()) => Ok(()),
        Err(dotenv::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

/// Returns the platform data directory used for configuration and caches.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("moodgroov");
    path
}

/// Default location of the persisted credential.
pub fn token_path() -> PathBuf {
    let mut path = data_dir();
    path.push("cache/token.json");
    path
}

/// Provider endpoints and client registration used by the authorization flow.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
    pub auth_url: Url,
    pub token_url: Url,
    pub api_url: Url,
    pub server_addr: String,
    pub request_timeout: Duration,
}

impl ProviderConfig {
    /// Builds a configuration with the default provider endpoints and scopes.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            auth_url: parse_url("auth url", DEFAULT_AUTH_URL)?,
            token_url: parse_url("token url", DEFAULT_TOKEN_URL)?,
            api_url: parse_url("api url", DEFAULT_API_URL)?,
            server_addr: DEFAULT_SERVER_ADDRESS.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Reads the configuration from `MOODGROOV_*` environment variables.
    ///
    /// `MOODGROOV_CLIENT_ID`, `MOODGROOV_CLIENT_SECRET` and
    /// `MOODGROOV_REDIRECT_URI` are required. `MOODGROOV_SCOPES` is a
    /// space-separated list.
    pub fn from_env() -> Result<Self, AuthError> {
        let mut config = Self::new(
            required("MOODGROOV_CLIENT_ID")?,
            required("MOODGROOV_CLIENT_SECRET")?,
            required("MOODGROOV_REDIRECT_URI")?,
        )?;

        if let Some(scopes) = optional("MOODGROOV_SCOPES") {
            config.scopes = scopes.split_whitespace().map(str::to_string).collect();
        }
        if let Some(url) = optional("MOODGROOV_AUTH_URL") {
            config.auth_url = parse_url("MOODGROOV_AUTH_URL", &url)?;
        }
        if let Some(url) = optional("MOODGROOV_TOKEN_URL") {
            config.token_url = parse_url("MOODGROOV_TOKEN_URL", &url)?;
        }
        if let Some(url) = optional("MOODGROOV_API_URL") {
            config.api_url = parse_url("MOODGROOV_API_URL", &url)?;
        }
        if let Some(addr) = optional("MOODGROOV_SERVER_ADDRESS") {
            config.server_addr = addr;
        }
        if let Some(secs) = optional("MOODGROOV_TIMEOUT_SECS") {
            let secs = secs.parse::<u64>().map_err(|e| {
                AuthError::Config(format!("MOODGROOV_TIMEOUT_SECS is not a number: {e}"))
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_auth_url(mut self, url: Url) -> Self {
        self.auth_url = url;
        self
    }

    pub fn with_token_url(mut self, url: Url) -> Self {
        self.token_url = url;
        self
    }

    pub fn with_api_url(mut self, url: Url) -> Self {
        self.api_url = url;
        self
    }

    pub fn with_server_addr(mut self, addr: impl Into<String>) -> Self {
        self.server_addr = addr.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

fn required(name: &str) -> Result<String, AuthError> {
    optional(name).ok_or_else(|| AuthError::Config(format!("{name} must be set")))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_url(name: &str, value: &str) -> Result<Url, AuthError> {
    Url::parse(value).map_err(|e| AuthError::Config(format!("invalid {name} '{value}': {e}")))
}
