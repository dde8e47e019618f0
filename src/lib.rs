//! MoodGroov Session & Mood Core
//!
//! This library provides the session lifecycle and mood classification behind the
//! MoodGroov music client: exchanging an authorization code for tokens,
//! persisting and refreshing them, confirming the signed-in profile, and deriving
//! a listening mood from a track's audio features.
//!
//! # Modules
//!
//! - `api` - HTTP endpoints for the local OAuth callback server
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration from environment variables and `.env`
//! - `error` - The [`AuthError`](error::AuthError) taxonomy
//! - `management` - Token persistence and the session state machine
//! - `mood` - Mood classification and mood-based track filtering
//! - `server` - Local HTTP server for OAuth callbacks
//! - `spotify` - Authorization flow and profile client
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use moodgroov::{config::ProviderConfig, management::*, spotify::*};
//!
//! #[tokio::main]
//! async fn main() -> moodgroov::Res<()> {
//!     moodgroov::config::load_env().await?;
//!     let provider = ProviderConfig::from_env()?;
//!     let profiles = SpotifyProfileClient::new(&provider)?;
//!     let store = Arc::new(FileTokenStore::new(moodgroov::config::token_path()));
//!     let session = SessionManager::new(AuthorizationFlow::new(provider)?, store, profiles);
//!     session.restore().await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod mood;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// Boxed error alias used by the binary and the callback server plumbing.
///
/// Library operations with a defined failure model return
/// [`AuthError`](error::AuthError) instead.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints a status line prefixed with a blue `o`.
///
/// ```
/// info!("Waiting for authorization...");
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a line prefixed with a green check mark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a line prefixed with a red `!` and exits with status 1.
///
/// Only the binary uses this; library code returns errors instead.
///
/// ```
/// error!("Login failed: {}", err);
/// // not reached
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a line prefixed with a yellow `!` for recoverable problems, such as a
/// session being dropped after a failed refresh.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
