//! # CLI Module
//!
//! Command implementations behind the `moodgroov` binary. Each command builds what
//! it needs from the environment, talks to the session or mood core, and reports
//! through the crate's output macros.
//!
//! ## Session commands
//!
//! - [`login`] - runs the authorization code flow through the local callback server
//! - [`status`] - restores the stored session and shows the signed-in profile
//! - [`token`] - prints a valid access token, refreshing it when expired
//! - [`logout`] - forgets the stored credential
//!
//! ## Mood commands
//!
//! - [`classify`] - maps audio feature values to a mood
//! - [`filter`] - selects tracks of a mood from a JSON track list or from the
//!   signed-in listener's recently played or top tracks
//! - [`playing`] - shows the track playing now and its mood
//!
//! ## Usage
//!
//! ```bash
//! moodgroov login
//! moodgroov status
//! moodgroov classify --valence 0.8 --energy 0.8
//! moodgroov filter --mood happy --tracks tracks.json --artist "Nina Simone"
//! moodgroov filter --mood chill --top --time-range short_term --limit 50
//! moodgroov playing
//! ```

mod auth;
mod mood;

use std::{sync::Arc, time::Duration};

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config::{self, ProviderConfig},
    error::AuthError,
    management::{FileTokenStore, SessionManager},
    spotify::{AuthorizationFlow, SpotifyProfileClient},
};

pub use auth::login;
pub use auth::logout;
pub use auth::status;
pub use auth::token;
pub use mood::classify;
pub use mood::RemoteTracks;
pub use mood::TrackInput;
pub use mood::filter;
pub use mood::playing;

type CliSession = SessionManager<FileTokenStore, SpotifyProfileClient>;

fn session_manager() -> Result<CliSession, AuthError> {
    let provider = ProviderConfig::from_env()?;
    let profiles = SpotifyProfileClient::new(&provider)?;
    let flow = AuthorizationFlow::new(provider)?;
    let store = Arc::new(FileTokenStore::new(config::token_path()));
    Ok(SessionManager::new(flow, store, profiles))
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}
