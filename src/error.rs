//! Error taxonomy for the session lifecycle.
//!
//! Every failure the core can produce is reported as an [`AuthError`] carrying
//! enough context (kind plus the provider's status and body where one exists) for
//! the view layer to render a message. Nothing is retried internally.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    /// Transport failure or timeout while talking to the provider.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("token exchange failed with status {status}: {body}")]
    TokenExchangeFailed { status: StatusCode, body: String },

    #[error("token refresh failed with status {status}: {body}")]
    RefreshFailed { status: StatusCode, body: String },

    #[error("profile fetch failed with status {status}: {body}")]
    ProfileFetchFailed { status: StatusCode, body: String },

    #[error("track fetch failed with status {status}: {body}")]
    TrackFetchFailed { status: StatusCode, body: String },

    /// The callback `state` was absent or did not match the one we issued.
    #[error("authorization state mismatch")]
    StateMismatch,

    #[error("authorization denied by user: {0}")]
    UserDenied(String),

    #[error("callback carried neither an authorization code nor an error")]
    MissingCode,

    /// Another token-mutating operation is already in flight.
    #[error("session busy: another authentication operation is in progress")]
    SessionBusy,

    #[error("not authenticated")]
    NotAuthenticated,

    /// A login was attempted while a session is already established.
    #[error("already signed in, log out first")]
    AlreadyAuthenticated,

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("token storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AuthError {
    /// Only transport failures may be retried, and only by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::Network(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Network(_) => "network_error",
            AuthError::TokenExchangeFailed { .. } => "token_exchange_failed",
            AuthError::RefreshFailed { .. } => "refresh_failed",
            AuthError::ProfileFetchFailed { .. } => "profile_fetch_failed",
            AuthError::TrackFetchFailed { .. } => "track_fetch_failed",
            AuthError::StateMismatch => "state_mismatch",
            AuthError::UserDenied(_) => "user_denied",
            AuthError::MissingCode => "missing_code",
            AuthError::SessionBusy => "session_busy",
            AuthError::NotAuthenticated => "not_authenticated",
            AuthError::AlreadyAuthenticated => "already_authenticated",
            AuthError::MalformedResponse(_) => "malformed_response",
            AuthError::Storage(_) => "storage_error",
            AuthError::Config(_) => "config_error",
        }
    }
}

impl From<std::io::Error> for AuthError {
    fn from(err: std::io::Error) -> Self {
        AuthError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        AuthError::Storage(err.to_string())
    }
}
