//! # Spotify Integration Module
//!
//! Remote side of the session lifecycle (the OAuth 2.0 authorization code flow and
//! the profile lookup that confirms whom a token belongs to), plus the listener's
//! track lookups that feed mood filtering.
//!
//! ```text
//! SessionManager
//!      ├── AuthorizationFlow  (authorize URL, callback validation,
//!      │                       code exchange, token refresh)
//!      └── ProfileSource      (GET /me)
//! cli::filter / cli::playing
//!      └── TrackSource        (recently played, currently playing,
//!                              top tracks, audio features)
//!           ↓
//! HTTP Layer (reqwest)
//! ```
//!
//! ## Endpoints
//!
//! - `GET  {auth_url}?response_type=code&client_id=..&scope=..&redirect_uri=..&state=..`
//! - `POST {token_url}` with `grant_type=authorization_code` or
//!   `grant_type=refresh_token`, authenticated with `Basic base64(id:secret)`
//! - `GET  {api_url}/me` with `Bearer <access token>`
//! - `GET  {api_url}/me/player/recently-played?limit=..`
//! - `GET  {api_url}/me/player/currently-playing` (`204` when nothing plays)
//! - `GET  {api_url}/me/top/tracks?time_range=..&limit=..`
//! - `GET  {api_url}/audio-features?ids=..`
//!
//! ## Failure model
//!
//! Non-2xx token responses map to [`AuthError::TokenExchangeFailed`] or
//! [`AuthError::RefreshFailed`] with the provider's status and body; failed track
//! lookups map to [`AuthError::TrackFetchFailed`]. Transport
//! failures and timeouts map to [`AuthError::Network`]. None of these are retried
//! here; retry policy belongs to the caller.
//!
//! ## Anti-forgery state
//!
//! Every authorization URL embeds a fresh 32 character alphanumeric `state`. A
//! callback is only accepted when it echoes that exact value.
//!
//! [`AuthError::TokenExchangeFailed`]: crate::error::AuthError::TokenExchangeFailed
//! [`AuthError::RefreshFailed`]: crate::error::AuthError::RefreshFailed
//! [`AuthError::Network`]: crate::error::AuthError::Network
//! [`AuthError::TrackFetchFailed`]: crate::error::AuthError::TrackFetchFailed

pub mod auth;
pub mod profile;
pub mod tracks;

pub use auth::AuthorizationFlow;
pub use auth::AuthorizationRequest;
pub use profile::ProfileSource;
pub use profile::SpotifyProfileClient;
pub use tracks::SpotifyTrackClient;
pub use tracks::TrackSource;
