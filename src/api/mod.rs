//! # API Module
//!
//! HTTP endpoints served by the local callback server during `moodgroov login`.
//!
//! - [`callback`] receives the provider redirect (`code`, `error`, `state`) and
//!   forwards it to the waiting login through a [`CallbackSlot`].
//! - [`health`] reports status and version.
//!
//! ```rust,ignore
//! use axum::{Extension, Router, routing::get};
//! use moodgroov::api::{self, callback, health};
//!
//! let (slot, rx) = api::callback_slot();
//! let app = Router::new()
//!     .route("/callback", get(callback).layer(Extension(slot)))
//!     .route("/health", get(health));
//! ```

mod callback;
mod health;

use std::sync::Arc;

use tokio::sync::{Mutex, oneshot};

use crate::types::CallbackParams;

pub use callback::callback;
pub use health::health;

/// Single-use channel from the callback handler to the login command.
pub type CallbackSlot = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

pub fn callback_slot() -> (CallbackSlot, oneshot::Receiver<CallbackParams>) {
    let (tx, rx) = oneshot::channel();
    (Arc::new(Mutex::new(Some(tx))), rx)
}
