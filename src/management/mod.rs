//! Persistent authentication state and the session state machine built on it.

mod session;
mod token;

pub use session::Session;
pub use session::SessionManager;
pub use session::SessionState;
pub use token::FileTokenStore;
pub use token::MemoryTokenStore;
pub use token::TokenStore;
