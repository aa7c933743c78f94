//! Cookie session authentication
//!
//! Handles:
//! - Signed/encrypted session tokens
//! - Session cookie management
//! - Login, logout and the gated home page

mod extract;
mod routes;
pub mod session;
pub mod token;

pub use extract::CurrentSession;
pub use routes::auth_router;
pub use session::{SESSION_COOKIE_NAME, SessionManager, SessionPayload, SessionState};
pub use token::{SessionKeys, TokenCodec, TokenError};
