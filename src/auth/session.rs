//! Session management
//!
//! The session lives entirely in a signed cookie named `session`.
//! No server-side session storage needed.

use std::collections::BTreeMap;

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use super::token::{TokenCodec, TokenError};
use crate::metrics::SESSIONS_REJECTED_TOTAL;

/// Name of the session cookie, also used as the token purpose
pub const SESSION_COOKIE_NAME: &str = "session";

/// Payload key holding the username
pub const USERNAME_KEY: &str = "username";

/// Plaintext data carried inside a session token
pub type SessionPayload = BTreeMap<String, String>;

/// Outcome of inspecting a request's session cookie
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No cookie, an invalid cookie, or a cookie without a username
    Anonymous,
    Authenticated { username: String },
}

impl SessionState {
    pub fn username(&self) -> Option<&str> {
        match self {
            SessionState::Anonymous => None,
            SessionState::Authenticated { username } => Some(username.as_str()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    fn from_payload(payload: &SessionPayload) -> Self {
        match payload.get(USERNAME_KEY) {
            Some(username) if !username.is_empty() => SessionState::Authenticated {
                username: username.clone(),
            },
            _ => SessionState::Anonymous,
        }
    }
}

/// Reads, issues and clears session cookies
#[derive(Debug, Clone)]
pub struct SessionManager {
    codec: TokenCodec,
    secure_cookies: bool,
}

impl SessionManager {
    pub fn new(codec: TokenCodec, secure_cookies: bool) -> Self {
        Self {
            codec,
            secure_cookies,
        }
    }

    /// Resolve the session carried by `jar`
    ///
    /// A cookie that fails verification is indistinguishable from no
    /// cookie at all.
    pub fn session_state(&self, jar: &CookieJar) -> SessionState {
        let Some(cookie) = jar.get(SESSION_COOKIE_NAME) else {
            return SessionState::Anonymous;
        };

        match self
            .codec
            .decode::<SessionPayload>(SESSION_COOKIE_NAME, cookie.value())
        {
            Ok(payload) => SessionState::from_payload(&payload),
            Err(error) => {
                tracing::debug!(%error, reason = error.reason(), "Rejected session cookie");
                SESSIONS_REJECTED_TOTAL
                    .with_label_values(&[error.reason()])
                    .inc();
                SessionState::Anonymous
            }
        }
    }

    /// Username of the current session, or an empty string when anonymous
    pub fn user_name(&self, jar: &CookieJar) -> String {
        self.session_state(jar)
            .username()
            .unwrap_or_default()
            .to_owned()
    }

    /// Add a session cookie for `username` to `jar`
    ///
    /// # Errors
    /// Returns the codec error if the token cannot be produced; the jar is
    /// consumed and no cookie is issued in that case.
    pub fn set_session(&self, username: &str, jar: CookieJar) -> Result<CookieJar, TokenError> {
        let payload = SessionPayload::from([(USERNAME_KEY.to_string(), username.to_string())]);
        let token = self.codec.encode(SESSION_COOKIE_NAME, &payload)?;

        let cookie = Cookie::build((SESSION_COOKIE_NAME, token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookies);

        Ok(jar.add(cookie))
    }

    /// Add a removal cookie for the session to `jar`
    pub fn clear_session(&self, jar: CookieJar) -> CookieJar {
        let mut cookie = Cookie::build((SESSION_COOKIE_NAME, ""))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure_cookies)
            .build();
        cookie.make_removal();

        jar.add(cookie)
    }
}
