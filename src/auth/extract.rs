//! Session extractor
//!
//! Resolves the request's session cookie once and hands handlers an
//! explicit `SessionState`.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;

use super::session::SessionState;
use crate::AppState;

/// Extractor for the current session
///
/// Never rejects: anything other than a valid session is `Anonymous`.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentSession(session): CurrentSession) -> impl IntoResponse {
///     match session.username() {
///         Some(name) => format!("Hello, {name}"),
///         None => "Hello, stranger".to_string(),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentSession(pub SessionState);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<SessionState>().cloned() {
            return Ok(CurrentSession(session));
        }

        let app_state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let session = app_state.sessions.session_state(&jar);
        parts.extensions.insert(session.clone());

        Ok(CurrentSession(session))
    }
}
