//! Login flow
//!
//! Implements the anonymous/authenticated state machine over the session
//! cookie.

use axum::{
    Form, Router,
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;

use super::extract::CurrentSession;
use crate::AppState;
use crate::error::AppError;
use crate::metrics::{LOGINS_TOTAL, LOGOUTS_TOTAL};

/// Create authentication router
///
/// Routes:
/// - GET / - Login page
/// - GET /home - Home page (authenticated)
/// - POST /login - Login
/// - POST /logout - Logout
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/", get(login_page))
        .route("/home", get(home_page))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

/// 302 Found; `Redirect::to` answers with 303
fn found(target: &'static str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, target)]).into_response()
}

// =============================================================================
// Pages
// =============================================================================

/// GET /
///
/// Renders the login form regardless of session state.
async fn login_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    Ok(Html(state.templates.render_login()?))
}

/// GET /home
///
/// Shows the username for an authenticated session, otherwise
/// redirects to the login page.
async fn home_page(
    State(state): State<AppState>,
    CurrentSession(session): CurrentSession,
) -> Result<Response, AppError> {
    match session.username() {
        Some(user_name) => Ok(Html(state.templates.render_home(user_name)?).into_response()),
        None => Ok(found("/")),
    }
}

// =============================================================================
// Login / Logout
// =============================================================================

/// Login form body
#[derive(Debug, Default, Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

/// POST /login
///
/// Any non-empty username/password pair is accepted. A missing or
/// unparseable body counts as empty fields.
///
/// # Steps
/// 1. Reject empty fields with a redirect to the login page
/// 2. Issue the session cookie
/// 3. Redirect to home
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    form: Option<Form<LoginForm>>,
) -> Result<Response, AppError> {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    if form.username.is_empty() || form.password.is_empty() {
        LOGINS_TOTAL.with_label_values(&["rejected"]).inc();
        tracing::debug!("Login rejected: empty username or password");
        return Ok(found("/"));
    }

    let jar = match state.sessions.set_session(&form.username, jar) {
        Ok(jar) => jar,
        Err(error) => {
            LOGINS_TOTAL.with_label_values(&["failed"]).inc();
            tracing::warn!(%error, "Failed to issue session cookie");
            return Err(error.into());
        }
    };

    LOGINS_TOTAL.with_label_values(&["accepted"]).inc();
    tracing::info!(username = %form.username, "User logged in");

    Ok((jar, found("/home")).into_response())
}

/// POST /logout
///
/// Clears session cookie and redirects to login.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    LOGOUTS_TOTAL.inc();
    tracing::debug!("Session cleared");

    (state.sessions.clear_session(jar), found("/")).into_response()
}
