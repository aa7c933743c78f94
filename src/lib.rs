//! SessionGate - A minimal stateless cookie-session gateway
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Layer (Axum)                       │
//! │  - Login page, login/logout, gated home page                │
//! │  - Static files, metrics                                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Session Manager                          │
//! │  - Reads, issues and clears the `session` cookie            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Token Codec                            │
//! │  - HMAC-SHA256 signing, optional AES-256-GCM encryption     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The server keeps no session state: the cookie is the session.
//!
//! # Modules
//!
//! - `auth`: token codec, session manager and login handlers
//! - `views`: HTML templates
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod views;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Everything in here is read-only after startup, so handlers run in
/// parallel without locking.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Session cookie manager
    pub sessions: Arc<auth::SessionManager>,

    /// Page templates
    pub templates: Arc<views::Templates>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Build session keys (configured or generated)
    /// 2. Load templates
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub fn new(config: config::AppConfig) -> error::Result<Self> {
        let keys = config.session_keys()?;
        Self::with_keys(config, keys)
    }

    /// Initialize application state with explicit session keys
    pub fn with_keys(
        config: config::AppConfig,
        keys: auth::SessionKeys,
    ) -> error::Result<Self> {
        tracing::info!("Initializing application state...");

        let encrypts = keys.encrypts();
        let codec = auth::TokenCodec::new(keys).with_max_age(config.session.max_age_seconds);
        let sessions = auth::SessionManager::new(codec, config.server.secure_cookies);
        tracing::info!(encrypted = encrypts, "Session codec initialized");

        let templates = views::Templates::load(&config.assets.templates_dir)?;
        tracing::info!(
            dir = %config.assets.templates_dir.display(),
            "Templates loaded"
        );

        Ok(Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            templates: Arc::new(templates),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{services::ServeDir, trace::TraceLayer};

    let static_files = ServeDir::new(&state.config.assets.static_dir);

    Router::new()
        .merge(auth::auth_router())
        .nest_service("/static", static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(metrics::metrics_router())
}
