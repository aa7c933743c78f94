//! Common test utilities for E2E tests

use sessiongate::auth::token::{CIPHER_KEY_BYTES, SIGNING_KEY_BYTES};
use sessiongate::auth::{SESSION_COOKIE_NAME, SessionKeys};
use sessiongate::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const STYLESHEET: &str = "body { color: black; }";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _static_dir: TempDir,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Create a new test server with fixed session keys
    pub async fn new() -> Self {
        Self::with_keys(SessionKeys::new(
            [11_u8; SIGNING_KEY_BYTES],
            Some([22_u8; CIPHER_KEY_BYTES]),
        ))
        .await
    }

    pub async fn with_keys(keys: SessionKeys) -> Self {
        let static_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(static_dir.path().join("css")).unwrap();
        std::fs::write(static_dir.path().join("css/style.css"), STYLESHEET).unwrap();

        let mut config = config::AppConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.assets.templates_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/template").into();
        config.assets.static_dir = static_dir.path().to_path_buf();

        let state = AppState::with_keys(config, keys).unwrap();

        // Redirects are asserted on, never followed
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = sessiongate::build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            _static_dir: static_dir,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Client that stores cookies between requests, like a browser
    pub fn cookie_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap()
    }

    /// POST /login with the given form fields
    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .expect("login request succeeds")
    }

    /// GET /home, optionally presenting a session token
    pub async fn home(&self, session: Option<&str>) -> reqwest::Response {
        let mut request = self.client.get(self.url("/home"));
        if let Some(token) = session {
            request = request.header("Cookie", format!("{SESSION_COOKIE_NAME}={token}"));
        }
        request.send().await.expect("home request succeeds")
    }
}

/// Value of the `Location` header
pub fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header")
}

/// Every `Set-Cookie` header on the response
pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(ToString::to_string))
        .collect()
}

/// Token from the `session` cookie set by the response, if any
pub fn session_token(response: &reqwest::Response) -> Option<String> {
    let prefix = format!("{SESSION_COOKIE_NAME}=");
    set_cookies(response).into_iter().find_map(|cookie| {
        cookie
            .split(';')
            .next()
            .and_then(|pair| pair.strip_prefix(&prefix))
            .map(ToString::to_string)
    })
}
