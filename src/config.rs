//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use serde::Deserialize;
use std::path::PathBuf;

use crate::auth::token::{CIPHER_KEY_BYTES, DEFAULT_MAX_AGE_SECONDS, SIGNING_KEY_BYTES};
use crate::auth::SessionKeys;
use crate::error::{AppError, Result};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub assets: AssetsConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "localhost")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Mark session cookies `Secure` (serve over https)
    #[serde(default)]
    pub secure_cookies: bool,
}

/// Session token configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Token lifetime in seconds; 0 disables expiry (default: 30 days)
    pub max_age_seconds: i64,
    /// Encrypt token payloads in addition to signing them
    pub encrypt: bool,
    /// Base64-encoded 64-byte HMAC key. Generated at startup when unset.
    pub signing_key: Option<String>,
    /// Base64-encoded 32-byte AES-256 key. Generated at startup when unset.
    pub cipher_key: Option<String>,
}

/// Template and static file locations
#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
    /// Directory holding index.html and home.html
    pub templates_dir: PathBuf,
    /// Directory served under /static
    pub static_dir: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "localhost".to_string(),
                port: 8080,
                secure_cookies: false,
            },
            session: SessionConfig {
                max_age_seconds: DEFAULT_MAX_AGE_SECONDS,
                encrypt: true,
                signing_key: None,
                cipher_key: None,
            },
            assets: AssetsConfig {
                templates_dir: PathBuf::from("template"),
                static_dir: PathBuf::from("static"),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (SESSIONGATE__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self> {
        use config::{Config, Environment, File};

        let defaults = Self::default();
        let config = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("server.secure_cookies", defaults.server.secure_cookies)?
            .set_default("session.max_age_seconds", defaults.session.max_age_seconds)?
            .set_default("session.encrypt", defaults.session.encrypt)?
            .set_default(
                "assets.templates_dir",
                defaults.assets.templates_dir.to_string_lossy().into_owned(),
            )?
            .set_default(
                "assets.static_dir",
                defaults.assets.static_dir.to_string_lossy().into_owned(),
            )?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("SESSIONGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Build the process-wide session keys
    ///
    /// Configured keys are decoded; missing ones are generated, which means
    /// sessions do not survive a restart.
    pub fn session_keys(&self) -> Result<SessionKeys> {
        let generated = SessionKeys::generate(self.session.encrypt);

        let signing_key = match self.session.signing_key.as_deref() {
            Some(raw) => decode_key::<SIGNING_KEY_BYTES>("session.signing_key", raw)?,
            None => {
                tracing::info!("No session.signing_key configured; generated a random key");
                generated.signing_key_bytes()
            }
        };

        let cipher_key = match (self.session.encrypt, self.session.cipher_key.as_deref()) {
            (false, _) => None,
            (true, Some(raw)) => Some(decode_key::<CIPHER_KEY_BYTES>("session.cipher_key", raw)?),
            (true, None) => {
                tracing::info!("No session.cipher_key configured; generated a random key");
                generated.cipher_key_bytes()
            }
        };

        Ok(SessionKeys::new(signing_key, cipher_key))
    }

    fn validate(&self) -> Result<()> {
        if self.session.max_age_seconds < 0 {
            return Err(AppError::Config(
                "session.max_age_seconds must not be negative".to_string(),
            ));
        }

        if let Some(raw) = self.session.signing_key.as_deref() {
            decode_key::<SIGNING_KEY_BYTES>("session.signing_key", raw)?;
        }
        if let Some(raw) = self.session.cipher_key.as_deref() {
            decode_key::<CIPHER_KEY_BYTES>("session.cipher_key", raw)?;
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(AppError::Config(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }

        if !self.server.secure_cookies {
            tracing::warn!(
                host = %self.server.host,
                "Using insecure session cookies; enable server.secure_cookies behind https"
            );
        }

        Ok(())
    }
}

fn decode_key<const N: usize>(field: &str, raw: &str) -> Result<[u8; N]> {
    let bytes = BASE64_STANDARD.decode(raw.trim()).map_err(|_| {
        AppError::Config(format!("{field} must be valid base64-encoded bytes"))
    })?;

    bytes
        .try_into()
        .map_err(|_| AppError::Config(format!("{field} must decode to {N} bytes")))
}
