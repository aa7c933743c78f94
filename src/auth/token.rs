//! Authenticated session tokens
//!
//! Turns a small serializable value into an opaque, cookie-safe string and
//! back. Every token is signed with HMAC-SHA256 and, when a cipher key is
//! configured, the payload is sealed with AES-256-GCM before signing.
//!
//! Token format: `{issued_at}.{base64(body)}.{base64(hmac)}`
//!
//! The MAC covers `name|issued_at|body`, so a token minted for one cookie
//! name never verifies under another.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNING_KEY_BYTES: usize = 64;
pub const CIPHER_KEY_BYTES: usize = 32;
const AES_GCM_NONCE_BYTES: usize = 12;

/// Browsers drop cookies larger than this.
pub const DEFAULT_MAX_TOKEN_LENGTH: usize = 4096;
/// 30 days
pub const DEFAULT_MAX_AGE_SECONDS: i64 = 86_400 * 30;

/// Reasons a token could not be produced or accepted
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("failed to serialize token payload: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to deserialize token payload: {0}")]
    Deserialize(#[source] serde_json::Error),

    #[error("token is malformed")]
    Malformed,

    #[error("token signature is invalid")]
    InvalidMac,

    #[error("token has expired")]
    Expired,

    #[error("token timestamp is in the future")]
    TimestampTooNew,

    #[error("token exceeds {0} bytes")]
    TooLong(usize),

    #[error("token encryption failed")]
    Encryption,

    #[error("token decryption failed")]
    Decryption,
}

impl TokenError {
    /// Stable label for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::Serialize(_) => "serialize",
            TokenError::Deserialize(_) => "deserialize",
            TokenError::Malformed => "malformed",
            TokenError::InvalidMac => "invalid_mac",
            TokenError::Expired => "expired",
            TokenError::TimestampTooNew => "timestamp_too_new",
            TokenError::TooLong(_) => "too_long",
            TokenError::Encryption => "encryption",
            TokenError::Decryption => "decryption",
        }
    }
}

/// Process-wide key pair
///
/// Generated once at startup (or loaded from config) and handed to the
/// codec. Replacing the keys invalidates every outstanding token.
#[derive(Clone)]
pub struct SessionKeys {
    signing_key: [u8; SIGNING_KEY_BYTES],
    cipher_key: Option<[u8; CIPHER_KEY_BYTES]>,
}

impl SessionKeys {
    pub fn new(
        signing_key: [u8; SIGNING_KEY_BYTES],
        cipher_key: Option<[u8; CIPHER_KEY_BYTES]>,
    ) -> Self {
        Self {
            signing_key,
            cipher_key,
        }
    }

    /// Generate a fresh random key pair
    pub fn generate(encrypt: bool) -> Self {
        let mut rng = rand::thread_rng();

        let mut signing_key = [0_u8; SIGNING_KEY_BYTES];
        rng.fill_bytes(&mut signing_key);

        let cipher_key = encrypt.then(|| {
            let mut key = [0_u8; CIPHER_KEY_BYTES];
            rng.fill_bytes(&mut key);
            key
        });

        Self::new(signing_key, cipher_key)
    }

    pub fn encrypts(&self) -> bool {
        self.cipher_key.is_some()
    }

    pub(crate) fn signing_key_bytes(&self) -> [u8; SIGNING_KEY_BYTES] {
        self.signing_key
    }

    pub(crate) fn cipher_key_bytes(&self) -> Option<[u8; CIPHER_KEY_BYTES]> {
        self.cipher_key
    }
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("signing_key", &"<redacted>")
            .field("cipher_key", &self.cipher_key.map(|_| "<redacted>"))
            .finish()
    }
}

/// Signs (and optionally encrypts) values into cookie-safe tokens
#[derive(Debug, Clone)]
pub struct TokenCodec {
    keys: SessionKeys,
    max_age_seconds: i64,
    max_length: usize,
}

impl TokenCodec {
    pub fn new(keys: SessionKeys) -> Self {
        Self {
            keys,
            max_age_seconds: DEFAULT_MAX_AGE_SECONDS,
            max_length: DEFAULT_MAX_TOKEN_LENGTH,
        }
    }

    /// Maximum token age in seconds; 0 disables the check.
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age_seconds = seconds;
        self
    }

    /// Maximum encoded length in bytes; 0 disables the check.
    pub fn with_max_length(mut self, bytes: usize) -> Self {
        self.max_length = bytes;
        self
    }

    /// Encode `value` into a token bound to `name`
    pub fn encode<T: Serialize>(&self, name: &str, value: &T) -> Result<String, TokenError> {
        self.encode_at(name, value, chrono::Utc::now().timestamp())
    }

    /// Verify `token` under `name` and decode its payload
    ///
    /// The value is only produced once every check has passed.
    pub fn decode<T: DeserializeOwned>(&self, name: &str, token: &str) -> Result<T, TokenError> {
        self.decode_at(name, token, chrono::Utc::now().timestamp())
    }

    pub(crate) fn encode_at<T: Serialize>(
        &self,
        name: &str,
        value: &T,
        issued_at: i64,
    ) -> Result<String, TokenError> {
        let serialized = serde_json::to_vec(value).map_err(TokenError::Serialize)?;

        let body = match &self.keys.cipher_key {
            Some(key) => seal(key, name, &serialized)?,
            None => serialized,
        };
        let body_b64 = URL_SAFE_NO_PAD.encode(body);
        let issued_at = issued_at.to_string();

        let signature = self
            .mac(name, &issued_at, &body_b64)
            .map_err(|_| TokenError::Encryption)?
            .finalize()
            .into_bytes();
        let token = format!(
            "{}.{}.{}",
            issued_at,
            body_b64,
            URL_SAFE_NO_PAD.encode(signature)
        );

        if self.max_length > 0 && token.len() > self.max_length {
            return Err(TokenError::TooLong(self.max_length));
        }

        Ok(token)
    }

    pub(crate) fn decode_at<T: DeserializeOwned>(
        &self,
        name: &str,
        token: &str,
        now: i64,
    ) -> Result<T, TokenError> {
        if self.max_length > 0 && token.len() > self.max_length {
            return Err(TokenError::TooLong(self.max_length));
        }

        // 1. Split into issued_at, body and signature
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            return Err(TokenError::Malformed);
        }
        let (issued_at, body_b64, signature_b64) = (parts[0], parts[1], parts[2]);

        // 2. Verify the signature before touching the body
        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::Malformed)?;
        self.mac(name, issued_at, body_b64)?
            .verify_slice(&signature)
            .map_err(|_| TokenError::InvalidMac)?;

        // 3. Check the timestamp window
        let issued_at: i64 = issued_at.parse().map_err(|_| TokenError::Malformed)?;
        if issued_at > now {
            return Err(TokenError::TimestampTooNew);
        }
        if self.max_age_seconds > 0 && issued_at < now.saturating_sub(self.max_age_seconds) {
            return Err(TokenError::Expired);
        }

        // 4. Decrypt and deserialize
        let body = URL_SAFE_NO_PAD
            .decode(body_b64)
            .map_err(|_| TokenError::Malformed)?;
        let plaintext = match &self.keys.cipher_key {
            Some(key) => open(key, name, &body)?,
            None => body,
        };

        serde_json::from_slice(&plaintext).map_err(TokenError::Deserialize)
    }

    fn mac(&self, name: &str, issued_at: &str, body_b64: &str) -> Result<HmacSha256, TokenError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.keys.signing_key)
            .map_err(|_| TokenError::InvalidMac)?;
        mac.update(name.as_bytes());
        mac.update(b"|");
        mac.update(issued_at.as_bytes());
        mac.update(b"|");
        mac.update(body_b64.as_bytes());
        Ok(mac)
    }
}

fn seal(key: &[u8; CIPHER_KEY_BYTES], name: &str, plaintext: &[u8]) -> Result<Vec<u8>, TokenError> {
    let cipher =
        <Aes256Gcm as KeyInit>::new_from_slice(key).map_err(|_| TokenError::Encryption)?;

    let mut nonce = [0_u8; AES_GCM_NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: name.as_bytes(),
            },
        )
        .map_err(|_| TokenError::Encryption)?;

    let mut out = Vec::with_capacity(AES_GCM_NONCE_BYTES + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

fn open(key: &[u8; CIPHER_KEY_BYTES], name: &str, data: &[u8]) -> Result<Vec<u8>, TokenError> {
    if data.len() <= AES_GCM_NONCE_BYTES {
        return Err(TokenError::Decryption);
    }

    let cipher =
        <Aes256Gcm as KeyInit>::new_from_slice(key).map_err(|_| TokenError::Decryption)?;
    let (nonce, ciphertext) = data.split_at(AES_GCM_NONCE_BYTES);
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: name.as_bytes(),
            },
        )
        .map_err(|_| TokenError::Decryption)
}
