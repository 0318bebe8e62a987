//! HS256 JSON Web Tokens bound to a request method and path.
//!
//! Heketi authenticates each request with a short-lived token whose `qsh`
//! claim is the SHA-256 of `METHOD&/path`. A token minted for one endpoint is
//! therefore rejected by every other endpoint.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::Method;

type HmacSha256 = Hmac<Sha256>;

/// Issuer claim expected by Heketi for administrative requests.
pub const DEFAULT_ISSUER: &str = "admin";

/// Validity window applied when no lifetime override is configured.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(300);

const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Claims carried by every request token.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Claims {
    /// Issuer.
    pub iss: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: u64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,
    /// Hex SHA-256 of `METHOD&/path`.
    pub qsh: String,
}

/// Errors raised while minting or checking tokens.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TokenError {
    /// Raised when the system clock reads earlier than the Unix epoch.
    #[error("system clock is before the Unix epoch")]
    Clock,
    /// Raised when claims cannot be serialised or parsed.
    #[error("token claims could not be encoded: {0}")]
    Claims(String),
    /// Raised when the signing key is rejected by the MAC implementation.
    #[error("invalid signing key: {0}")]
    Key(String),
    /// Raised when a token does not have three base64url segments.
    #[error("malformed token")]
    Malformed,
    /// Raised when the signature does not match the key.
    #[error("token signature mismatch")]
    BadSignature,
}

/// Mints request tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    key: Vec<u8>,
    issuer: String,
    lifetime: Duration,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner")
            .field("key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl TokenSigner {
    /// Creates a signer using the default issuer and lifetime.
    #[must_use]
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
            issuer: DEFAULT_ISSUER.to_owned(),
            lifetime: DEFAULT_TOKEN_LIFETIME,
        }
    }

    /// Overrides the validity window.
    #[must_use]
    pub const fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Mints a token for `method` and `path` issued now.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Clock`] when the clock predates the epoch.
    pub fn sign(&self, method: Method, path: &str) -> Result<String, TokenError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TokenError::Clock)?;
        self.sign_at(method, path, now.as_secs())
    }

    /// Mints a token for `method` and `path` issued at `issued_at` seconds
    /// since the Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Claims`] when the claims cannot be serialised.
    pub fn sign_at(
        &self,
        method: Method,
        path: &str,
        issued_at: u64,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            iss: self.issuer.clone(),
            iat: issued_at,
            exp: issued_at.saturating_add(self.lifetime.as_secs()),
            qsh: query_string_hash(method, path),
        };
        let claims_json =
            serde_json::to_vec(&claims).map_err(|err| TokenError::Claims(err.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER_JSON),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let signature = URL_SAFE_NO_PAD.encode(
            self.mac(signing_input.as_bytes())?
                .finalize()
                .into_bytes(),
        );
        Ok(format!("{signing_input}.{signature}"))
    }

    /// Checks the signature of `token` and returns its claims.
    ///
    /// Expiry is not enforced; that is the server's job.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Malformed`] for a token without three segments,
    /// [`TokenError::BadSignature`] when the key does not match, and
    /// [`TokenError::Claims`] when the payload is not valid claims JSON.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Malformed);
        };

        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        self.mac(format!("{header}.{payload}").as_bytes())?
            .verify_slice(&signature_bytes)
            .map_err(|_| TokenError::BadSignature)?;

        let payload_bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| TokenError::Malformed)?;
        serde_json::from_slice(&payload_bytes).map_err(|err| TokenError::Claims(err.to_string()))
    }

    fn mac(&self, data: &[u8]) -> Result<HmacSha256, TokenError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.key)
            .map_err(|err| TokenError::Key(err.to_string()))?;
        mac.update(data);
        Ok(mac)
    }
}

/// Returns `path` with any leading slashes collapsed into exactly one.
#[must_use]
pub fn canonical_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// Computes the `qsh` claim for `method` and `path`.
#[must_use]
pub fn query_string_hash(method: Method, path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_str().as_bytes());
    hasher.update(b"&");
    hasher.update(canonical_path(path).as_bytes());
    hex::encode(hasher.finalize())
}
