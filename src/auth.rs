//! HTTP Basic authentication for mutating operations.

use crate::config::AuthConfig;
use crate::error::ServiceError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

const BASIC_PREFIX: &str = "Basic ";

/// Decides whether a username/password pair is accepted.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

/// Single identity taken from configuration.
pub struct StaticCredentials {
    username: String,
    password: String,
}

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.username.clone(), config.password.clone())
    }
}

impl CredentialVerifier for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        username == self.username && password == self.password
    }
}

/// Check a raw `Authorization` header value against the verifier.
pub fn authorize(
    header: Option<&[u8]>,
    verifier: &dyn CredentialVerifier,
) -> Result<(), ServiceError> {
    let header = match header.map(<[u8]>::trim_ascii) {
        Some(value) if !value.is_empty() => value,
        _ => return Err(ServiceError::AuthHeaderMissing),
    };

    let header = std::str::from_utf8(header)
        .ok()
        .filter(|value| value.is_ascii())
        .ok_or_else(|| {
            ServiceError::AuthHeaderMalformed("Authorization header contains non-ASCII bytes".into())
        })?;

    let (username, password) = decode_basic(header)?;

    if !verifier.verify(&username, &password) {
        debug!(username = %username, "Credentials rejected");
        return Err(ServiceError::InvalidCredentials);
    }

    Ok(())
}

/// Split a `Basic <base64(user:pass)>` value into its credential pair.
fn decode_basic(header: &str) -> Result<(String, String), ServiceError> {
    let encoded = header.strip_prefix(BASIC_PREFIX).ok_or_else(|| {
        ServiceError::AuthHeaderMalformed("Authorization header must start with 'Basic'".into())
    })?;

    let payload = STANDARD
        .decode(encoded.trim())
        .map_err(|_| ServiceError::AuthHeaderMalformed("Invalid base64 encoding".into()))?;

    let payload = String::from_utf8(payload)
        .map_err(|_| ServiceError::AuthHeaderMalformed("Credentials are not UTF-8".into()))?;

    let (username, password) = payload.split_once(':').ok_or_else(|| {
        ServiceError::AuthHeaderMalformed("Invalid authorization format".into())
    })?;

    Ok((username.to_string(), password.to_string()))
}
