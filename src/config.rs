//! Configuration types for the Person service.

use crate::model::NewPerson;
use serde::{Deserialize, Serialize};

/// Main configuration for the Person service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonServiceConfig {
    /// Config version
    pub version: String,

    /// HTTP listener settings
    pub server: ServerConfig,

    /// Database connection and startup settings
    pub database: DatabaseConfig,

    /// Credentials accepted for mutating operations
    pub auth: AuthConfig,

    /// Field validation rules
    pub validation: ValidationConfig,

    /// Records inserted at startup
    pub seed: Vec<NewPerson>,
}

impl Default for PersonServiceConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            auth: AuthConfig::default(),
            validation: ValidationConfig::default(),
            seed: Vec::new(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub listen_address: String,

    /// Path of the SOAP endpoint
    pub endpoint_path: String,

    /// Maximum request body size (bytes)
    pub max_body_size: usize,

    /// Language of fault texts
    pub fault_language: FaultLanguage,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: "127.0.0.1:8094".to_string(),
            endpoint_path: "/soap".to_string(),
            max_body_size: 1_048_576, // 1MB
            fault_language: FaultLanguage::default(),
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Connection URL (`sqlite://...` or `postgres://...`)
    pub url: String,

    /// Connection pool size (driver default when unset)
    pub max_connections: Option<u32>,

    /// Apply schema migrations on startup
    pub run_migrations: bool,

    /// Delete all rows before seeding
    pub reset_on_start: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://persons.db?mode=rwc".to_string(),
            max_connections: None,
            run_migrations: true,
            reset_on_start: false,
        }
    }
}

/// Basic-auth identity.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,

    /// Realm announced in `WWW-Authenticate` challenges
    pub realm: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("realm", &self.realm)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: "root".to_string(),
            password: "password".to_string(),
            realm: "person-service".to_string(),
        }
    }
}

/// Field validation rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Regular expression a telephone number must match
    pub phone_pattern: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            phone_pattern: r"^\+7[0-9]{10}$".to_string(),
        }
    }
}

/// Language of `faultstring` and `errorMessage` texts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FaultLanguage {
    #[default]
    En,
    Ru,
}

/// SOAP versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoapVersion {
    /// SOAP 1.1 (namespace: http://schemas.xmlsoap.org/soap/envelope/)
    Soap11,
    /// SOAP 1.2 (namespace: http://www.w3.org/2003/05/soap-envelope)
    #[default]
    Soap12,
}

impl SoapVersion {
    /// Envelope namespace URI.
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::Soap11 => crate::parser::SOAP_11_NS,
            Self::Soap12 => crate::parser::SOAP_12_NS,
        }
    }

    /// Content-Type for responses in this version.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Soap11 => "text/xml; charset=utf-8",
            Self::Soap12 => "application/soap+xml; charset=utf-8",
        }
    }
}
