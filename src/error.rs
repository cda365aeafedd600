//! Error types for the Person service and SOAP Fault rendering.

use crate::config::{FaultLanguage, SoapVersion};
use axum::http::StatusCode;
use thiserror::Error;


/// Person service errors.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Authorization header is missing")]
    AuthHeaderMissing,

    #[error("Authorization header is malformed: {0}")]
    AuthHeaderMalformed(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid email: '{0}'")]
    InvalidEmail(String),

    #[error("Invalid phone number: '{0}'")]
    InvalidPhone(String),

    #[error("Person with email '{0}' already exists")]
    EmailExists(String),

    #[error("Person not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl ServiceError {
    /// Fault code for this error.
    pub fn code(&self) -> FaultCode {
        match self {
            Self::MalformedRequest(_) => FaultCode::MalformedRequest,
            Self::UnsupportedOperation(_) => FaultCode::UnsupportedOperation,
            Self::AuthHeaderMissing => FaultCode::AuthHeaderMissing,
            Self::AuthHeaderMalformed(_) => FaultCode::AuthHeaderMalformed,
            Self::InvalidCredentials => FaultCode::InvalidCredentials,
            Self::InvalidEmail(_) => FaultCode::InvalidEmail,
            Self::InvalidPhone(_) => FaultCode::InvalidPhone,
            Self::EmailExists(_) => FaultCode::EmailExists,
            Self::NotFound => FaultCode::NotFound,
            Self::Database(_) => FaultCode::Internal,
        }
    }
}

/// Stable machine-readable fault codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultCode {
    /// Body is not a decodable SOAP envelope
    MalformedRequest,
    /// Body carries no known operation
    UnsupportedOperation,
    /// No Authorization header
    AuthHeaderMissing,
    /// Authorization header is not Basic user:pass
    AuthHeaderMalformed,
    /// Credentials rejected
    InvalidCredentials,
    InvalidEmail,
    InvalidPhone,
    /// Email already used by another record
    EmailExists,
    NotFound,
    /// Persistence or other server-side failure
    Internal,
}

impl FaultCode {
    /// Get the string code for this fault.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedRequest => "MALFORMED_REQUEST",
            Self::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            Self::AuthHeaderMissing => "AUTH_HEADER_MISSING",
            Self::AuthHeaderMalformed => "AUTH_HEADER_MALFORMED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::InvalidPhone => "INVALID_PHONE",
            Self::EmailExists => "EMAIL_EXISTS",
            Self::NotFound => "NOT_FOUND",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// HTTP status the fault is returned with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedRequest | Self::UnsupportedOperation => StatusCode::BAD_REQUEST,
            Self::AuthHeaderMissing | Self::AuthHeaderMalformed | Self::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Self::InvalidEmail | Self::InvalidPhone | Self::EmailExists => StatusCode::CONFLICT,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the client or the server is at fault.
    pub fn class(&self) -> FaultClass {
        match self {
            Self::Internal => FaultClass::Server,
            _ => FaultClass::Client,
        }
    }

    /// Human-readable fault summary.
    pub fn summary(&self, language: FaultLanguage) -> &'static str {
        match language {
            FaultLanguage::En => match self {
                Self::MalformedRequest => "Invalid request",
                Self::UnsupportedOperation => "Unsupported action",
                Self::AuthHeaderMissing | Self::AuthHeaderMalformed | Self::InvalidCredentials => {
                    "Authentication failed"
                }
                Self::InvalidEmail => "Invalid email",
                Self::InvalidPhone => "Invalid phone number",
                Self::EmailExists => "Record already exists",
                Self::NotFound => "Record not found",
                Self::Internal => "Internal Server Error",
            },
            FaultLanguage::Ru => match self {
                Self::MalformedRequest => "Некорректный запрос",
                Self::UnsupportedOperation => "Неподдерживаемое действие",
                Self::AuthHeaderMissing | Self::AuthHeaderMalformed | Self::InvalidCredentials => {
                    "Неудачная аутентификация"
                }
                Self::InvalidEmail => "Некорректный email",
                Self::InvalidPhone => "Некорректный номер телефона",
                Self::EmailExists => "Запись уже существует",
                Self::NotFound => "Запись не найдена",
                Self::Internal => "Внутренняя ошибка сервера",
            },
        }
    }

    /// Fixed `errorMessage` text, if this code has one in `language`.
    ///
    /// Server faults always do, so their cause never reaches the client.
    pub fn fixed_detail(&self, language: FaultLanguage) -> Option<&'static str> {
        match (language, self) {
            (FaultLanguage::En, Self::Internal) => Some("An unexpected error occurred."),
            (FaultLanguage::En, _) => None,
            (FaultLanguage::Ru, Self::Internal) => Some("Произошла непредвиденная ошибка."),
            (FaultLanguage::Ru, Self::NotFound) => {
                Some("Запрашиваемая запись отсутствует в базе данных.")
            }
            (FaultLanguage::Ru, Self::EmailExists) => Some("Запись с данным email уже существует"),
            (FaultLanguage::Ru, Self::InvalidEmail) => Some("Получен некорректный email"),
            (FaultLanguage::Ru, Self::InvalidPhone) => {
                Some("Получен некорректный номер телефона")
            }
            (FaultLanguage::Ru, Self::InvalidCredentials) => {
                Some("Введен некорректный логин или пароль")
            }
            (FaultLanguage::Ru, _) => None,
        }
    }
}

/// SOAP fault classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    Client,
    Server,
}

impl FaultClass {
    /// Value of the `faultcode` element.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "soap:Client",
            Self::Server => "soap:Server",
        }
    }
}

/// A fault ready to be serialized into a response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub class: FaultClass,
    /// Goes to `faultstring`
    pub message: String,
    pub code: FaultCode,
    /// Goes to `detail/errorMessage`
    pub detail: String,
}

impl Fault {
    /// Create a new fault with an English summary.
    pub fn new(code: FaultCode, detail: impl Into<String>) -> Self {
        Self {
            class: code.class(),
            message: code.summary(FaultLanguage::En).to_string(),
            code,
            detail: detail.into(),
        }
    }

    /// Fault for `err` with texts in `language`.
    pub fn localized(err: &ServiceError, language: FaultLanguage) -> Self {
        let code = err.code();
        let detail = code
            .fixed_detail(language)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());

        Self {
            class: code.class(),
            message: code.summary(language).to_string(),
            code,
            detail,
        }
    }
}

impl From<&ServiceError> for Fault {
    fn from(err: &ServiceError) -> Self {
        Fault::localized(err, FaultLanguage::En)
    }
}

/// Generate a SOAP Fault envelope for the given version.
pub fn soap_fault_response(fault: &Fault, version: SoapVersion) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="{}">
  <soap:Body>
    <soap:Fault>
      <faultcode>{}</faultcode>
      <faultstring>{}</faultstring>
      <detail>
        <errorCode>{}</errorCode>
        <errorMessage>{}</errorMessage>
      </detail>
    </soap:Fault>
  </soap:Body>
</soap:Envelope>"#,
        version.namespace(),
        fault.class.as_str(),
        xml_escape(&fault.message),
        fault.code.as_str(),
        xml_escape(&fault.detail)
    )
}

pub(crate) fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_code_as_str() {
        assert_eq!(FaultCode::EmailExists.as_str(), "EMAIL_EXISTS");
        assert_eq!(FaultCode::NotFound.as_str(), "NOT_FOUND");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ServiceError::MalformedRequest("x".into()).code().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::UnsupportedOperation("x".into()).code().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ServiceError::AuthHeaderMissing.code().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ServiceError::InvalidCredentials.code().status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ServiceError::InvalidPhone("8".into()).code().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::EmailExists("a@b.c".into()).code().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ServiceError::NotFound.code().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServiceError::Database(sea_orm::DbErr::Custom("boom".into()))
                .code()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_server_fault_hides_cause() {
        let err = ServiceError::Database(sea_orm::DbErr::Custom("password=secret".into()));
        let fault = Fault::from(&err);
        assert_eq!(fault.class, FaultClass::Server);
        assert!(!fault.detail.contains("secret"));
    }

    #[test]
    fn test_russian_fault_texts() {
        let fault = Fault::localized(
            &ServiceError::EmailExists("anna@example.com".into()),
            FaultLanguage::Ru,
        );
        assert_eq!(fault.message, "Запись уже существует");
        assert_eq!(fault.detail, "Запись с данным email уже существует");
        assert_eq!(fault.code.as_str(), "EMAIL_EXISTS");

        // No fixed Russian detail: the error text is kept
        let fault = Fault::localized(
            &ServiceError::UnsupportedOperation("FlyToMoon".into()),
            FaultLanguage::Ru,
        );
        assert_eq!(fault.message, "Неподдерживаемое действие");
        assert!(fault.detail.contains("FlyToMoon"));

        let err = ServiceError::Database(sea_orm::DbErr::Custom("password=secret".into()));
        let fault = Fault::localized(&err, FaultLanguage::Ru);
        assert_eq!(fault.class, FaultClass::Server);
        assert!(!fault.detail.contains("secret"));
    }

    #[test]
    fn test_soap_12_fault() {
        let fault = Fault::from(&ServiceError::NotFound);
        let body = soap_fault_response(&fault, SoapVersion::Soap12);
        assert!(body.contains("http://www.w3.org/2003/05/soap-envelope"));
        assert!(body.contains("<faultcode>soap:Client</faultcode>"));
        assert!(body.contains("<errorCode>NOT_FOUND</errorCode>"));
    }

    #[test]
    fn test_soap_11_fault_escapes_detail() {
        let fault = Fault::from(&ServiceError::InvalidEmail("<a&b>".into()));
        let body = soap_fault_response(&fault, SoapVersion::Soap11);
        assert!(body.contains("http://schemas.xmlsoap.org/soap/envelope/"));
        assert!(body.contains("&lt;a&amp;b&gt;"));
    }
}
