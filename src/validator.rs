//! Field validation for person payloads.

use crate::config::ValidationConfig;
use crate::error::ServiceError;
use crate::model::NewPerson;
use regex::Regex;
use validator::ValidateEmail;

/// Validates email and telephone fields before persistence.
#[derive(Debug, Clone)]
pub struct FieldValidator {
    phone_pattern: Regex,
}

impl FieldValidator {
    /// Create a new validator, compiling the configured phone pattern.
    pub fn new(config: &ValidationConfig) -> Result<Self, regex::Error> {
        Ok(Self {
            phone_pattern: Regex::new(&config.phone_pattern)?,
        })
    }

    /// Validate a person payload. Email is checked first.
    pub fn validate(&self, person: &NewPerson) -> Result<(), ServiceError> {
        if !person.email.validate_email() {
            return Err(ServiceError::InvalidEmail(person.email.clone()));
        }

        if !self.phone_pattern.is_match(&person.telephone) {
            return Err(ServiceError::InvalidPhone(person.telephone.clone()));
        }

        Ok(())
    }
}
