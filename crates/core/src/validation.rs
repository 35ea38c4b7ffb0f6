//! Client-side validation of request payloads
//!
//! Payloads are checked before they are dispatched so that a missing field is
//! reported inline instead of costing a round trip to the backend.

use crate::types::{CreateUserRequest, LoginRequest, RegisterRequest, UpdateUserRequest};
use thiserror::Error;

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },
}

/// Trait for payloads that can be checked before dispatch
pub trait Validate {
    /// Returns Ok(()) if the payload may be sent, or the first problem found
    fn validate(&self) -> Result<(), ValidationError>;
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required(field))
    } else {
        Ok(())
    }
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        require("Email", &self.email)?;
        require("Password", &self.password)
    }
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        require("Email", &self.email)?;
        require("Password", &self.password)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::TooShort {
                field: "Password",
                min: MIN_PASSWORD_LEN,
            });
        }
        Ok(())
    }
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        require("Email", &self.email)?;
        // Passwords are not trimmed, so only reject a truly empty one.
        if self.password.is_empty() {
            return Err(ValidationError::Required("Password"));
        }
        Ok(())
    }
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(email) = &self.email {
            require("Email", email)?;
        }
        Ok(())
    }
}
