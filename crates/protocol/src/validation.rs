//! Command validation utilities

use crate::command::{Command, DESTINATION_FIELD, MESSAGE_FIELD};
use thiserror::Error;

/// Validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Command expired at {expires_at} (now {now})")]
    Expired { expires_at: i64, now: i64 },

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Accept iff `expires_at >= now`
pub fn check_freshness(expires_at: i64, now: i64) -> Result<(), ValidationError> {
    if expires_at < now {
        return Err(ValidationError::Expired { expires_at, now });
    }
    Ok(())
}

/// Deployment-specific rules for destination and message fields
pub trait FieldValidator: Send + Sync {
    fn check_destination(&self, destination: &str) -> Result<(), ValidationError>;

    fn check_message(&self, message: &str) -> Result<(), ValidationError>;
}

/// Accepts any non-empty destination and message
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissiveValidator;

impl FieldValidator for PermissiveValidator {
    fn check_destination(&self, destination: &str) -> Result<(), ValidationError> {
        require_non_empty(DESTINATION_FIELD, destination)
    }

    fn check_message(&self, message: &str) -> Result<(), ValidationError> {
        require_non_empty(MESSAGE_FIELD, message)
    }
}

/// Run both field checks of `validator` against `command`
pub fn validate_fields(
    validator: &dyn FieldValidator,
    command: &Command,
) -> Result<(), ValidationError> {
    validator.check_destination(&command.destination)?;
    validator.check_message(&command.message)
}

fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::InvalidField {
            field,
            reason: "empty".to_string(),
        });
    }
    Ok(())
}
