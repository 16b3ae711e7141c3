//! Command payload carried inside a request token

use crate::form::{self, FormError};
use crate::frame::RelayFrame;
use std::num::ParseIntError;
use thiserror::Error;
use url::form_urlencoded;

/// Expiry field (seconds since Unix epoch)
pub const EXPIRY_FIELD: &str = "valid";

/// Destination phone number field
pub const DESTINATION_FIELD: &str = "sendNumber";

/// Message text field
pub const MESSAGE_FIELD: &str = "sendMsg";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Malformed payload: {0}")]
    Parse(#[from] FormError),

    #[error("Field {0} is not valid UTF-8")]
    NotUtf8(&'static str),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid {field} value {value:?}: {source}")]
    InvalidFormat {
        field: &'static str,
        value: String,
        source: ParseIntError,
    },
}

/// A send-SMS command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Last second (inclusive) at which the command may be accepted
    pub expires_at: i64,

    /// Destination number
    pub destination: String,

    /// Message text
    pub message: String,
}

impl Command {
    pub fn new(
        expires_at: i64,
        destination: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            expires_at,
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Parse a decoded payload
    ///
    /// Fields are checked in order: expiry, destination, message. Unknown
    /// keys are ignored.
    pub fn parse(payload: &[u8]) -> Result<Self, CommandError> {
        let pairs = form::parse(payload)?;

        let valid = field(&pairs, EXPIRY_FIELD)?;
        let expires_at = valid
            .parse::<i64>()
            .map_err(|source| CommandError::InvalidFormat {
                field: EXPIRY_FIELD,
                value: valid.clone(),
                source,
            })?;

        let destination = field(&pairs, DESTINATION_FIELD)?;
        let message = field(&pairs, MESSAGE_FIELD)?;

        Ok(Self {
            expires_at,
            destination,
            message,
        })
    }

    /// Form-encode the command as a client would before sealing it
    pub fn to_payload(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair(EXPIRY_FIELD, &self.expires_at.to_string())
            .append_pair(DESTINATION_FIELD, &self.destination)
            .append_pair(MESSAGE_FIELD, &self.message)
            .finish()
    }

    /// Frame for the downstream device
    pub fn relay_frame(&self) -> RelayFrame {
        RelayFrame::encode(&self.destination, &self.message)
    }
}

fn field(pairs: &[form::Pair], name: &'static str) -> Result<String, CommandError> {
    let raw = form::first(pairs, name).ok_or(CommandError::MissingField(name))?;
    String::from_utf8(raw.to_vec()).map_err(|_| CommandError::NotUtf8(name))
}
