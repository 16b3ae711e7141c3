//! Rejection reasons and the uniform not-found response
//!
//! Callers never learn which stage refused a request: every reason renders
//! to the same 404. The detail only goes to the log.

use crate::metrics::METRICS;
use crate::relay::RelayError;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CONTENT_TYPE, HeaderValue, X_CONTENT_TYPE_OPTIONS};
use hyper::{Response, StatusCode};
use smsgate_crypto::{DecodeError, ReplayError};
use smsgate_protocol::{CommandError, ValidationError};
use thiserror::Error;
use tracing::warn;

/// Body of every rejection
pub const NOT_FOUND_BODY: &str = "404 page not found\n";

/// Why a request was refused
#[derive(Error, Debug)]
pub enum RejectionReason {
    #[error("no such route: {0}")]
    UnknownRoute(String),

    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("missing data parameter")]
    MissingData,

    #[error("error decrypting ciphertext: {0}")]
    Decode(#[from] DecodeError),

    #[error("error parsing plaintext into url parameters: {0}")]
    Parse(CommandError),

    #[error("missing {0} parameter")]
    MissingField(&'static str),

    #[error("invalid plaintext: {0}")]
    InvalidFormat(CommandError),

    #[error("wrong parameter: {0}")]
    InvalidField(ValidationError),

    #[error("invalid plaintext: valid until {expires_at} is in the past (now {now})")]
    Expired { expires_at: i64, now: i64 },

    #[error("invalid plaintext: replay ({0})")]
    Replay(#[from] ReplayError),

    #[error("error sending data to device: {0}")]
    RelayWrite(#[from] RelayError),
}

impl RejectionReason {
    /// Pipeline stage that produced the rejection
    pub fn stage(&self) -> &'static str {
        match self {
            Self::UnknownRoute(_) | Self::MethodNotAllowed(_) | Self::MissingData => "request",
            Self::Decode(_) => "decode",
            Self::Parse(_) | Self::MissingField(_) | Self::InvalidFormat(_) => "parse",
            Self::InvalidField(_) => "validate",
            Self::Expired { .. } => "freshness",
            Self::Replay(_) => "replay",
            Self::RelayWrite(_) => "relay",
        }
    }

    /// Short label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnknownRoute(_) => "unknown_route",
            Self::MethodNotAllowed(_) => "method_not_allowed",
            Self::MissingData => "missing_data",
            Self::Decode(_) => "decode",
            Self::Parse(_) => "parse",
            Self::MissingField(_) => "missing_field",
            Self::InvalidFormat(_) => "invalid_format",
            Self::InvalidField(_) => "invalid_field",
            Self::Expired { .. } => "expired",
            Self::Replay(_) => "replay",
            Self::RelayWrite(_) => "relay_write",
        }
    }

    /// Log the reason and render the uniform response
    pub fn into_response(self) -> Response<Full<Bytes>> {
        warn!(stage = self.stage(), reason = self.label(), "Rejected request: {}", self);
        METRICS
            .commands_rejected
            .with_label_values(&[self.label()])
            .inc();
        not_found()
    }
}

impl From<CommandError> for RejectionReason {
    fn from(e: CommandError) -> Self {
        match e {
            CommandError::MissingField(field) => Self::MissingField(field),
            CommandError::InvalidFormat { .. } => Self::InvalidFormat(e),
            CommandError::Parse(_) | CommandError::NotUtf8(_) => Self::Parse(e),
        }
    }
}

impl From<ValidationError> for RejectionReason {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::Expired { expires_at, now } => Self::Expired { expires_at, now },
            ValidationError::InvalidField { .. } => Self::InvalidField(e),
        }
    }
}

/// The only response a rejected caller ever sees
pub fn not_found() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(NOT_FOUND_BODY.as_bytes())));
    *response.status_mut() = StatusCode::NOT_FOUND;
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    response
}

/// Empty 200 for an accepted command
pub fn accepted() -> Response<Full<Bytes>> {
    Response::new(Full::new(Bytes::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use smsgate_protocol::{Command, DESTINATION_FIELD};

    fn all_reasons() -> Vec<RejectionReason> {
        vec![
            RejectionReason::UnknownRoute("/".into()),
            RejectionReason::MethodNotAllowed("POST".into()),
            RejectionReason::MissingData,
            RejectionReason::Decode(DecodeError::CiphertextTooShort(3)),
            Command::parse(b"a=%zz").unwrap_err().into(),
            Command::parse(b"valid=1").unwrap_err().into(),
            Command::parse(b"valid=x").unwrap_err().into(),
            RejectionReason::InvalidField(ValidationError::InvalidField {
                field: DESTINATION_FIELD,
                reason: "empty".into(),
            }),
            RejectionReason::Expired {
                expires_at: 1,
                now: 2,
            },
            RejectionReason::Replay(ReplayError { expires_at: 5 }),
            RejectionReason::RelayWrite(RelayError::Write {
                device: "/dev/null".into(),
                source: std::io::ErrorKind::BrokenPipe.into(),
            }),
        ]
    }

    #[test]
    fn test_command_error_mapping() {
        let reasons = all_reasons();
        assert!(matches!(reasons[4], RejectionReason::Parse(_)));
        assert!(matches!(reasons[5], RejectionReason::MissingField("sendNumber")));
        assert!(matches!(reasons[6], RejectionReason::InvalidFormat(_)));
    }

    #[test]
    fn test_validation_error_mapping() {
        let reason: RejectionReason = ValidationError::Expired {
            expires_at: 9,
            now: 10,
        }
        .into();
        assert!(matches!(
            reason,
            RejectionReason::Expired {
                expires_at: 9,
                now: 10
            }
        ));
    }

    #[test]
    fn test_labels_are_distinct() {
        let mut labels: Vec<_> = all_reasons().iter().map(|r| r.label()).collect();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), all_reasons().len());
    }

    #[tokio::test]
    async fn test_every_reason_renders_identically() {
        for reason in all_reasons() {
            let response = reason.into_response();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(
                response.headers()[CONTENT_TYPE],
                "text/plain; charset=utf-8"
            );
            assert_eq!(response.headers().len(), 2);

            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(body, NOT_FOUND_BODY.as_bytes());
        }
    }
}
