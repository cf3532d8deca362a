//! Validation error types.
//!
//! Every failure in this crate is reported as a [`ValidationError`] carrying
//! exactly one [`ErrorCode`] from a closed set. The message is safe to log;
//! whether it may also be shown to a remote caller is decided by
//! [`ErrorCode::exposes_message`].

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// A result type using `ValidationError`.
pub type Result<T> = std::result::Result<T, ValidationError>;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The closed set of reasons a token (or a configuration) can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// The token is outside its `exp`/`nbf` validity window.
    Expired,
    /// The signature did not verify under the configured credential.
    InvalidSignature,
    /// No token was presented.
    MissingToken,
    /// The token or one of its claims is structurally invalid.
    Malformed,
    /// The `alg` header is present but is not a string.
    MalformedAlgorithmHeader,
    /// The `alg` header names an algorithm that is not configured.
    UnsupportedAlgorithm,
    /// The `alg` header is one of the `none` spellings.
    NoneAlgorithm,
    /// The validator registry could not be constructed.
    ConfigError,
}

impl ErrorCode {
    /// Returns the wire representation of this code, e.g. `INVALID_SIGNATURE`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expired => "EXPIRED",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::MissingToken => "MISSING_TOKEN",
            Self::Malformed => "MALFORMED",
            Self::MalformedAlgorithmHeader => "MALFORMED_ALGORITHM_HEADER",
            Self::UnsupportedAlgorithm => "UNSUPPORTED_ALGORITHM",
            Self::NoneAlgorithm => "NONE_ALGORITHM",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }

    /// Returns `true` if the error message may be shown to the remote caller.
    ///
    /// Only the algorithm-negotiation failures qualify; algorithm names are
    /// public, everything else stays in local logs.
    #[must_use]
    pub const fn exposes_message(self) -> bool {
        matches!(
            self,
            Self::UnsupportedAlgorithm | Self::MalformedAlgorithmHeader
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed validation or configuration attempt.
#[derive(Debug, Error)]
#[error("[{code}] {message}")]
pub struct ValidationError {
    code: ErrorCode,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ValidationError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a `ConfigError`.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Create a `Malformed` error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Malformed, message)
    }

    /// Attach the lower-level cause. It is reachable through
    /// [`std::error::Error::source`] for local diagnostics only.
    #[must_use]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    /// The error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// The human-readable detail.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self.code {
            ErrorCode::ConfigError => 500,
            ErrorCode::Expired
            | ErrorCode::InvalidSignature
            | ErrorCode::MissingToken
            | ErrorCode::Malformed
            | ErrorCode::MalformedAlgorithmHeader
            | ErrorCode::UnsupportedAlgorithm
            | ErrorCode::NoneAlgorithm => 401,
        }
    }

    /// Build the body an adapter sends back to the remote caller.
    #[must_use]
    pub fn response(&self) -> ErrorResponse {
        ErrorResponse {
            error: "unauthorized",
            reason: self.code,
            message: self
                .code
                .exposes_message()
                .then(|| self.message.clone())
                .filter(|m| !m.is_empty()),
        }
    }
}

/// Error response body for transport adapters.
///
/// Serializes as `{"error": "unauthorized", "reason": "<CODE>"}`, with a
/// `message` field only for codes that allow it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    /// Always `"unauthorized"`.
    pub error: &'static str,
    /// The rejection code.
    pub reason: ErrorCode,
    /// Human-readable detail, present only for algorithm-negotiation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
