//! Security events for validation attempts.
//!
//! Every call to the validator produces exactly one [`SecurityEvent`],
//! whether the token was accepted or not. The event never carries more than
//! an 8-character prefix of the token and never any key material.
//!
//! Events are handed to an [`AuditSink`]. [`TracingAuditSink`] forwards them
//! to `tracing`; any `Fn(&SecurityEvent)` closure is a sink as well.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use tollgate_core::RequestId;

use crate::claims::Claims;
use crate::error::{ErrorCode, ValidationError};

/// Number of token characters kept in a preview.
pub const TOKEN_PREVIEW_LEN: usize = 8;

/// Preview reported for empty, short, or malformed tokens.
pub const REDACTED_TOKEN: &str = "***";

/// Algorithm reported when the token header cannot be read.
pub const MALFORMED_ALGORITHM: &str = "MALFORMED";

/// Whether a validation attempt succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    /// The token was accepted.
    Success,
    /// The token was rejected.
    Failure,
}

/// Structured audit record of one validation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityEvent {
    #[serde(rename = "event")]
    outcome: EventOutcome,
    timestamp: DateTime<Utc>,
    request_id: RequestId,
    user_id: String,
    algorithm: String,
    #[serde(serialize_with = "serialize_reason")]
    failure_reason: Option<ErrorCode>,
    token: String,
    #[serde(rename = "latency_us", serialize_with = "serialize_micros")]
    latency: Duration,
}

impl SecurityEvent {
    /// Record an accepted token.
    #[must_use]
    pub fn success(
        request_id: RequestId,
        token: &str,
        algorithm: &str,
        claims: &Claims,
        latency: Duration,
    ) -> Self {
        Self {
            outcome: EventOutcome::Success,
            timestamp: Utc::now(),
            request_id,
            user_id: claims.subject().unwrap_or_default().to_string(),
            algorithm: algorithm.to_string(),
            failure_reason: None,
            token: redact_token(token),
            latency,
        }
    }

    /// Record a rejected token.
    #[must_use]
    pub fn failure(
        request_id: RequestId,
        token: &str,
        algorithm: &str,
        error: &ValidationError,
        latency: Duration,
    ) -> Self {
        Self {
            outcome: EventOutcome::Failure,
            timestamp: Utc::now(),
            request_id,
            user_id: String::new(),
            algorithm: algorithm.to_string(),
            failure_reason: Some(error.code()),
            token: redact_token(token),
            latency,
        }
    }

    /// Success or failure.
    #[must_use]
    pub const fn outcome(&self) -> EventOutcome {
        self.outcome
    }

    /// When the event was recorded.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Correlation id of the attempt.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Subject of the accepted token; empty on failure.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Algorithm the token declared, or [`MALFORMED_ALGORITHM`].
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Rejection code; `None` on success.
    #[must_use]
    pub const fn failure_reason(&self) -> Option<ErrorCode> {
        self.failure_reason
    }

    /// Redacted token preview.
    #[must_use]
    pub fn token_preview(&self) -> &str {
        &self.token
    }

    /// Time spent validating.
    #[must_use]
    pub const fn latency(&self) -> Duration {
        self.latency
    }
}

#[allow(clippy::ref_option, clippy::trivially_copy_pass_by_ref)]
fn serialize_reason<S: Serializer>(
    reason: &Option<ErrorCode>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(reason.map_or("", ErrorCode::as_str))
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_micros<S: Serializer>(latency: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u128(latency.as_micros())
}

/// Destination for security events.
///
/// Implementations must not block for long; the validator calls the sink
/// synchronously before returning. A panicking sink is caught and logged.
pub trait AuditSink: Send + Sync {
    /// Accept one event.
    fn record(&self, event: &SecurityEvent);
}

impl<F> AuditSink for F
where
    F: Fn(&SecurityEvent) + Send + Sync,
{
    fn record(&self, event: &SecurityEvent) {
        self(event);
    }
}

/// Audit sink that emits events through `tracing` under the
/// `tollgate::audit` target: successes at `INFO`, failures at `WARN`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &SecurityEvent) {
        let latency_us = u64::try_from(event.latency.as_micros()).unwrap_or(u64::MAX);
        match event.outcome {
            EventOutcome::Success => tracing::info!(
                target: "tollgate::audit",
                event = "success",
                request_id = %event.request_id,
                user_id = %event.user_id,
                algorithm = %event.algorithm,
                token = %event.token,
                latency_us,
                "authentication succeeded"
            ),
            EventOutcome::Failure => tracing::warn!(
                target: "tollgate::audit",
                event = "failure",
                request_id = %event.request_id,
                algorithm = %event.algorithm,
                failure_reason = event.failure_reason.map_or("", ErrorCode::as_str),
                token = %event.token,
                latency_us,
                "authentication failed"
            ),
        }
    }
}

/// Hand `event` to `sink`, if one is configured. Never fails.
pub fn deliver(sink: Option<&dyn AuditSink>, event: &SecurityEvent) {
    let Some(sink) = sink else {
        return;
    };
    if catch_unwind(AssertUnwindSafe(|| sink.record(event))).is_err() {
        tracing::error!(request_id = %event.request_id, "Audit sink panicked");
    }
}

/// Shorten a raw token to a loggable preview.
///
/// Keeps the first [`TOKEN_PREVIEW_LEN`] characters of a three-segment ASCII
/// token; anything else becomes [`REDACTED_TOKEN`].
#[must_use]
pub fn redact_token(token: &str) -> String {
    let well_formed = token.is_ascii() && token.split('.').count() == 3;
    match token.get(..TOKEN_PREVIEW_LEN) {
        Some(prefix) if well_formed && token.len() > TOKEN_PREVIEW_LEN => format!("{prefix}..."),
        _ => REDACTED_TOKEN.to_string(),
    }
}
