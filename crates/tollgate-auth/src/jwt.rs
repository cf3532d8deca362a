//! Token validation pipeline.
//!
//! A validation attempt moves strictly forward through the [`Stage`]s:
//!
//! ```text
//! Start ─▶ TokenExtracted ─▶ AlgorithmRouted ─▶ SignatureVerified ─▶ ClaimsValidated ─▶ Success
//!   │            │                  │                   │
//!   └────────────┴──────────────────┴───────────────────┴──▶ Failed(code)
//! ```
//!
//! The first failure ends the attempt. Either way exactly one
//! [`SecurityEvent`] is recorded and handed to the registry's audit sink.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tollgate_core::RequestId;

use crate::audit::{deliver, SecurityEvent, MALFORMED_ALGORITHM};
use crate::claims::{validate_claims, Claims};
use crate::config::ValidatorRegistry;
use crate::error::{ErrorCode, Result, ValidationError};
use crate::router::{decode_header, reject_critical, route, verify};

/// Progress of a validation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Nothing checked yet.
    Start,
    /// A non-empty token string is present.
    TokenExtracted,
    /// A configured credential was selected for the token's `alg`.
    AlgorithmRouted,
    /// The signature verified under that credential.
    SignatureVerified,
    /// Time window and required claims passed.
    ClaimsValidated,
    /// The token was accepted.
    Success,
}

/// Result of one validation attempt plus its security event.
#[derive(Debug)]
pub struct ValidationOutcome {
    /// The accepted claims or the rejection.
    pub result: Result<Claims>,
    /// The audit record of this attempt.
    pub event: SecurityEvent,
    /// The last stage reached. On failure, the stage the attempt failed
    /// out of.
    pub stage: Stage,
}

impl ValidationOutcome {
    /// Returns `true` if the token was accepted.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Split into the result and the event.
    pub fn into_parts(self) -> (Result<Claims>, SecurityEvent) {
        (self.result, self.event)
    }
}

/// Trait for validating bearer tokens.
pub trait JwtValidator: Send + Sync {
    /// Validate `token`, correlating the attempt with `request_id`.
    fn validate_with_request_id(&self, token: &str, request_id: RequestId) -> ValidationOutcome;

    /// Validate `token` under a freshly generated request id.
    fn validate(&self, token: &str) -> ValidationOutcome {
        self.validate_with_request_id(token, RequestId::generate())
    }
}

impl JwtValidator for ValidatorRegistry {
    fn validate_with_request_id(&self, token: &str, request_id: RequestId) -> ValidationOutcome {
        validate_at(self, token, request_id, Utc::now())
    }
}

/// Validate `token` against `registry` as if the current time were `now`.
pub fn validate_at(
    registry: &ValidatorRegistry,
    token: &str,
    request_id: RequestId,
    now: DateTime<Utc>,
) -> ValidationOutcome {
    let started = Instant::now();
    let mut attempt = Attempt {
        stage: Stage::Start,
        algorithm: None,
    };

    let result = attempt.run(registry, token, now);
    let latency = started.elapsed();
    let algorithm = attempt.algorithm.as_deref().unwrap_or(MALFORMED_ALGORITHM);

    let event = match &result {
        Ok(claims) => {
            attempt.stage = Stage::Success;
            SecurityEvent::success(request_id, token, algorithm, claims, latency)
        }
        Err(err) => {
            tracing::debug!(
                request_id = %request_id,
                stage = ?attempt.stage,
                code = %err.code(),
                "Token rejected"
            );
            SecurityEvent::failure(request_id, token, algorithm, err, latency)
        }
    };

    deliver(registry.audit_sink().map(|sink| &**sink), &event);

    ValidationOutcome {
        result,
        event,
        stage: attempt.stage,
    }
}

struct Attempt {
    stage: Stage,
    algorithm: Option<String>,
}

impl Attempt {
    fn run(
        &mut self,
        registry: &ValidatorRegistry,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Claims> {
        if token.is_empty() {
            return Err(ValidationError::new(
                ErrorCode::MissingToken,
                "token is empty",
            ));
        }
        self.stage = Stage::TokenExtracted;

        let header = decode_header(token)?;
        let alg = header.get("alg");
        if let Some(Value::String(name)) = alg {
            self.algorithm = Some(name.clone());
        }
        reject_critical(&header)?;

        let credential = route(alg, registry)?;
        self.stage = Stage::AlgorithmRouted;

        let payload = verify(token, credential)?;
        self.stage = Stage::SignatureVerified;

        let claims = validate_claims(payload, registry, now)?;
        self.stage = Stage::ClaimsValidated;

        Ok(claims)
    }
}
