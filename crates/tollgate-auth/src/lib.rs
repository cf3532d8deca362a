//! Bearer token validation for tollgate.
//!
//! This crate decides whether a JWT is signed with one of the explicitly
//! permitted algorithms and still within its validity window, and if not, why:
//!
//! - An immutable [`ValidatorRegistry`] of HS256/RS256 credentials
//! - Algorithm routing that rejects `none` and refuses algorithm confusion
//! - Clock-skew tolerant `exp`/`nbf` checks and required claims
//! - A redacted [`SecurityEvent`] for every attempt
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │   Adapter        │────▶│   JwtValidator   │
//! │   (HTTP/RPC)     │     │   (trait)        │
//! └──────────────────┘     └────────┬─────────┘
//!                                   │
//!                          ┌────────▼─────────┐
//!                          │ ValidatorRegistry│──▶ AuditSink
//!                          └────────┬─────────┘
//!                                   │ route(alg)
//!                          ┌────────▼─────────┐
//!                          │ SigningCredential│
//!                          │  (HS256 | RS256) │
//!                          └────────┬─────────┘
//!                                   │ verify
//!                          ┌────────▼─────────┐
//!                          │  jsonwebtoken    │
//!                          └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use tollgate_auth::{ErrorCode, JwtValidator, ValidatorRegistry};
//!
//! let registry = ValidatorRegistry::builder()
//!     .with_symmetric_algorithm(b"an-hs256-secret-of-at-least-32-bytes".to_vec())
//!     .with_required_claims(["sub"])
//!     .build()?;
//!
//! let outcome = registry.validate("not-a-token");
//! let err = outcome.result.unwrap_err();
//! assert_eq!(err.code(), ErrorCode::Malformed);
//!
//! // What an HTTP adapter sends back
//! let body = serde_json::to_string(&err.response())?;
//! assert_eq!(body, r#"{"error":"unauthorized","reason":"MALFORMED"}"#);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod audit;
pub mod claims;
pub mod config;
pub mod error;
pub mod jwt;
pub mod router;

pub use audit::{AuditSink, EventOutcome, SecurityEvent, TracingAuditSink};
pub use claims::Claims;
pub use config::{
    AuthSettings, HmacSecret, RegistryBuilder, RsaPublicKey, SigningAlgorithm, SigningCredential,
    ValidatorRegistry,
};
pub use error::{ErrorCode, ErrorResponse, Result, ValidationError};
pub use jwt::{JwtValidator, Stage, ValidationOutcome};
pub use tollgate_core::RequestId;
