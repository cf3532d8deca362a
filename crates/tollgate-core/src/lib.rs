//! Core types and utilities for tollgate.
//!
//! This crate provides the foundational types shared across the tollgate
//! workspace:
//!
//! - **Identifiers**: the [`RequestId`] used to correlate a validation
//!   attempt with its security event
//!
//! # Example
//!
//! ```
//! use tollgate_core::RequestId;
//!
//! // Reuse an upstream correlation id
//! let id: RequestId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
//!
//! // Or generate one
//! let fresh = RequestId::generate();
//! assert_ne!(id, fresh);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ids;

pub use ids::{IdError, RequestId};
