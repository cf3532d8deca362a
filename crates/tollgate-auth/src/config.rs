//! Validator registry configuration.
//!
//! A [`ValidatorRegistry`] is the single source of truth for which
//! algorithms and keys are accepted. It is assembled with a
//! [`RegistryBuilder`], checked once in [`RegistryBuilder::build`], and never
//! mutated afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;

use crate::audit::AuditSink;
use crate::error::{Result, ValidationError};

/// Minimum HS256 secret length in bytes (256 bits).
pub const MIN_HMAC_SECRET_BYTES: usize = 32;

/// Default clock-skew tolerance in seconds.
pub const DEFAULT_CLOCK_SKEW_SECONDS: i64 = 60;

/// The spellings of the unsigned `none` algorithm that are always rejected.
pub const NONE_ALGORITHM_NAMES: [&str; 3] = ["none", "None", "NONE"];

/// Returns `true` if `name` is exactly one of [`NONE_ALGORITHM_NAMES`].
#[must_use]
pub fn is_none_algorithm(name: &str) -> bool {
    NONE_ALGORITHM_NAMES.contains(&name)
}

/// A signing algorithm the registry can be configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SigningAlgorithm {
    /// HMAC with SHA-256.
    Hs256,
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    Rs256,
}

impl SigningAlgorithm {
    /// The JOSE name of the algorithm, as it appears in a token's `alg` header.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hs256 => "HS256",
            Self::Rs256 => "RS256",
        }
    }

    /// Look up an algorithm by its exact JOSE name. No case folding.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "HS256" => Some(Self::Hs256),
            "RS256" => Some(Self::Rs256),
            _ => None,
        }
    }

    pub(crate) const fn jwt_algorithm(self) -> Algorithm {
        match self {
            Self::Hs256 => Algorithm::HS256,
            Self::Rs256 => Algorithm::RS256,
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared secret for HS256.
#[derive(Clone)]
pub struct HmacSecret(Vec<u8>);

impl HmacSecret {
    /// Wrap raw secret bytes. Length is checked when the registry is built.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }

    /// Length of the secret in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the secret is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(&self.0)
    }
}

impl fmt::Debug for HmacSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HmacSecret([REDACTED; {} bytes])", self.0.len())
    }
}

/// RSA public key for RS256.
#[derive(Clone)]
pub struct RsaPublicKey {
    key: DecodingKey,
}

impl RsaPublicKey {
    /// Parse an RSA public key from PEM.
    ///
    /// Accepts both PKIX (`BEGIN PUBLIC KEY`) and PKCS#1
    /// (`BEGIN RSA PUBLIC KEY`) encodings.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the input is empty or is not an RSA public
    /// key.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        if pem.iter().all(u8::is_ascii_whitespace) {
            return Err(ValidationError::config("RS256 public key cannot be empty"));
        }
        let key = DecodingKey::from_rsa_pem(pem).map_err(|e| {
            ValidationError::config("failed to parse RS256 public key from PEM").with_source(e)
        })?;
        Ok(Self { key })
    }

    /// Build an RSA public key from base64url-encoded modulus and exponent,
    /// the `n` and `e` members of a JWK.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if either component is empty or not valid
    /// base64url.
    pub fn from_components(modulus: &str, exponent: &str) -> Result<Self> {
        if modulus.is_empty() || exponent.is_empty() {
            return Err(ValidationError::config(
                "RS256 public key modulus and exponent cannot be empty",
            ));
        }
        let key = DecodingKey::from_rsa_components(modulus, exponent).map_err(|e| {
            ValidationError::config("invalid RS256 public key components").with_source(e)
        })?;
        Ok(Self { key })
    }
}

impl fmt::Debug for RsaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RsaPublicKey(..)")
    }
}

/// Key material paired with the only method it may be verified with.
#[derive(Debug, Clone)]
pub enum SigningCredential {
    /// HMAC-SHA256 shared secret.
    Hs256(HmacSecret),
    /// RSA-SHA256 public key.
    Rs256(RsaPublicKey),
}

impl SigningCredential {
    /// The algorithm this credential verifies.
    #[must_use]
    pub const fn algorithm(&self) -> SigningAlgorithm {
        match self {
            Self::Hs256(_) => SigningAlgorithm::Hs256,
            Self::Rs256(_) => SigningAlgorithm::Rs256,
        }
    }

    pub(crate) fn decoding_key(&self) -> DecodingKey {
        match self {
            Self::Hs256(secret) => secret.decoding_key(),
            Self::Rs256(public_key) => public_key.key.clone(),
        }
    }

    fn check(&self) -> Result<()> {
        match self {
            Self::Hs256(secret) if secret.len() < MIN_HMAC_SECRET_BYTES => {
                Err(ValidationError::config(format!(
                    "HS256 secret must be at least {MIN_HMAC_SECRET_BYTES} bytes (256 bits), got {} bytes",
                    secret.len()
                )))
            }
            Self::Hs256(_) | Self::Rs256(_) => Ok(()),
        }
    }
}

/// Scalar registry options loadable from a configuration file.
///
/// Holds no key material; credentials are added to the builder directly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthSettings {
    /// Clock-skew tolerance for `exp`/`nbf`, in seconds.
    #[serde(default = "AuthSettings::default_clock_skew")]
    pub clock_skew_seconds: i64,

    /// Cookie to fall back to when no `Authorization` header is present.
    #[serde(default)]
    pub cookie_name: Option<String>,

    /// Claims that must be present in every accepted token.
    #[serde(default)]
    pub required_claims: Vec<String>,
}

impl AuthSettings {
    const fn default_clock_skew() -> i64 {
        DEFAULT_CLOCK_SKEW_SECONDS
    }

    /// Get the clock skew as a `Duration`. Out-of-range values saturate.
    #[must_use]
    pub fn clock_skew(&self) -> Duration {
        Duration::try_seconds(self.clock_skew_seconds).unwrap_or(if self.clock_skew_seconds < 0 {
            Duration::MIN
        } else {
            Duration::MAX
        })
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            clock_skew_seconds: Self::default_clock_skew(),
            cookie_name: None,
            required_claims: Vec::new(),
        }
    }
}

/// Accumulates registry options. Nothing is checked until [`build`](Self::build).
pub struct RegistryBuilder {
    credentials: BTreeMap<SigningAlgorithm, SigningCredential>,
    clock_skew: Duration,
    cookie_name: Option<String>,
    required_claims: Vec<String>,
    audit_sink: Option<Arc<dyn AuditSink>>,
}

impl RegistryBuilder {
    /// Create an empty builder with the default clock skew.
    #[must_use]
    pub fn new() -> Self {
        Self {
            credentials: BTreeMap::new(),
            clock_skew: Duration::seconds(DEFAULT_CLOCK_SKEW_SECONDS),
            cookie_name: None,
            required_claims: Vec::new(),
            audit_sink: None,
        }
    }

    /// Add a credential. A later credential for the same algorithm replaces
    /// the earlier one.
    #[must_use]
    pub fn with_credential(mut self, credential: SigningCredential) -> Self {
        self.credentials.insert(credential.algorithm(), credential);
        self
    }

    /// Accept HS256 tokens signed with `secret`.
    #[must_use]
    pub fn with_symmetric_algorithm(self, secret: impl Into<Vec<u8>>) -> Self {
        self.with_credential(SigningCredential::Hs256(HmacSecret::new(secret)))
    }

    /// Accept RS256 tokens verifiable with `public_key`.
    #[must_use]
    pub fn with_asymmetric_algorithm(self, public_key: RsaPublicKey) -> Self {
        self.with_credential(SigningCredential::Rs256(public_key))
    }

    /// Set the clock-skew tolerance applied to `exp` and `nbf`.
    #[must_use]
    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Name the cookie the extraction layer may read the token from. An
    /// empty name disables cookie extraction.
    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.cookie_name = (!name.is_empty()).then_some(name);
        self
    }

    /// Require the named claims to be present. Repeated calls accumulate.
    #[must_use]
    pub fn with_required_claims<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names.into_iter().map(Into::into);
        self.required_claims.extend(names);
        self
    }

    /// Deliver a [`SecurityEvent`](crate::audit::SecurityEvent) for every
    /// validation attempt to `sink`.
    #[must_use]
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit_sink = Some(sink);
        self
    }

    /// Apply scalar options from loaded settings.
    #[must_use]
    pub fn with_settings(self, settings: &AuthSettings) -> Self {
        let builder = self
            .with_clock_skew(settings.clock_skew())
            .with_required_claims(settings.required_claims.iter().cloned());
        match &settings.cookie_name {
            Some(name) => builder.with_cookie_name(name.clone()),
            None => builder,
        }
    }

    /// Check every invariant and produce the immutable registry.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if no algorithm is configured, if an
    /// algorithm is named `none`, if a credential is unusable (an HS256
    /// secret shorter than 32 bytes), or if the clock skew is negative.
    pub fn build(self) -> Result<ValidatorRegistry> {
        if self.credentials.is_empty() {
            return Err(ValidationError::config(
                "at least one algorithm must be configured",
            ));
        }

        let mut names = self.credentials.keys().map(|alg| alg.as_str());
        if names.any(is_none_algorithm) {
            return Err(ValidationError::config("none algorithm is prohibited"));
        }

        for credential in self.credentials.values() {
            credential.check()?;
        }

        if self.clock_skew < Duration::zero() {
            return Err(ValidationError::config(format!(
                "clock skew must be non-negative, got {}s",
                self.clock_skew.num_seconds()
            )));
        }

        tracing::debug!(
            algorithms = ?self.credentials.keys().map(|a| a.as_str()).collect::<Vec<_>>(),
            clock_skew_secs = self.clock_skew.num_seconds(),
            required_claims = self.required_claims.len(),
            "Validator registry built"
        );

        Ok(ValidatorRegistry {
            credentials: self.credentials,
            clock_skew: self.clock_skew,
            cookie_name: self.cookie_name,
            required_claims: self.required_claims,
            audit_sink: self.audit_sink,
        })
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable set of accepted algorithms and the options that govern
/// validation. Share it by reference or behind an `Arc`.
pub struct ValidatorRegistry {
    credentials: BTreeMap<SigningAlgorithm, SigningCredential>,
    clock_skew: Duration,
    cookie_name: Option<String>,
    required_claims: Vec<String>,
    audit_sink: Option<Arc<dyn AuditSink>>,
}

impl ValidatorRegistry {
    /// Start building a registry.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// The credential configured for `algorithm`, if any.
    #[must_use]
    pub fn credential(&self, algorithm: SigningAlgorithm) -> Option<&SigningCredential> {
        self.credentials.get(&algorithm)
    }

    /// Configured algorithm names in sorted order.
    #[must_use]
    pub fn available_algorithms(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.credentials.keys().map(|alg| alg.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Clock-skew tolerance.
    #[must_use]
    pub const fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Cookie name for the extraction layer, if configured.
    #[must_use]
    pub fn cookie_name(&self) -> Option<&str> {
        self.cookie_name.as_deref()
    }

    /// Claims every token must carry.
    #[must_use]
    pub fn required_claims(&self) -> &[String] {
        &self.required_claims
    }

    /// The configured audit sink.
    #[must_use]
    pub fn audit_sink(&self) -> Option<&Arc<dyn AuditSink>> {
        self.audit_sink.as_ref()
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("credentials", &self.credentials.keys().collect::<Vec<_>>())
            .field("clock_skew", &self.clock_skew)
            .field("cookie_name", &self.cookie_name)
            .field("required_claims", &self.required_claims)
            .field("audit_sink", &self.audit_sink.is_some())
            .finish()
    }
}
