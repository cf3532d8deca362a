//! Claims extraction and time-window validation.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::config::ValidatorRegistry;
use crate::error::{ErrorCode, Result, ValidationError};
use crate::router::JsonObject;

/// Claims of a token that passed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Claims {
    subject: Option<String>,
    issuer: Option<String>,
    audience: Vec<String>,
    expires_at: Option<DateTime<Utc>>,
    not_before: Option<DateTime<Utc>>,
    issued_at: Option<DateTime<Utc>>,
    jwt_id: Option<String>,
    custom: JsonObject,
}

impl Claims {
    /// The `sub` claim.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// The `iss` claim.
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    /// The `aud` claim; a single string becomes a one-element slice.
    #[must_use]
    pub fn audience(&self) -> &[String] {
        &self.audience
    }

    /// The `exp` claim.
    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// The `nbf` claim.
    #[must_use]
    pub const fn not_before(&self) -> Option<DateTime<Utc>> {
        self.not_before
    }

    /// The `iat` claim.
    #[must_use]
    pub const fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    /// The `jti` claim.
    #[must_use]
    pub fn jwt_id(&self) -> Option<&str> {
        self.jwt_id.as_deref()
    }

    /// Every claim that is not one of the registered ones.
    #[must_use]
    pub const fn custom(&self) -> &JsonObject {
        &self.custom
    }

    /// Look up a custom claim by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.custom.get(name)
    }
}

/// Map a verified payload to [`Claims`] and check it against the registry's
/// time window and required-claim list at instant `now`.
///
/// `now` is truncated to whole seconds, the resolution of JWT timestamps.
///
/// # Errors
///
/// - `Malformed` if a registered claim has the wrong JSON type or a required
///   claim is missing
/// - `Expired` if `now` lies outside `[nbf - skew, exp + skew]`
pub fn validate_claims(
    mut payload: JsonObject,
    registry: &ValidatorRegistry,
    now: DateTime<Utc>,
) -> Result<Claims> {
    let missing = registry
        .required_claims()
        .iter()
        .find(|name| !payload.contains_key(name.as_str()))
        .cloned();

    let claims = Claims {
        subject: take_string(&mut payload, "sub")?,
        issuer: take_string(&mut payload, "iss")?,
        audience: take_audience(&mut payload)?,
        expires_at: take_timestamp(&mut payload, "exp")?,
        not_before: take_timestamp(&mut payload, "nbf")?,
        issued_at: take_timestamp(&mut payload, "iat")?,
        jwt_id: take_string(&mut payload, "jti")?,
        custom: payload,
    };

    check_window(&claims, registry.clock_skew(), now.trunc_subsecs(0))?;

    if let Some(name) = missing {
        return Err(ValidationError::malformed(format!(
            "required claim missing: {name}"
        )));
    }

    Ok(claims)
}

fn check_window(claims: &Claims, skew: Duration, now: DateTime<Utc>) -> Result<()> {
    if let Some(exp) = claims.expires_at {
        let deadline = exp.checked_add_signed(skew);
        if deadline.is_some_and(|deadline| now > deadline) {
            return Err(ValidationError::new(
                ErrorCode::Expired,
                format!("token expired at {}", exp.to_rfc3339()),
            ));
        }
    }

    if let Some(nbf) = claims.not_before {
        let earliest = nbf.checked_sub_signed(skew);
        if earliest.is_some_and(|earliest| now < earliest) {
            return Err(ValidationError::new(
                ErrorCode::Expired,
                format!("token not valid until {}", nbf.to_rfc3339()),
            ));
        }
    }

    Ok(())
}

fn take_string(payload: &mut JsonObject, name: &str) -> Result<Option<String>> {
    match payload.remove(name) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(invalid_claim(name)),
    }
}

fn take_audience(payload: &mut JsonObject) -> Result<Vec<String>> {
    match payload.remove("aud") {
        None => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![s]),
        Some(Value::Array(values)) => values
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                _ => Err(invalid_claim("aud")),
            })
            .collect(),
        Some(_) => Err(invalid_claim("aud")),
    }
}

fn take_timestamp(payload: &mut JsonObject, name: &str) -> Result<Option<DateTime<Utc>>> {
    let Some(value) = payload.remove(name) else {
        return Ok(None);
    };
    numeric_date(&value)
        .map(Some)
        .ok_or_else(|| invalid_claim(name))
}

/// Interpret a JSON number of seconds since the epoch.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn numeric_date(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(secs) = value.as_i64() {
        return DateTime::from_timestamp(secs, 0);
    }
    let secs = value.as_f64().filter(|f| f.is_finite())?;
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9) as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}

fn invalid_claim(name: &str) -> ValidationError {
    ValidationError::malformed(format!("invalid {name} claim"))
}
