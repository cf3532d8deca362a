//! Algorithm routing and signature verification.
//!
//! The token's own `alg` header only selects *which* configured credential
//! to try. Verification then runs under that credential's method and no
//! other, so a token can never talk the verifier into treating an RSA public
//! key as an HMAC secret or the reverse.

use base64::prelude::*;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Validation};
use serde_json::{Map, Value};

use crate::config::{is_none_algorithm, SigningAlgorithm, SigningCredential, ValidatorRegistry};
use crate::error::{ErrorCode, Result, ValidationError};

/// A decoded JSON object: a token header or payload.
pub type JsonObject = Map<String, Value>;

/// Decode the header segment of a compact token without verifying anything.
///
/// # Errors
///
/// Returns `Malformed` if the token is not three dot-separated segments or
/// the header is not base64url-encoded JSON object.
pub fn decode_header(token: &str) -> Result<JsonObject> {
    let mut segments = token.split('.');
    let (Some(header), Some(_payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(ValidationError::malformed(
            "token must consist of three dot-separated segments",
        ));
    };

    let bytes = BASE64_URL_SAFE_NO_PAD.decode(header).map_err(|e| {
        ValidationError::malformed("token header is not valid base64url").with_source(e)
    })?;

    serde_json::from_slice(&bytes)
        .map_err(|e| ValidationError::malformed("token header is not a JSON object").with_source(e))
}

/// Reject a header that declares critical extensions. None are supported,
/// so any `crit` member makes the token unprocessable.
///
/// # Errors
///
/// Returns `Malformed` if the header carries a `crit` member.
pub fn reject_critical(header: &JsonObject) -> Result<()> {
    if header.contains_key("crit") {
        return Err(ValidationError::malformed(
            "token header declares unsupported critical extensions",
        ));
    }
    Ok(())
}

/// Select the credential for a token's declared algorithm.
///
/// # Errors
///
/// - `Malformed` if `alg` is absent
/// - `MalformedAlgorithmHeader` if `alg` is not a string
/// - `NoneAlgorithm` if `alg` is `none`, `None` or `NONE`
/// - `UnsupportedAlgorithm` if no credential is configured under that
///   exact name; the message lists the configured names
pub fn route<'r>(
    alg: Option<&Value>,
    registry: &'r ValidatorRegistry,
) -> Result<&'r SigningCredential> {
    let alg = match alg {
        None => {
            return Err(ValidationError::malformed(
                "missing algorithm in token header",
            ))
        }
        Some(Value::String(alg)) => alg.as_str(),
        Some(_) => {
            return Err(ValidationError::new(
                ErrorCode::MalformedAlgorithmHeader,
                "algorithm header must be a string",
            ))
        }
    };

    if is_none_algorithm(alg) {
        return Err(ValidationError::new(
            ErrorCode::NoneAlgorithm,
            "none algorithm not allowed",
        ));
    }

    SigningAlgorithm::from_name(alg)
        .and_then(|algorithm| registry.credential(algorithm))
        .ok_or_else(|| {
            ValidationError::new(
                ErrorCode::UnsupportedAlgorithm,
                format!(
                    "algorithm {alg} not supported (available: {})",
                    registry.available_algorithms().join(", ")
                ),
            )
        })
}

/// Verify the token's signature under `credential` and return its payload.
///
/// Time-based and registered-claim checks are left to
/// [`crate::claims::validate_claims`]; only the signature and the structure
/// needed to check it are examined here.
///
/// # Errors
///
/// Returns `InvalidSignature` if the signature does not verify or the
/// library used a method other than the credential's, and `Malformed` if the
/// token cannot be decoded.
pub fn verify(token: &str, credential: &SigningCredential) -> Result<JsonObject> {
    let expected = credential.algorithm().jwt_algorithm();

    let mut validation = Validation::new(expected);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data =
        decode::<JsonObject>(token, &credential.decoding_key(), &validation).map_err(classify)?;

    if data.header.alg != expected {
        return Err(ValidationError::new(
            ErrorCode::InvalidSignature,
            format!(
                "algorithm confusion detected: token method {:?}, expected {expected:?}",
                data.header.alg
            ),
        ));
    }

    Ok(data.claims)
}

fn classify(err: jsonwebtoken::errors::Error) -> ValidationError {
    let (code, message) = match err.kind() {
        ErrorKind::InvalidSignature => (ErrorCode::InvalidSignature, "invalid signature"),
        ErrorKind::InvalidAlgorithm => (
            ErrorCode::InvalidSignature,
            "token signing method does not match the configured credential",
        ),
        ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
            (ErrorCode::InvalidSignature, "signature verification failed")
        }
        _ => (ErrorCode::Malformed, "malformed token"),
    };
    ValidationError::new(code, message).with_source(err)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const SECRET: &[u8; 32] = b"0123456789abcdef0123456789abcdef";

    fn hs256_registry() -> ValidatorRegistry {
        ValidatorRegistry::builder()
            .with_symmetric_algorithm(SECRET.to_vec())
            .build()
            .unwrap()
    }

    fn encode_segment(value: &Value) -> String {
        BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
    }

    #[test]
    fn routes_configured_algorithm() {
        let registry = hs256_registry();
        let credential = route(Some(&json!("HS256")), &registry).unwrap();
        assert_eq!(credential.algorithm(), SigningAlgorithm::Hs256);
    }

    #[test]
    fn missing_alg_is_malformed() {
        let err = route(None, &hs256_registry()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Malformed);
        assert_eq!(err.message(), "missing algorithm in token header");
    }

    #[test]
    fn non_string_alg_is_malformed_header() {
        let registry = hs256_registry();
        for alg in [
            json!(256),
            json!(null),
            json!(["HS256"]),
            json!({"alg": "HS256"}),
            json!(true),
        ] {
            let err = route(Some(&alg), &registry).unwrap_err();
            assert_eq!(err.code(), ErrorCode::MalformedAlgorithmHeader);
            assert_eq!(err.message(), "algorithm header must be a string");
        }
    }

    #[test]
    fn none_spellings_rejected_before_lookup() {
        let registry = hs256_registry();
        for alg in ["none", "None", "NONE"] {
            let err = route(Some(&json!(alg)), &registry).unwrap_err();
            assert_eq!(err.code(), ErrorCode::NoneAlgorithm);
        }
    }

    #[test]
    fn other_none_casings_are_unsupported() {
        let err = route(Some(&json!("nOnE")), &hs256_registry()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedAlgorithm);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let err = route(Some(&json!("hs256")), &hs256_registry()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedAlgorithm);
        assert_eq!(
            err.message(),
            "algorithm hs256 not supported (available: HS256)"
        );
    }

    #[test]
    fn unconfigured_algorithm_lists_available() {
        let err = route(Some(&json!("RS256")), &hs256_registry()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedAlgorithm);
        assert_eq!(
            err.message(),
            "algorithm RS256 not supported (available: HS256)"
        );
    }

    #[test]
    fn decode_header_reads_alg() {
        let token = format!(
            "{}.{}.sig",
            encode_segment(&json!({"alg": "HS256", "typ": "JWT"})),
            encode_segment(&json!({"sub": "alice"}))
        );
        let header = decode_header(&token).unwrap();
        assert_eq!(header.get("alg"), Some(&json!("HS256")));
    }

    #[test]
    fn decode_header_allows_empty_signature() {
        let token = format!(
            "{}.{}.",
            encode_segment(&json!({"alg": "none"})),
            encode_segment(&json!({}))
        );
        let header = decode_header(&token).unwrap();
        assert_eq!(header.get("alg"), Some(&json!("none")));
    }

    #[test]
    fn decode_header_rejects_wrong_segment_count() {
        for token in ["", "abc", "a.b", "a.b.c.d"] {
            let err = decode_header(token).unwrap_err();
            assert_eq!(err.code(), ErrorCode::Malformed, "token = {token:?}");
        }
    }

    #[test]
    fn decode_header_rejects_bad_base64() {
        let err = decode_header("!!!.e30.sig").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Malformed);
    }

    #[test]
    fn decode_header_rejects_non_object() {
        let token = format!("{}.e30.sig", encode_segment(&json!(["HS256"])));
        let err = decode_header(&token).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Malformed);
    }

    #[test]
    fn critical_extensions_rejected() {
        for crit in [json!(["exp"]), json!([]), json!("b64")] {
            let header = json!({"alg": "HS256", "crit": crit});
            let Value::Object(header) = header else {
                unreachable!()
            };
            let err = reject_critical(&header).unwrap_err();
            assert_eq!(err.code(), ErrorCode::Malformed);
        }

        let token = format!("{}.e30.sig", encode_segment(&json!({"alg": "HS256"})));
        let header = decode_header(&token).unwrap();
        assert!(reject_critical(&header).is_ok());
    }

    #[test]
    fn verify_rejects_forged_signature() {
        let registry = hs256_registry();
        let credential = registry.credential(SigningAlgorithm::Hs256).unwrap();
        let token = format!(
            "{}.{}.{}",
            encode_segment(&json!({"alg": "HS256"})),
            encode_segment(&json!({"sub": "mallory"})),
            BASE64_URL_SAFE_NO_PAD.encode([0u8; 32])
        );
        let err = verify(&token, credential).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidSignature);
    }
}
