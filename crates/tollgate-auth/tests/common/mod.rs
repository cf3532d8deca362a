//! Shared helpers for integration tests: fixed keys, token minting, and
//! hand-crafted tokens for attack scenarios.

#![allow(dead_code)]

use base64::prelude::*;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use tollgate_auth::{RsaPublicKey, ValidatorRegistry};

/// 32-byte HS256 secret the registries are configured with.
pub const SECRET: &[u8; 32] = b"tollgate-test-secret-0123456789!";

/// A different 32-byte secret an attacker might sign with.
pub const OTHER_SECRET: &[u8; 32] = b"attacker-secret-abcdefghijklmnop";

pub const RSA_PRIVATE_PEM: &str = include_str!("../fixtures/rsa_private.pem");
pub const RSA_PUBLIC_PEM: &str = include_str!("../fixtures/rsa_public.pem");
pub const RSA_PUBLIC_PKCS1_PEM: &str = include_str!("../fixtures/rsa_public_pkcs1.pem");
pub const RSA_PUBLIC_MODULUS: &str = include_str!("../fixtures/rsa_public_n.txt");
pub const RSA_PUBLIC_EXPONENT: &str = "AQAB";
pub const RSA_OTHER_PRIVATE_PEM: &str = include_str!("../fixtures/rsa_other_private.pem");
pub const RSA_OTHER_PUBLIC_PEM: &str = include_str!("../fixtures/rsa_other_public.pem");

pub fn rsa_public_key() -> RsaPublicKey {
    RsaPublicKey::from_pem(RSA_PUBLIC_PEM.as_bytes()).expect("fixture public key")
}

pub fn hs256_registry() -> ValidatorRegistry {
    ValidatorRegistry::builder()
        .with_symmetric_algorithm(SECRET.to_vec())
        .build()
        .expect("HS256 registry")
}

pub fn rs256_registry() -> ValidatorRegistry {
    ValidatorRegistry::builder()
        .with_asymmetric_algorithm(rsa_public_key())
        .build()
        .expect("RS256 registry")
}

pub fn dual_registry() -> ValidatorRegistry {
    ValidatorRegistry::builder()
        .with_symmetric_algorithm(SECRET.to_vec())
        .with_asymmetric_algorithm(rsa_public_key())
        .build()
        .expect("dual registry")
}

/// Claims for `sub` expiring one hour after `now`.
pub fn claims_for(sub: &str, now: DateTime<Utc>) -> Value {
    json!({
        "sub": sub,
        "iat": now.timestamp(),
        "exp": now.timestamp() + 3600,
    })
}

pub fn mint_hs256(secret: &[u8], claims: &Value) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret),
    )
    .expect("encode HS256 token")
}

pub fn mint_rs256(private_pem: &str, claims: &Value) -> String {
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("fixture private key");
    jsonwebtoken::encode(&Header::new(Algorithm::RS256), claims, &key).expect("encode RS256 token")
}

pub fn segment(value: &Value) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).expect("serialize segment"))
}

/// Assemble a token from arbitrary header/payload JSON and a raw signature
/// segment. Nothing is signed.
pub fn craft(header: &Value, payload: &Value, signature: &str) -> String {
    format!("{}.{}.{signature}", segment(header), segment(payload))
}

/// Sign arbitrary header/payload JSON with HMAC-SHA256 under `secret`,
/// whatever `alg` the header claims.
pub fn forge_hs256(header: &Value, payload: &Value, secret: &[u8]) -> String {
    let message = format!("{}.{}", segment(header), segment(payload));
    let signature = jsonwebtoken::crypto::sign(
        message.as_bytes(),
        &EncodingKey::from_secret(secret),
        Algorithm::HS256,
    )
    .expect("sign forged token");
    format!("{message}.{signature}")
}

/// Sign arbitrary header/payload JSON with RSA-SHA256, whatever `alg` the
/// header claims.
pub fn forge_rs256(header: &Value, payload: &Value, private_pem: &str) -> String {
    let message = format!("{}.{}", segment(header), segment(payload));
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("fixture private key");
    let signature = jsonwebtoken::crypto::sign(message.as_bytes(), &key, Algorithm::RS256)
        .expect("sign forged token");
    format!("{message}.{signature}")
}
