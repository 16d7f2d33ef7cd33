//! Client-side JWT inspection
//!
//! The client holds no verification key, so access tokens are decoded
//! without checking the signature. The decoded view is only used to answer
//! "is this token expired" without a network call and for debugging output;
//! the server stays the authority on validity.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SessionError, SessionResult};

/// JWT claims as issued by the auth service.
///
/// Timestamps are accepted as integers or floats since the backend emits
/// fractional `iat` values.
#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    role: Option<Value>,
    #[serde(default)]
    iat: Option<f64>,
    #[serde(default)]
    exp: Option<f64>,
}

/// Read-only projection of an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedToken {
    pub subject: Option<String>,
    pub role: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl DecodedToken {
    /// Whether the token expired strictly before `now`; no expiry means never
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at < now)
    }
}

fn insecure_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

fn claim_as_string(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn timestamp_from_secs(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1_000_000_000.0) as u32;
    Utc.timestamp_opt(whole as i64, nanos).single()
}

/// Decode a token without verifying its signature
pub fn decode_token(token: &str) -> SessionResult<DecodedToken> {
    let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &insecure_validation())
        .map_err(|e| SessionError::Token(e.to_string()))?;
    let claims = data.claims;

    Ok(DecodedToken {
        subject: claim_as_string(claims.sub),
        role: claim_as_string(claims.role),
        issued_at: claims.iat.and_then(timestamp_from_secs),
        expires_at: claims.exp.and_then(timestamp_from_secs),
    })
}

/// Check a token's embedded expiry against the current time.
///
/// Tokens that cannot be decoded, or carry no expiry, count as not expired.
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now())
}

/// [`is_expired`] against an explicit clock
pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    decode_token(token)
        .map(|decoded| decoded.is_expired_at(now))
        .unwrap_or(false)
}
