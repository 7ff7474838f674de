//! Signed bearer token: `hex(header).hex(payload).hex(hmac)`.
//!
//! Header and payload are JSON (`{"exp": ..}` and `{"username": ..}`); the
//! signature is HMAC-SHA256 over the first two segments joined by `.`.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::claims::{TOKEN_TTL_DAYS, TokenHeader, TokenPayload, check_expiry};

type HmacSha256 = Hmac<Sha256>;

/// Name of the cookie carrying the token.
pub const TOKEN_COOKIE: &str = "jwt-token";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Wrong shape or bad signature.
    #[error("invalid jwt-token")]
    Invalid,

    #[error("jwt-token has expired")]
    Expired,

    /// Correctly signed but undecodable; points at a broken issuer.
    #[error("malformed jwt-token: {0}")]
    Malformed(String),
}

impl TokenError {
    /// Whether the failure is on the server's side rather than the caller's.
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// Issues and verifies tokens with a process-wide secret.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Arc<[u8]>,
    ttl: Duration,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenCodec {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
            ttl: Duration::days(TOKEN_TTL_DAYS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, username: &str) -> Result<String, TokenError> {
        self.issue_at(username, Utc::now())
    }

    pub fn issue_at(&self, username: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let header = encode_segment(&TokenHeader::issued_at(now, self.ttl))?;
        let payload = encode_segment(&TokenPayload {
            username: username.to_owned(),
        })?;
        let signed = format!("{header}.{payload}");
        let signature = hex::encode(self.mac(&signed)?.finalize().into_bytes());
        Ok(format!("{signed}.{signature}"))
    }

    /// Verify a token and return the username it was issued for.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<String, TokenError> {
        let parts: Vec<&str> = token.split('.').collect();
        let [header, payload, signature] = parts.as_slice() else {
            return Err(TokenError::Invalid);
        };

        let signature = hex::decode(signature).map_err(|_| TokenError::Invalid)?;
        self.mac(&format!("{header}.{payload}"))?
            .verify_slice(&signature)
            .map_err(|_| TokenError::Invalid)?;

        let header: TokenHeader = decode_segment(header)?;
        let payload: TokenPayload = decode_segment(payload)?;
        check_expiry(header.expires_at()?, now)?;

        Ok(payload.username)
    }

    fn mac(&self, signed: &str) -> Result<HmacSha256, TokenError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| TokenError::Malformed(format!("hmac key: {e}")))?;
        mac.update(signed.as_bytes());
        Ok(mac)
    }
}

/// A random secret for processes started without one.
pub fn generate_secret() -> String {
    Uuid::new_v4().to_string()
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value).map_err(|e| TokenError::Malformed(e.to_string()))?;
    Ok(hex::encode(json))
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, TokenError> {
    let bytes = hex::decode(segment).map_err(|e| TokenError::Malformed(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
    }

    fn codec() -> TokenCodec {
        TokenCodec::new("test-secret")
    }

    /// Sign arbitrary header/payload segments the way the codec does.
    fn sign_raw(codec: &TokenCodec, header: &str, payload: &str) -> String {
        let signed = format!("{header}.{payload}");
        let sig = hex::encode(codec.mac(&signed).unwrap().finalize().into_bytes());
        format!("{signed}.{sig}")
    }

    #[test]
    fn token_round_trips_within_lifetime() {
        let token = codec().issue_at("alice", t0()).unwrap();
        let username = codec().verify_at(&token, t0() + Duration::seconds(1)).unwrap();
        assert_eq!(username, "alice");
    }

    #[test]
    fn token_expires_after_fourteen_days() {
        let token = codec().issue_at("alice", t0()).unwrap();
        let codec = codec();
        let late = t0() + Duration::days(14) + Duration::seconds(1);
        assert_eq!(codec.verify_at(&token, late), Err(TokenError::Expired));
        assert_eq!(codec.verify_at(&token, t0() + Duration::days(14)), Err(TokenError::Expired));
        assert!(codec.verify_at(&token, t0() + Duration::days(14) - Duration::seconds(1)).is_ok());
    }

    #[test]
    fn header_carries_formatted_expiry() {
        let token = codec().issue_at("alice", t0()).unwrap();
        let header = token.split('.').next().unwrap();
        let header: TokenHeader = decode_segment(header).unwrap();
        assert_eq!(header.exp, "15.05.2026 12:00:00 UTC+00");
    }

    #[test]
    fn tampered_signature_is_invalid() {
        let token = codec().issue_at("alice", t0()).unwrap();
        let (signed, sig) = token.rsplit_once('.').unwrap();
        let flipped = if sig.starts_with('0') { "1" } else { "0" };
        let tampered = format!("{signed}.{flipped}{}", &sig[1..]);
        assert_eq!(codec().verify_at(&tampered, t0()), Err(TokenError::Invalid));
    }

    #[test]
    fn tampered_payload_is_invalid() {
        let token = codec().issue_at("alice", t0()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let forged = encode_segment(&TokenPayload {
            username: "root".into(),
        })
        .unwrap();
        let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);
        assert_eq!(codec().verify_at(&tampered, t0()), Err(TokenError::Invalid));
    }

    #[test]
    fn other_secret_is_invalid() {
        let token = codec().issue_at("alice", t0()).unwrap();
        let other = TokenCodec::new("another-secret");
        assert_eq!(other.verify_at(&token, t0()), Err(TokenError::Invalid));
    }

    #[test]
    fn wrong_segment_count_or_bad_hex_signature_is_invalid() {
        for token in ["", "a.b", "a.b.c.d", "aa.bb.zz"] {
            assert_eq!(codec().verify_at(token, t0()), Err(TokenError::Invalid), "{token:?}");
        }
    }

    #[test]
    fn signed_garbage_is_malformed() {
        let codec = codec();
        let payload = encode_segment(&TokenPayload {
            username: "alice".into(),
        })
        .unwrap();

        let not_hex = sign_raw(&codec, "zz", &payload);
        assert!(matches!(codec.verify_at(&not_hex, t0()), Err(TokenError::Malformed(_))));

        let not_json = sign_raw(&codec, &hex::encode("not json"), &payload);
        assert!(matches!(codec.verify_at(&not_json, t0()), Err(TokenError::Malformed(_))));

        let bad_exp = encode_segment(&TokenHeader {
            exp: "2026-05-15T12:00:00Z".into(),
        })
        .unwrap();
        let bad_exp = sign_raw(&codec, &bad_exp, &payload);
        let err = codec.verify_at(&bad_exp, t0()).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn custom_ttl_is_honoured() {
        let codec = codec().with_ttl(Duration::minutes(5));
        let token = codec.issue_at("bob", t0()).unwrap();
        assert!(codec.verify_at(&token, t0() + Duration::minutes(4)).is_ok());
        assert_eq!(
            codec.verify_at(&token, t0() + Duration::minutes(5)),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let rendered = format!("{:?}", codec());
        assert!(!rendered.contains("test-secret"));
    }

    #[test]
    fn generated_secrets_differ() {
        assert_ne!(generate_secret(), generate_secret());
    }
}
