//! Request signing and verification for the GenPay and GenLog APIs.
//!
//! Every mutating call carries two headers:
//!
//! ```text
//! Authorization: Basic base64("{document}:{api_key}")
//! Signature:     base64(HMAC-SHA256(raw_json_body, signature_key))
//! ```
//!
//! Inbound webhooks from the gateway carry the same `Signature` header
//! computed over the exact bytes of the request body.
//!
//! The signature covers bytes, not values: a body must be serialized once
//! and the very same string must be both signed and transmitted.
//! [`SignedBody`] keeps the two together.

use serde::Serialize;

/// Header name for the HMAC signature.
pub const SIGNATURE_HEADER: &str = "Signature";

/// Errors produced by signature operations.
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("empty body")]
    EmptyBody,
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid signature")]
    SignatureMismatch,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::SignatureMismatch
    }
}

/// Compute `base64(HMAC-SHA256(body, key))`.
pub fn sign(key: &[u8], body: &[u8]) -> String {
    let tag = ring::hmac::sign(&ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key), body);
    fast32::base64::RFC4648.encode(tag.as_ref())
}

/// Verify a base64 signature header against the raw body.
///
/// The comparison runs in constant time (`ring::hmac::verify`). An empty
/// body is always rejected.
pub fn verify(key: &[u8], body: &[u8], signature: &str) -> Result<(), SignatureError> {
    if body.is_empty() {
        return Err(SignatureError::EmptyBody);
    }
    let tag = fast32::base64::RFC4648
        .decode_str(signature.trim())
        .map_err(|_| SignatureError::InvalidBase64)?;
    ring::hmac::verify(
        &ring::hmac::Key::new(ring::hmac::HMAC_SHA256, key),
        body,
        &tag,
    )?;
    Ok(())
}

/// Build the `Authorization: Basic ...` header value for a merchant.
pub fn basic_authorization(document: &str, api_key: &str) -> String {
    let user_pass = format!("{document}:{api_key}");
    format!(
        "Basic {}",
        fast32::base64::RFC4648.encode(user_pass.as_bytes())
    )
}

/// A JSON body serialized exactly once, together with its signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedBody {
    pub json: String,
    pub signature: String,
}

impl SignedBody {
    /// Serialize `body` and sign the resulting bytes with `key`.
    pub fn new<T: Serialize + ?Sized>(body: &T, key: &[u8]) -> Result<Self, serde_json::Error> {
        Ok(Self::from_json(serde_json::to_string(body)?, key))
    }

    /// Sign an already serialized body.
    pub fn from_json(json: String, key: &[u8]) -> Self {
        let signature = sign(key, json.as_bytes());
        Self { json, signature }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"merchant-signature-key";

    #[test]
    fn test_sign_then_verify() {
        let body = br#"{"uuid":"abc","status":"approved"}"#;
        let sig = sign(KEY, body);
        assert!(verify(KEY, body, &sig).is_ok());
    }

    #[test]
    fn test_one_byte_changed_fails() {
        let body = br#"{"uuid":"abc","status":"approved"}"#.to_vec();
        let sig = sign(KEY, &body);
        let mut tampered = body.clone();
        tampered[3] ^= 0x01;
        assert!(matches!(
            verify(KEY, &tampered, &sig),
            Err(SignatureError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_wrong_key_fails() {
        let body = b"{}";
        let sig = sign(b"other-key", body);
        assert!(verify(KEY, body, &sig).is_err());
    }

    #[test]
    fn test_empty_body_rejected() {
        let sig = sign(KEY, b"");
        assert!(matches!(verify(KEY, b"", &sig), Err(SignatureError::EmptyBody)));
    }

    #[test]
    fn test_garbage_header_rejected() {
        assert!(matches!(
            verify(KEY, b"{}", "not base64 !!"),
            Err(SignatureError::InvalidBase64)
        ));
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let sig = sign(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(sig, "W9zBRr9gdU5qBCQmCJV1x1oAPwidJzmDnexYuWTsOEM=");
    }

    #[test]
    fn test_basic_authorization() {
        assert_eq!(
            basic_authorization("12345678000199", "key"),
            "Basic MTIzNDU2NzgwMDAxOTk6a2V5"
        );
    }

    #[test]
    fn test_signed_body_signs_transmitted_bytes() {
        let body = serde_json::json!({ "amount": 150.0, "reference": "42" });
        let signed = SignedBody::new(&body, KEY).unwrap();
        assert!(verify(KEY, signed.json.as_bytes(), &signed.signature).is_ok());
    }
}
