//! Custom Axum extractors for service API authentication.
//!
//! Provides:
//! - `SignedBody<T>`: verifies the `Signature` header against the request
//!   target and the raw JSON body.
//! - `SignedTarget`: verifies the `Signature` header for requests without a
//!   body.
//!
//! Both use the `base64(HMAC-SHA256(bytes, service_secret))` scheme the
//! gateway uses, through [`genpay_sdk::signature`]. The signed bytes are
//!
//! ```text
//! {path_and_query}\n{raw_body}
//! ```
//!
//! with an empty body for `SignedTarget`, so a signature is only valid for
//! the order it was issued for.

use axum::{
    extract::{FromRequest, FromRequestParts, OriginalUri, Request},
    http::{HeaderMap, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use genpay_sdk::signature::{self, SIGNATURE_HEADER, SignatureError};
use serde::de::DeserializeOwned;

use crate::state::AppState;

/// Largest service API body accepted.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Errors returned by the service API extractors.
#[derive(Debug, thiserror::Error)]
pub enum SignedRequestError {
    #[error("missing Signature header")]
    MissingHeader,
    #[error("invalid Signature header")]
    InvalidHeader,
    #[error("invalid signature encoding")]
    InvalidBase64,
    #[error("failed to read request body")]
    BodyReadError,
    #[error("empty request body")]
    EmptyBody,
    #[error("invalid JSON body: {0}")]
    JsonError(serde_json::Error),
    #[error("signature verification failed")]
    VerificationFailed,
}

impl From<SignatureError> for SignedRequestError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::EmptyBody => Self::EmptyBody,
            SignatureError::InvalidBase64 => Self::InvalidBase64,
            SignatureError::Json(e) => Self::JsonError(e),
            SignatureError::SignatureMismatch => Self::VerificationFailed,
        }
    }
}

impl IntoResponse for SignedRequestError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            SignedRequestError::MissingHeader => {
                (StatusCode::UNAUTHORIZED, "missing Signature header")
            }
            SignedRequestError::InvalidHeader => {
                (StatusCode::BAD_REQUEST, "invalid Signature header")
            }
            SignedRequestError::InvalidBase64 => {
                (StatusCode::BAD_REQUEST, "invalid signature encoding")
            }
            SignedRequestError::BodyReadError => {
                (StatusCode::BAD_REQUEST, "failed to read request body")
            }
            SignedRequestError::EmptyBody => (StatusCode::BAD_REQUEST, "empty request body"),
            SignedRequestError::JsonError(_) => (StatusCode::BAD_REQUEST, "invalid JSON body"),
            SignedRequestError::VerificationFailed => {
                (StatusCode::UNAUTHORIZED, "signature verification failed")
            }
        };
        (status, message).into_response()
    }
}

fn signature_header(headers: &HeaderMap) -> Result<String, SignedRequestError> {
    Ok(headers
        .get(SIGNATURE_HEADER)
        .ok_or(SignedRequestError::MissingHeader)?
        .to_str()
        .map_err(|_| SignedRequestError::InvalidHeader)?
        .to_owned())
}

fn signed_message(target: &str, body: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(target.len() + 1 + body.len());
    message.extend_from_slice(target.as_bytes());
    message.push(b'\n');
    message.extend_from_slice(body);
    message
}

/// Verify `body` for `target` and deserialize it.
fn verify_body<T: DeserializeOwned>(
    secret: &[u8],
    target: &str,
    body: &[u8],
    signature_header: &str,
) -> Result<T, SignedRequestError> {
    if body.is_empty() {
        return Err(SignedRequestError::EmptyBody);
    }
    signature::verify(secret, &signed_message(target, body), signature_header)?;
    serde_json::from_slice(body).map_err(SignedRequestError::JsonError)
}

/// Path and query as seen from outside any nesting.
fn signed_target(parts: &Parts) -> String {
    let uri = parts
        .extensions
        .get::<OriginalUri>()
        .map(|original| &original.0)
        .unwrap_or(&parts.uri);
    uri.path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| uri.path().to_owned())
}

/// An Axum extractor that verifies the `Signature` header and
/// deserializes the authenticated JSON request body.
pub struct SignedBody<T>(pub T);

impl<T: DeserializeOwned + Send> FromRequest<AppState> for SignedBody<T> {
    type Rejection = SignedRequestError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let (parts, body) = req.into_parts();
        let header_value = signature_header(&parts.headers)?;
        let target = signed_target(&parts);

        let body_bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|_| SignedRequestError::BodyReadError)?;

        let verified = verify_body(&state.service_secret, &target, &body_bytes, &header_value)?;
        Ok(SignedBody(verified))
    }
}

/// An Axum extractor that verifies the `Signature` header of a request
/// without a body, e.g. `GET /api/v1/service/installments?amount=150.00`.
///
/// Implements `FromRequestParts` so it can be combined with `Path<T>`,
/// `Query<T>`, etc.
pub struct SignedTarget;

impl FromRequestParts<AppState> for SignedTarget {
    type Rejection = SignedRequestError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = signature_header(&parts.headers)?;
        let target = signed_target(parts);
        signature::verify(
            &state.service_secret,
            &signed_message(&target, &[]),
            &header_value,
        )?;
        Ok(SignedTarget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, Uri};
    use genpay_core::entities::RefundInput;

    const SECRET: &[u8] = b"service-secret";

    const REFUND_TARGET: &str = "/api/v1/service/orders/42/refund";

    fn sign_for(secret: &[u8], target: &str, body: &[u8]) -> String {
        signature::sign(secret, &signed_message(target, body))
    }

    #[test]
    fn test_verify_body_accepts_signed_json() {
        let body = br#"{"amount":50.0,"reason":"damaged"}"#;
        let sig = sign_for(SECRET, REFUND_TARGET, body);
        let input: RefundInput = verify_body(SECRET, REFUND_TARGET, body, &sig).unwrap();
        assert_eq!(input.reason, "damaged");
        assert!(input.bank_account.is_none());
    }

    #[test]
    fn test_verify_body_rejects_other_secret() {
        let body = br#"{"amount":50.0,"reason":"damaged"}"#;
        let sig = sign_for(b"other", REFUND_TARGET, body);
        let err = verify_body::<RefundInput>(SECRET, REFUND_TARGET, body, &sig).unwrap_err();
        assert!(matches!(err, SignedRequestError::VerificationFailed));
    }

    #[test]
    fn test_signature_is_bound_to_the_order() {
        let body = br#"{"amount":50.0,"reason":"damaged"}"#;
        let sig = sign_for(SECRET, REFUND_TARGET, body);
        let err = verify_body::<RefundInput>(SECRET, "/api/v1/service/orders/43/refund", body, &sig)
            .unwrap_err();
        assert!(matches!(err, SignedRequestError::VerificationFailed));
    }

    #[test]
    fn test_verify_body_rejects_empty_body() {
        let sig = sign_for(SECRET, REFUND_TARGET, b"");
        let err = verify_body::<serde_json::Value>(SECRET, REFUND_TARGET, b"", &sig).unwrap_err();
        assert!(matches!(err, SignedRequestError::EmptyBody));
    }

    #[test]
    fn test_signed_but_malformed_body_is_bad_request() {
        let body = br#"{"amount":"#;
        let sig = sign_for(SECRET, REFUND_TARGET, body);
        let err = verify_body::<RefundInput>(SECRET, REFUND_TARGET, body, &sig).unwrap_err();
        assert!(matches!(err, SignedRequestError::JsonError(_)));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_signed_target_prefers_original_uri() {
        let (mut parts, _) = Request::builder()
            .uri("/installments?amount=150.00")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(signed_target(&parts), "/installments?amount=150.00");

        parts.extensions.insert(OriginalUri(Uri::from_static(
            "/api/v1/service/installments?amount=150.00",
        )));
        assert_eq!(
            signed_target(&parts),
            "/api/v1/service/installments?amount=150.00"
        );
    }

    #[test]
    fn test_missing_header_is_unauthorized() {
        let err = signature_header(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }
}
