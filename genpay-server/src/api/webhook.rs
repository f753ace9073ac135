//! Inbound gateway notifications.
//!
//! The raw body is handed over untouched: the signature covers its exact
//! bytes.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use genpay_core::processors::{StatusOutcome, WebhookError};
use genpay_sdk::signature::SIGNATURE_HEADER;

use crate::state::AppState;

/// `POST /webhook`
///
/// - 200: processed, whether or not it changed the order
/// - 401: bad or missing signature, malformed body, or no matching order
/// - 500: our side failed; the gateway may redeliver
pub(crate) async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let result = state.webhooks.handle(&body, signature).await;
    status_for(&result)
}

fn status_for(result: &Result<StatusOutcome, WebhookError>) -> StatusCode {
    match result {
        Ok(StatusOutcome::Applied(record)) => {
            tracing::debug!(order_id = record.order_id, "notification applied");
            StatusCode::OK
        }
        Ok(StatusOutcome::Skipped(reason)) => {
            tracing::debug!(reason, "notification skipped");
            StatusCode::OK
        }
        Err(e) if e.is_internal() => {
            tracing::error!(error = %e, "failed to process gateway notification");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        Err(e) => {
            tracing::warn!(error = %e, "rejected gateway notification");
            StatusCode::UNAUTHORIZED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genpay_core::entities::TransactionRecord;
    use genpay_core::store::StoreError;
    use genpay_sdk::signature::SignatureError;

    #[test]
    fn test_outcomes_are_ok() {
        assert_eq!(
            status_for(&Ok(StatusOutcome::Applied(TransactionRecord::new(1)))),
            StatusCode::OK
        );
        assert_eq!(
            status_for(&Ok(StatusOutcome::Skipped("repeated status"))),
            StatusCode::OK
        );
    }

    #[test]
    fn test_signature_failures_are_unauthorized() {
        assert_eq!(
            status_for(&Err(WebhookError::MissingSignature)),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&Err(WebhookError::BadSignature(
                SignatureError::SignatureMismatch
            ))),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&Err(WebhookError::EmptyBody)),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_store_failure_asks_for_redelivery() {
        let err = WebhookError::Store(StoreError::Conflict { order_id: 1 });
        assert_eq!(status_for(&Err(err)), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_lookup_and_parse_failures_are_rejected() {
        let unknown = WebhookError::UnknownTransaction("c-1".to_string());
        assert_eq!(status_for(&Err(unknown)), StatusCode::UNAUTHORIZED);

        let mismatch = WebhookError::OrderMismatch {
            expected: 42,
            found: 7,
        };
        assert_eq!(status_for(&Err(mismatch)), StatusCode::UNAUTHORIZED);

        let malformed = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(
            status_for(&Err(WebhookError::Malformed(malformed))),
            StatusCode::UNAUTHORIZED
        );
    }
}
