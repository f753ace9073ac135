//! Service API handlers.
//!
//! These endpoints are called by the shop backend and require a signature
//! verified by [`SignedBody`](crate::api::extractors::SignedBody) or
//! [`SignedTarget`](crate::api::extractors::SignedTarget).
//!
//! # Endpoints
//!
//! - `POST /orders/{order_id}/pay`         – charge an order
//! - `POST /orders/{order_id}/cancel`      – cancel the order's charge
//! - `POST /orders/{order_id}/refund`      – refund all or part of a charge
//! - `GET  /orders/{order_id}/transaction` – stored record and gateway view
//! - `GET  /installments?amount=`          – credit-card installment table
//! - `POST /orders/{order_id}/shipment`    – register a shipment
//! - `POST /shipping/calculation`          – quote shipping options

use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use genpay_core::backend::BackendError;
use genpay_core::processors::{OrchestratorError, ShippingError};
use genpay_sdk::client::GatewayError;
use serde::Serialize;

use crate::state::AppState;

mod cancel_order;
mod get_transaction;
mod installments;
mod pay_order;
mod refund_order;
mod shipping;

/// Build the Service API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders/{order_id}/pay", post(pay_order::pay_order))
        .route(
            "/orders/{order_id}/cancel",
            post(cancel_order::cancel_order),
        )
        .route(
            "/orders/{order_id}/refund",
            post(refund_order::refund_order),
        )
        .route(
            "/orders/{order_id}/transaction",
            get(get_transaction::get_transaction),
        )
        .route("/installments", get(installments::get_installments))
        .route(
            "/orders/{order_id}/shipment",
            post(shipping::create_shipment),
        )
        .route("/shipping/calculation", post(shipping::calculate))
}

/// Errors that can occur in Service API handlers.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ServiceApiError {
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),
    #[error(transparent)]
    Shipping(#[from] ShippingError),
    #[error("logistics partner is not configured")]
    LogisticsDisabled,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    messages: Vec<String>,
}

fn backend_status(error: &BackendError) -> StatusCode {
    match error {
        BackendError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn gateway_messages(error: &GatewayError) -> Vec<String> {
    match error {
        GatewayError::Protocol { .. } | GatewayError::Business { .. } => error.messages(),
        _ => Vec::new(),
    }
}

impl ServiceApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceApiError::Orchestrator(e) => match e {
                OrchestratorError::Build(_)
                | OrchestratorError::NoMatchingInstallmentPlan
                | OrchestratorError::UnknownPaymentMethod(_) => StatusCode::UNPROCESSABLE_ENTITY,
                OrchestratorError::NotCharged(_) => StatusCode::CONFLICT,
                OrchestratorError::Gateway(_) => StatusCode::BAD_GATEWAY,
                OrchestratorError::Backend(b) => backend_status(b),
                OrchestratorError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServiceApiError::Shipping(e) => match e {
                ShippingError::Logistics(_) => StatusCode::BAD_GATEWAY,
                ShippingError::Backend(b) => backend_status(b),
                ShippingError::TrackingUnavailable(_) => StatusCode::NOT_FOUND,
            },
            ServiceApiError::LogisticsDisabled => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn messages(&self) -> Vec<String> {
        match self {
            ServiceApiError::Orchestrator(OrchestratorError::Gateway(e))
            | ServiceApiError::Shipping(ShippingError::Logistics(e)) => gateway_messages(e),
            _ => Vec::new(),
        }
    }
}

impl IntoResponse for ServiceApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Service API error");
        } else {
            tracing::debug!(error = %self, "Service API request refused");
        }
        // Store failures may carry database details.
        let error = if status == StatusCode::INTERNAL_SERVER_ERROR {
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            error,
            messages: self.messages(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genpay_core::builders::BuildError;
    use genpay_core::store::StoreError;
    use genpay_sdk::objects::response::ApiErrorEntry;

    #[test]
    fn test_status_codes() {
        let cases = [
            (
                ServiceApiError::from(OrchestratorError::Backend(BackendError::OrderNotFound(1))),
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceApiError::from(OrchestratorError::Build(BuildError::MissingBankAccount)),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ServiceApiError::from(OrchestratorError::NotCharged(1)),
                StatusCode::CONFLICT,
            ),
            (
                ServiceApiError::from(OrchestratorError::Store(StoreError::Conflict {
                    order_id: 1,
                })),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServiceApiError::from(ShippingError::TrackingUnavailable(1)),
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceApiError::LogisticsDisabled,
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.status_code(), expected, "{error}");
        }
    }

    #[test]
    fn test_gateway_messages_are_passed_through() {
        let error = ServiceApiError::from(OrchestratorError::Gateway(GatewayError::Business {
            errors: vec![ApiErrorEntry {
                code: "refund_denied".to_string(),
                description: "Refund window closed".to_string(),
            }],
            body: String::new(),
        }));
        assert_eq!(error.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(error.messages(), vec!["refund_denied, Refund window closed"]);
    }
}
