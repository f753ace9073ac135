use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use genpay_core::entities::{CheckoutForm, OrderId, PaymentDisplay};
use genpay_core::processors::ChargeOutcome;
use genpay_sdk::objects::GatewayStatus;
use genpay_sdk::objects::response::ApiErrorEntry;
use serde::Serialize;

use super::ServiceApiError;
use crate::api::extractors::SignedBody;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub(super) enum PayResponse {
    Charged {
        transaction_id: Option<String>,
        status: Option<GatewayStatus>,
        display: PaymentDisplay,
    },
    Rejected {
        errors: Vec<ApiErrorEntry>,
    },
}

impl From<ChargeOutcome> for PayResponse {
    fn from(outcome: ChargeOutcome) -> Self {
        match outcome {
            ChargeOutcome::Charged {
                transaction_id,
                status,
                display,
            } => PayResponse::Charged {
                transaction_id,
                status,
                display,
            },
            ChargeOutcome::Rejected { errors } => PayResponse::Rejected { errors },
        }
    }
}

/// `POST /orders/{order_id}/pay`: charge an order.
///
/// A refused charge is still a 200: the gateway's errors are returned for
/// the shop to show the buyer.
pub(super) async fn pay_order(
    state: State<AppState>,
    Path(order_id): Path<OrderId>,
    SignedBody(form): SignedBody<CheckoutForm>,
) -> Result<impl IntoResponse, ServiceApiError> {
    let outcome = state.orchestrator.pay(order_id, &form).await?;
    Ok(Json(PayResponse::from(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_response_shape() {
        let response = PayResponse::from(ChargeOutcome::Rejected {
            errors: vec![ApiErrorEntry {
                code: "1".to_string(),
                description: "Card declined".to_string(),
            }],
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["outcome"], "rejected");
        assert_eq!(json["errors"][0]["description"], "Card declined");
    }

    #[test]
    fn test_charged_response_shape() {
        let response = PayResponse::from(ChargeOutcome::Charged {
            transaction_id: Some("c-42".to_string()),
            status: Some(GatewayStatus::Approved),
            display: PaymentDisplay::default(),
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["outcome"], "charged");
        assert_eq!(json["transaction_id"], "c-42");
        assert_eq!(json["status"], "approved");
    }
}
