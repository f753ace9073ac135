use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use genpay_core::entities::OrderId;
use genpay_core::processors::{CancelOutcome, OrchestratorError};
use serde::Serialize;

use super::ServiceApiError;
use crate::api::extractors::SignedTarget;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub(super) enum CancelResponse {
    Cancelled,
    Refused { messages: Vec<String> },
    ManualInterventionRequired,
}

impl From<CancelOutcome> for CancelResponse {
    fn from(outcome: CancelOutcome) -> Self {
        match outcome {
            CancelOutcome::Cancelled => CancelResponse::Cancelled,
            CancelOutcome::Refused { messages } => CancelResponse::Refused { messages },
            CancelOutcome::ManualInterventionRequired => {
                CancelResponse::ManualInterventionRequired
            }
        }
    }
}

/// `POST /orders/{order_id}/cancel`: cancel the charge of an order.
///
/// The order status itself is left alone; it follows the gateway's
/// `cancelled` notification.
pub(super) async fn cancel_order(
    state: State<AppState>,
    _signed: SignedTarget,
    Path(order_id): Path<OrderId>,
) -> Result<impl IntoResponse, ServiceApiError> {
    let order = state
        .orchestrator
        .backend()
        .get_order(order_id)
        .await
        .map_err(OrchestratorError::from)?;
    let outcome = state.orchestrator.cancel(&order).await?;
    Ok(Json(CancelResponse::from(outcome)))
}
