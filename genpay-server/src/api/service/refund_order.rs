use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use genpay_core::entities::{OrderId, RefundInput};
use serde::Serialize;

use super::ServiceApiError;
use crate::api::extractors::SignedBody;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct RefundResponse {
    refund_id: Option<String>,
}

/// `POST /orders/{order_id}/refund`: refund all or part of a charge.
///
/// Called from the shop's refund action, which has already recorded the
/// refund on the order. The returned id is remembered so the gateway's
/// `refunded` notification does not refund the order again.
pub(super) async fn refund_order(
    state: State<AppState>,
    Path(order_id): Path<OrderId>,
    SignedBody(input): SignedBody<RefundInput>,
) -> Result<impl IntoResponse, ServiceApiError> {
    let refund_id = state.orchestrator.process_refund(order_id, &input).await?;
    Ok(Json(RefundResponse { refund_id }))
}
