//! Logistics partner endpoints. Bodies are passed through in the partner's
//! own format.

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use genpay_core::entities::OrderId;
use genpay_core::processors::ShipmentDispatcher;

use super::ServiceApiError;
use crate::api::extractors::SignedBody;
use crate::state::AppState;

fn dispatcher(state: &AppState) -> Result<&ShipmentDispatcher, ServiceApiError> {
    state
        .shipping
        .as_ref()
        .ok_or(ServiceApiError::LogisticsDisabled)
}

/// `POST /orders/{order_id}/shipment`: register the order with the
/// partner and return its tracking data.
pub(super) async fn create_shipment(
    state: State<AppState>,
    Path(order_id): Path<OrderId>,
    SignedBody(batch): SignedBody<serde_json::Value>,
) -> Result<impl IntoResponse, ServiceApiError> {
    let tracking = dispatcher(&state)?.dispatch(order_id, &batch).await?;
    Ok(Json(tracking))
}

/// `POST /shipping/calculation`: quote shipping options for a cart.
pub(super) async fn calculate(
    state: State<AppState>,
    SignedBody(body): SignedBody<serde_json::Value>,
) -> Result<impl IntoResponse, ServiceApiError> {
    let quote = dispatcher(&state)?.calculate(&body).await?;
    Ok(Json(quote))
}
