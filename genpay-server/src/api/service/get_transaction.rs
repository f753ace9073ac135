use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use genpay_core::entities::{OrderId, TransactionRecord};
use genpay_core::processors::OrchestratorError;
use genpay_sdk::objects::response::TransactionSnapshot;
use serde::Serialize;

use super::ServiceApiError;
use crate::api::extractors::SignedTarget;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct TransactionResponse {
    record: TransactionRecord,
    /// `None` until the order has been charged.
    gateway: Option<TransactionSnapshot>,
}

/// `GET /orders/{order_id}/transaction`: the stored record of an order
/// and, once charged, the gateway's view of the transaction.
pub(super) async fn get_transaction(
    state: State<AppState>,
    _signed: SignedTarget,
    Path(order_id): Path<OrderId>,
) -> Result<impl IntoResponse, ServiceApiError> {
    let record = state.orchestrator.record(order_id).await?;
    let gateway = if record.transaction_id.is_some() {
        let order = state
            .orchestrator
            .backend()
            .get_order(order_id)
            .await
            .map_err(OrchestratorError::from)?;
        Some(state.orchestrator.fetch_transaction(&order).await?)
    } else {
        None
    };
    Ok(Json(TransactionResponse { record, gateway }))
}
