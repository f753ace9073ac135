use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::ServiceApiError;
use crate::api::extractors::SignedTarget;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub(super) struct InstallmentsQuery {
    amount: Decimal,
}

/// `GET /installments?amount=`: the gateway's credit-card installment
/// table for an amount.
pub(super) async fn get_installments(
    state: State<AppState>,
    _signed: SignedTarget,
    Query(query): Query<InstallmentsQuery>,
) -> Result<impl IntoResponse, ServiceApiError> {
    let plans = state
        .orchestrator
        .fetch_installment_options(query.amount)
        .await?;
    Ok(Json(plans))
}
