use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::state::AppState;

/// `GET /billet/{charge_id}`: the printable billet of a charge, proxied
/// from the gateway. Linked from the buyer's order page.
pub(crate) async fn download(
    State(state): State<AppState>,
    Path(charge_id): Path<String>,
) -> Response {
    match state.orchestrator.billet(&charge_id).await {
        Ok(billet) if !billet.html.is_empty() => Html(billet.html).into_response(),
        Ok(_) => (StatusCode::NOT_FOUND, "billet not available").into_response(),
        Err(e) => {
            tracing::warn!(charge_id = %charge_id, error = %e, "billet download failed");
            (StatusCode::BAD_GATEWAY, "billet not available").into_response()
        }
    }
}
