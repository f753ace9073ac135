//! Application state shared across all request handlers.

use genpay_core::processors::{Orchestrator, ShipmentDispatcher, WebhookHandler};
use std::sync::Arc;

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub webhooks: WebhookHandler,
    /// `None` when no `[logistics]` section is configured.
    pub shipping: Option<ShipmentDispatcher>,
    /// Shared secret the shop signs service API requests with.
    pub service_secret: Arc<[u8]>,
}

impl AppState {
    pub fn new(
        orchestrator: Orchestrator,
        webhooks: WebhookHandler,
        shipping: Option<ShipmentDispatcher>,
        service_secret: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            orchestrator,
            webhooks,
            shipping,
            service_secret: service_secret.into(),
        }
    }
}
