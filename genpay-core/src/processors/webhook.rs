//! Inbound gateway notifications.
//!
//! A notification is only processed once its `Signature` header checks out
//! against the raw body. It is then routed to the order that owns the
//! charge and fed to the [`StatusMachine`].

use std::sync::Arc;

use genpay_sdk::objects::webhook::WebhookNotification;
use genpay_sdk::signature::SignatureError;
use tracing::{info, warn};

use super::status_machine::{StatusError, StatusMachine, StatusOutcome, StatusUpdate};
use crate::backend::{BackendError, OrderBackend};
use crate::entities::OrderId;
use crate::gateway::Gateway;
use crate::store::{StoreError, TransactionStore};

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("empty notification body")]
    EmptyBody,
    #[error("missing signature header")]
    MissingSignature,
    #[error("invalid signature: {0}")]
    BadSignature(#[from] SignatureError),
    #[error("malformed notification: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("no order holds transaction {0}")]
    UnknownTransaction(String),
    #[error("order lookup returned {found} for order {expected}")]
    OrderMismatch { expected: OrderId, found: OrderId },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Status(#[from] StatusError),
}

impl WebhookError {
    /// Rejected before any state was read.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            WebhookError::EmptyBody | WebhookError::MissingSignature | WebhookError::BadSignature(_)
        )
    }

    /// Failures on our side, worth a redelivery.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            WebhookError::Store(_) | WebhookError::Backend(_) | WebhookError::Status(_)
        )
    }
}

#[derive(Clone)]
pub struct WebhookHandler {
    gateway: Arc<dyn Gateway>,
    store: Arc<dyn TransactionStore>,
    backend: Arc<dyn OrderBackend>,
    machine: StatusMachine,
}

impl WebhookHandler {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        store: Arc<dyn TransactionStore>,
        backend: Arc<dyn OrderBackend>,
        machine: StatusMachine,
    ) -> Self {
        Self {
            gateway,
            store,
            backend,
            machine,
        }
    }

    #[tracing::instrument(skip_all, err)]
    pub async fn handle(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<StatusOutcome, WebhookError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(WebhookError::EmptyBody);
        }
        let signature = signature.ok_or(WebhookError::MissingSignature)?;
        self.gateway.verify_webhook(body, signature)?;

        let notification: WebhookNotification = serde_json::from_slice(body)?;
        let record = self
            .store
            .find_by_transaction_id(&notification.uuid)
            .await?
            .ok_or_else(|| WebhookError::UnknownTransaction(notification.uuid.clone()))?;
        let order = self.backend.get_order(record.order_id).await?;
        if order.id != record.order_id {
            warn!(expected = record.order_id, found = order.id, "order lookup mismatch");
            return Err(WebhookError::OrderMismatch {
                expected: record.order_id,
                found: order.id,
            });
        }

        info!(
            order_id = order.id,
            transaction_id = %notification.uuid,
            status = %notification.status,
            "webhook received"
        );
        let update = StatusUpdate::from(notification);
        Ok(self.machine.apply(&order, &update).await?)
    }
}
