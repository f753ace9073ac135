//! Shipments through the logistics partner.
//!
//! Batches are created from a body the shop assembles, then the partner is
//! asked for the tracking data of the order, which ends up on an order note
//! and in a message to the buyer.

use std::sync::Arc;

use genpay_sdk::client::GatewayError;
use genpay_sdk::objects::logistics::ShipmentTracking;
use tracing::{info, warn};

use crate::backend::{BackendError, Notification, Notifier, OrderBackend};
use crate::entities::OrderId;
use crate::gateway::Logistics;

#[derive(Debug, thiserror::Error)]
pub enum ShippingError {
    #[error(transparent)]
    Logistics(#[from] GatewayError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("the logistics partner has no tracking data for order {0}")]
    TrackingUnavailable(OrderId),
}

#[derive(Clone)]
pub struct ShipmentDispatcher {
    logistics: Arc<dyn Logistics>,
    backend: Arc<dyn OrderBackend>,
    notifier: Arc<dyn Notifier>,
}

impl ShipmentDispatcher {
    pub fn new(
        logistics: Arc<dyn Logistics>,
        backend: Arc<dyn OrderBackend>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            logistics,
            backend,
            notifier,
        }
    }

    /// Shipping quote. The body and the returned content are the partner's
    /// own format.
    pub async fn calculate(
        &self,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, ShippingError> {
        let envelope = self.logistics.create_calculation(body).await?;
        Ok(envelope.content.unwrap_or_default())
    }

    #[tracing::instrument(skip_all, fields(order_id = order_id))]
    pub async fn dispatch(
        &self,
        order_id: OrderId,
        batch: &serde_json::Value,
    ) -> Result<ShipmentTracking, ShippingError> {
        let order = self.backend.get_order(order_id).await?;
        self.logistics.create_batch(batch).await?;

        let envelope = self.logistics.get_order(&order.id.to_string()).await?;
        if !envelope.is_ok() || envelope.content.is_none() {
            warn!(messages = ?envelope.message_texts(), "no tracking data after batch");
            return Err(ShippingError::TrackingUnavailable(order.id));
        }
        let content = envelope.content.unwrap_or_default();
        let tracking = ShipmentTracking::from(content);
        info!(tracking_code = ?tracking.tracking_code, "shipment batch created");

        let code = tracking.tracking_code.as_deref().unwrap_or("-");
        let mut note = format!("Shipment created. Tracking code: {code}");
        if let Some(url) = &tracking.tracking_url {
            note.push_str(&format!(", tracking: {url}"));
        }
        if let Some(url) = &tracking.print_url {
            note.push_str(&format!(", labels: {url}"));
        }
        if let Some(batch_code) = &tracking.batch_code {
            note.push_str(&format!(", batch {batch_code}"));
        }
        if let Err(e) = self.backend.add_note(order.id, &note).await {
            warn!(error = %e, "failed to add shipment note");
        }

        let mut message = format!("Your order {} has been shipped. Tracking code: {code}.", order.number);
        if let Some(url) = &tracking.tracking_url {
            message.push_str(&format!(" Follow it at {url}"));
        }
        let notification = Notification::new(
            format!("Order {} shipped", order.number),
            "Your order is on its way",
            message,
        );
        if let Err(e) = self.notifier.notify_buyer(&order, &notification).await {
            warn!(error = %e, "failed to notify buyer of shipment");
        }
        Ok(tracking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::charge::tests::sample_order;
    use crate::processors::testing::{FakeBackend, FakeLogistics, FakeNotifier};
    use genpay_sdk::objects::logistics::{LogisticsEnvelope, LogisticsOrder};
    use serde_json::json;

    fn dispatcher() -> (ShipmentDispatcher, Arc<FakeLogistics>, Arc<FakeBackend>, Arc<FakeNotifier>) {
        let logistics = Arc::new(FakeLogistics::default());
        let backend = Arc::new(FakeBackend::with_order(sample_order()));
        let notifier = Arc::new(FakeNotifier::default());
        let dispatcher =
            ShipmentDispatcher::new(logistics.clone(), backend.clone(), notifier.clone());
        (dispatcher, logistics, backend, notifier)
    }

    #[tokio::test]
    async fn test_dispatch_reads_back_tracking() {
        let (dispatcher, logistics, backend, notifier) = dispatcher();
        *logistics.batch.lock().unwrap() = Some(Ok(LogisticsEnvelope {
            status: "OK".to_string(),
            content: Some(json!({})),
            messages: Vec::new(),
        }));
        let order: LogisticsEnvelope<LogisticsOrder> = serde_json::from_value(json!({
            "status": "OK",
            "content": {
                "trackings_number": ["BR123"],
                "tracking_print_url": "https://track/BR123",
                "batch_code": "B-1",
                "shipping_option": {"volumes": [{"number": "1"}]}
            }
        }))
        .unwrap();
        *logistics.order.lock().unwrap() = Some(Ok(order));

        let tracking = dispatcher.dispatch(42, &json!({"orders": [42]})).await.unwrap();

        assert_eq!(tracking.tracking_code.as_deref(), Some("BR123"));
        assert_eq!(*logistics.orders_asked.lock().unwrap(), vec!["42"]);
        assert!(backend.notes(42)[0].contains("BR123"));
        let buyer = notifier.buyer_messages();
        assert!(buyer[0].1.message.contains("https://track/BR123"));
    }

    #[tokio::test]
    async fn test_batch_failure_propagates() {
        let (dispatcher, logistics, backend, _) = dispatcher();
        *logistics.batch.lock().unwrap() = Some(Err(GatewayError::Business {
            errors: Vec::new(),
            body: r#"{"status":"ERROR"}"#.to_string(),
        }));
        let err = dispatcher.dispatch(42, &json!({})).await.unwrap_err();
        assert!(matches!(err, ShippingError::Logistics(GatewayError::Business { .. })));
        assert!(logistics.orders_asked.lock().unwrap().is_empty());
        assert!(backend.notes(42).is_empty());
    }

    #[tokio::test]
    async fn test_missing_tracking() {
        let (dispatcher, logistics, _, notifier) = dispatcher();
        *logistics.batch.lock().unwrap() = Some(Ok(LogisticsEnvelope::default()));
        *logistics.order.lock().unwrap() = Some(Ok(LogisticsEnvelope {
            status: "ERROR".to_string(),
            content: None,
            messages: vec![json!("order not found")],
        }));
        let err = dispatcher.dispatch(42, &json!({})).await.unwrap_err();
        assert!(matches!(err, ShippingError::TrackingUnavailable(42)));
        assert!(notifier.buyer_messages().is_empty());
    }

    #[tokio::test]
    async fn test_calculate_returns_content() {
        let (dispatcher, _, _, _) = dispatcher();
        let quote = dispatcher.calculate(&json!({"zipcode": "01310100"})).await.unwrap();
        assert_eq!(quote["zipcode"], "01310100");
    }
}
