//! Outbound messages.
//!
//! Buyer messages become customer notes on the order, which the shop
//! e-mails. Merchant messages are POSTed as signed JSON to the configured
//! URL, or only logged when there is none.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use genpay_core::backend::{Notification, Notifier, NotifyError};
use genpay_core::entities::Order;
use genpay_sdk::signature::{SIGNATURE_HEADER, SignedBody};
use url::Url;

use crate::woocommerce::WooCommerceBackend;

const DELIVERY_TIMEOUT_SECS: u64 = 30;

pub struct ShopNotifier {
    shop: Arc<WooCommerceBackend>,
    http: reqwest::Client,
    merchant_url: Option<Url>,
    secret: Arc<[u8]>,
}

impl ShopNotifier {
    /// `secret` signs merchant notifications.
    pub fn new(
        shop: Arc<WooCommerceBackend>,
        merchant_url: Option<Url>,
        secret: Arc<[u8]>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DELIVERY_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            shop,
            http,
            merchant_url,
            secret,
        })
    }
}

fn customer_note(notification: &Notification) -> String {
    if notification.title.is_empty() {
        notification.message.clone()
    } else {
        format!("{}\n\n{}", notification.title, notification.message)
    }
}

#[async_trait]
impl Notifier for ShopNotifier {
    async fn notify_merchant(&self, notification: &Notification) -> Result<(), NotifyError> {
        let Some(url) = &self.merchant_url else {
            tracing::info!(
                subject = %notification.subject,
                message = %notification.message,
                "merchant notification"
            );
            return Ok(());
        };

        let signed = SignedBody::new(notification, &self.secret)
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        let response = self
            .http
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signed.signature)
            .body(signed.json)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(subject = %notification.subject, "merchant notified");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::Delivery(format!(
                "merchant endpoint answered {status}: {body}"
            )))
        }
    }

    async fn notify_buyer(
        &self,
        order: &Order,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        if order.billing_email().is_none() {
            return Err(NotifyError::NoRecipient);
        }
        self.shop
            .add_customer_note(order.id, &customer_note(notification))
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))
    }
}
