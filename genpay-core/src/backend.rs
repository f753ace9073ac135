//! Collaborators owned by the shop: order storage and outbound messages.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::{Order, OrderId, OrderStatus};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),
    #[error("shop request failed: {0}")]
    Request(String),
    #[error("shop refused the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected shop response: {0}")]
    Decode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Delivery(String),
    #[error("no recipient for notification")]
    NoRecipient,
}

/// A monetary refund recorded on the order without line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundLine {
    pub amount: Decimal,
    pub reason: String,
    /// Whether the shop should also push the refund to the payment method.
    pub refund_payment: bool,
    pub restock_items: bool,
}

/// An e-mail style message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub subject: String,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(
        subject: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Order storage of the shop.
#[async_trait]
pub trait OrderBackend: Send + Sync {
    async fn get_order(&self, order_id: OrderId) -> Result<Order, BackendError>;

    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        note: Option<&str>,
    ) -> Result<(), BackendError>;

    async fn add_note(&self, order_id: OrderId, note: &str) -> Result<(), BackendError>;

    /// Mark the order paid, moving it to fulfillment.
    async fn payment_complete(
        &self,
        order_id: OrderId,
        transaction_id: Option<&str>,
    ) -> Result<(), BackendError>;

    async fn create_refund(&self, order_id: OrderId, refund: &RefundLine)
    -> Result<(), BackendError>;
}

/// Outbound messages to the merchant and the buyer.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_merchant(&self, notification: &Notification) -> Result<(), NotifyError>;

    async fn notify_buyer(
        &self,
        order: &Order,
        notification: &Notification,
    ) -> Result<(), NotifyError>;
}
