//! In-memory fakes of the shop, the notifier and the gateway.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use genpay_sdk::client::GatewayError;
use genpay_sdk::objects::charge::ChargeRequest;
use genpay_sdk::objects::logistics::{LogisticsEnvelope, LogisticsOrder};
use genpay_sdk::objects::refund::{RefundKind, RefundRequest};
use genpay_sdk::objects::response::{
    BilletDownload, CancelResponse, ChargeResponse, CheckoutOptions, RefundResponse,
    TransactionSnapshot,
};
use genpay_sdk::signature::{self, SignatureError};
use rust_decimal::Decimal;

use crate::backend::{BackendError, Notification, Notifier, NotifyError, OrderBackend, RefundLine};
use crate::entities::{Order, OrderId, OrderStatus};
use crate::gateway::{Gateway, Logistics};

pub(crate) const WEBHOOK_KEY: &str = "webhook-secret";

/// A reqwest error, built without touching the network.
pub(crate) fn transport_error() -> GatewayError {
    let err = reqwest::Client::new()
        .get("not a url")
        .build()
        .unwrap_err();
    GatewayError::Transport(err)
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum BackendCall {
    UpdateStatus(OrderId, OrderStatus),
    AddNote(OrderId, String),
    PaymentComplete(OrderId, Option<String>),
    CreateRefund(OrderId, RefundLine),
}

#[derive(Debug, Default)]
pub(crate) struct FakeBackend {
    orders: Mutex<HashMap<OrderId, Order>>,
    calls: Mutex<Vec<BackendCall>>,
    fail_status: AtomicBool,
    refund_attempts: AtomicUsize,
    /// 1-based `create_refund` attempt that fails; 0 never fails.
    fail_refund_attempt: AtomicUsize,
}

impl FakeBackend {
    pub(crate) fn with_order(order: Order) -> Self {
        let backend = Self::default();
        backend.orders.lock().unwrap().insert(order.id, order);
        backend
    }

    pub(crate) fn order(&self, order_id: OrderId) -> Order {
        self.orders.lock().unwrap()[&order_id].clone()
    }

    pub(crate) fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn notes(&self, order_id: OrderId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                BackendCall::AddNote(id, note) if id == order_id => Some(note),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn fail_status_updates(&self, fail: bool) {
        self.fail_status.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_refund_attempt(&self, attempt: usize) {
        self.fail_refund_attempt.store(attempt, Ordering::SeqCst);
    }

    fn with_order_mut(
        &self,
        order_id: OrderId,
        f: impl FnOnce(&mut Order),
    ) -> Result<(), BackendError> {
        let mut orders = self.orders.lock().unwrap();
        let order = orders
            .get_mut(&order_id)
            .ok_or(BackendError::OrderNotFound(order_id))?;
        f(order);
        Ok(())
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl OrderBackend for FakeBackend {
    async fn get_order(&self, order_id: OrderId) -> Result<Order, BackendError> {
        self.orders
            .lock()
            .unwrap()
            .get(&order_id)
            .cloned()
            .ok_or(BackendError::OrderNotFound(order_id))
    }

    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        note: Option<&str>,
    ) -> Result<(), BackendError> {
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(BackendError::Request("shop unavailable".to_string()));
        }
        self.with_order_mut(order_id, |o| o.status = status)?;
        self.record(BackendCall::UpdateStatus(order_id, status));
        if let Some(note) = note {
            self.record(BackendCall::AddNote(order_id, note.to_string()));
        }
        Ok(())
    }

    async fn add_note(&self, order_id: OrderId, note: &str) -> Result<(), BackendError> {
        self.record(BackendCall::AddNote(order_id, note.to_string()));
        Ok(())
    }

    async fn payment_complete(
        &self,
        order_id: OrderId,
        transaction_id: Option<&str>,
    ) -> Result<(), BackendError> {
        self.with_order_mut(order_id, |o| o.status = OrderStatus::Processing)?;
        self.record(BackendCall::PaymentComplete(
            order_id,
            transaction_id.map(str::to_string),
        ));
        Ok(())
    }

    async fn create_refund(
        &self,
        order_id: OrderId,
        refund: &RefundLine,
    ) -> Result<(), BackendError> {
        let attempt = self.refund_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == self.fail_refund_attempt.load(Ordering::SeqCst) {
            return Err(BackendError::Request("refund endpoint unavailable".to_string()));
        }
        self.with_order_mut(order_id, |o| {
            o.total_refunded += refund.amount;
            if o.total_refunded >= o.total {
                o.status = OrderStatus::Refunded;
            }
        })?;
        self.record(BackendCall::CreateRefund(order_id, refund.clone()));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeNotifier {
    merchant: Mutex<Vec<Notification>>,
    buyer: Mutex<Vec<(OrderId, Notification)>>,
}

impl FakeNotifier {
    pub(crate) fn merchant_messages(&self) -> Vec<Notification> {
        self.merchant.lock().unwrap().clone()
    }

    pub(crate) fn buyer_messages(&self) -> Vec<(OrderId, Notification)> {
        self.buyer.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn notify_merchant(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.merchant.lock().unwrap().push(notification.clone());
        Ok(())
    }

    async fn notify_buyer(
        &self,
        order: &Order,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        self.buyer
            .lock()
            .unwrap()
            .push((order.id, notification.clone()));
        Ok(())
    }
}

/// Gateway whose answers are queued per operation. An operation with no
/// queued answer fails with a transport error.
#[derive(Debug, Default)]
pub(crate) struct FakeGateway {
    pub(crate) charge: Mutex<Option<Result<ChargeResponse, GatewayError>>>,
    pub(crate) cancel: Mutex<Option<Result<CancelResponse, GatewayError>>>,
    pub(crate) refund: Mutex<Option<Result<RefundResponse, GatewayError>>>,
    pub(crate) snapshot: Mutex<Option<Result<TransactionSnapshot, GatewayError>>>,
    pub(crate) options: Mutex<Option<Result<CheckoutOptions, GatewayError>>>,
    pub(crate) charges_sent: Mutex<Vec<ChargeRequest>>,
    pub(crate) refunds_sent: Mutex<Vec<(String, RefundKind, RefundRequest)>>,
    pub(crate) options_asked: Mutex<Vec<Decimal>>,
}

impl FakeGateway {
    fn take<T>(slot: &Mutex<Option<Result<T, GatewayError>>>) -> Result<T, GatewayError> {
        slot.lock().unwrap().take().unwrap_or_else(|| Err(transport_error()))
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResponse, GatewayError> {
        self.charges_sent.lock().unwrap().push(request.clone());
        Self::take(&self.charge)
    }

    async fn cancel(&self, _charge_id: &str) -> Result<CancelResponse, GatewayError> {
        Self::take(&self.cancel)
    }

    async fn refund(
        &self,
        charge_id: &str,
        kind: RefundKind,
        request: &RefundRequest,
    ) -> Result<RefundResponse, GatewayError> {
        self.refunds_sent
            .lock()
            .unwrap()
            .push((charge_id.to_string(), kind, request.clone()));
        Self::take(&self.refund)
    }

    async fn get_charge(&self, _charge_id: &str) -> Result<TransactionSnapshot, GatewayError> {
        Self::take(&self.snapshot)
    }

    async fn checkout_options(&self, amount: Decimal) -> Result<CheckoutOptions, GatewayError> {
        self.options_asked.lock().unwrap().push(amount);
        Self::take(&self.options)
    }

    async fn billet_download(&self, charge_id: &str) -> Result<BilletDownload, GatewayError> {
        Ok(BilletDownload {
            html: format!("<html>{charge_id}</html>"),
        })
    }

    fn verify_webhook(&self, body: &[u8], signature: &str) -> Result<(), SignatureError> {
        signature::verify(WEBHOOK_KEY.as_bytes(), body, signature)
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeLogistics {
    pub(crate) batch: Mutex<Option<Result<LogisticsEnvelope<serde_json::Value>, GatewayError>>>,
    pub(crate) order: Mutex<Option<Result<LogisticsEnvelope<LogisticsOrder>, GatewayError>>>,
    pub(crate) orders_asked: Mutex<Vec<String>>,
}

#[async_trait]
impl Logistics for FakeLogistics {
    async fn create_calculation(
        &self,
        body: &serde_json::Value,
    ) -> Result<LogisticsEnvelope<serde_json::Value>, GatewayError> {
        Ok(LogisticsEnvelope {
            status: "OK".to_string(),
            content: Some(body.clone()),
            messages: Vec::new(),
        })
    }

    async fn create_batch(
        &self,
        _body: &serde_json::Value,
    ) -> Result<LogisticsEnvelope<serde_json::Value>, GatewayError> {
        FakeGateway::take(&self.batch)
    }

    async fn get_order(
        &self,
        order_id: &str,
    ) -> Result<LogisticsEnvelope<LogisticsOrder>, GatewayError> {
        self.orders_asked.lock().unwrap().push(order_id.to_string());
        FakeGateway::take(&self.order)
    }
}
