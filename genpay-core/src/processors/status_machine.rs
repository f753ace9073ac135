//! Maps gateway statuses onto the order lifecycle.
//!
//! The machine is split in two. [`plan_transition`] is pure: given the
//! order, the stored [`TransactionRecord`] and an incoming update it
//! decides whether anything happens, what the record becomes and which side
//! effects to run. [`StatusMachine`] claims the new record with a
//! compare-and-swap save and only then runs the effects, so two concurrent
//! deliveries of the same update cannot both fire them.
//!
//! Synchronous charge results and webhooks both enter through
//! [`StatusMachine::apply`].

use std::sync::Arc;

use genpay_sdk::objects::GatewayStatus;
use genpay_sdk::objects::response::RefundEntry;
use genpay_sdk::objects::webhook::WebhookNotification;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, Notification, Notifier, OrderBackend, RefundLine};
use crate::config::CheckoutSettings;
use crate::entities::{Order, OrderId, OrderStatus, TransactionRecord};
use crate::store::{StoreError, TransactionStore};
use crate::utils::money::{same_amount, to_minor_precision};

/// Attempts at claiming a record before giving up on contention.
const MAX_CLAIM_ATTEMPTS: usize = 3;

const FULL_REFUND_REASON: &str = "Order fully refunded";

/// A status reported by the gateway, with the payload parts transitions
/// look at.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: GatewayStatus,
    /// Itemized refunds. `None` on a `refunded` status means the whole
    /// remaining balance was returned.
    pub refunds: Option<Vec<RefundEntry>>,
    pub result_messages: Vec<String>,
}

impl StatusUpdate {
    pub fn new(status: GatewayStatus) -> Self {
        Self {
            status,
            refunds: None,
            result_messages: Vec::new(),
        }
    }

    fn messages(&self) -> String {
        self.result_messages.join(" - ")
    }
}

impl From<WebhookNotification> for StatusUpdate {
    fn from(notification: WebhookNotification) -> Self {
        Self {
            status: notification.status,
            refunds: notification.refunds,
            result_messages: notification.result_messages.unwrap_or_default(),
        }
    }
}

/// A side effect on the shop, run after the record is claimed.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    UpdateStatus {
        status: OrderStatus,
        note: Option<String>,
    },
    AddNote(String),
    PaymentComplete {
        transaction_id: Option<String>,
    },
    /// `refund_id` is the gateway refund the line settles, if itemized.
    CreateRefund {
        refund_id: Option<String>,
        line: RefundLine,
    },
    NotifyMerchant(Notification),
    NotifyBuyer(Notification),
}

impl Effect {
    /// Effects whose failure leaves the order in the wrong state. The
    /// claim is released so a redelivery can try again.
    fn is_critical(&self) -> bool {
        matches!(
            self,
            Effect::UpdateStatus { .. }
                | Effect::PaymentComplete { .. }
                | Effect::CreateRefund { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Nothing to do. The reason is only logged.
    Skip(&'static str),
    Apply {
        record: TransactionRecord,
        effects: Vec<Effect>,
    },
}

/// Decide what `update` does to `order`.
pub fn plan_transition(
    order: &Order,
    record: &TransactionRecord,
    update: &StatusUpdate,
    settings: &CheckoutSettings,
) -> Transition {
    let mut next = record.clone();
    next.last_status = Some(update.status.as_str().to_owned());
    let repeated = record.last_status.as_deref() == Some(update.status.as_str());
    let number = &order.number;

    let effects = match &update.status {
        GatewayStatus::Pending => {
            if repeated {
                return Transition::Skip("pending already applied");
            }
            let link = record
                .transaction_id
                .as_deref()
                .map(|id| format!(" Payment details: {}", settings.dashboard_link(id)))
                .unwrap_or_default();
            vec![
                Effect::UpdateStatus {
                    status: OrderStatus::Pending,
                    note: None,
                },
                Effect::NotifyBuyer(Notification::new(
                    format!("Order {number} is awaiting payment"),
                    "Payment pending",
                    format!(
                        "We are waiting for the payment confirmation of order {number}. \
                         You will be notified as soon as it is confirmed.{link}"
                    ),
                )),
                Effect::AddNote("Waiting for payment confirmation".to_owned()),
            ]
        }
        GatewayStatus::Authorized => {
            if order.status.is_paid() || record.approved {
                return Transition::Skip("order already paid");
            }
            if repeated {
                return Transition::Skip("authorized already applied");
            }
            vec![Effect::UpdateStatus {
                status: OrderStatus::OnHold,
                note: Some("Payment authorized, awaiting capture".to_owned()),
            }]
        }
        GatewayStatus::Approved => {
            if order.status == OrderStatus::Completed || record.approved {
                return Transition::Skip("order already paid");
            }
            next.approved = true;
            vec![
                Effect::AddNote("Transaction paid".to_owned()),
                Effect::PaymentComplete {
                    transaction_id: record.transaction_id.clone(),
                },
            ]
        }
        GatewayStatus::Cancelled => {
            if order.status.is_paid() || record.approved {
                return Transition::Skip("order already paid");
            }
            if record.cancelled {
                return Transition::Skip("order already cancelled");
            }
            next.cancelled = true;
            let link = record
                .transaction_id
                .as_deref()
                .map(|id| format!(" Sale: {}", settings.dashboard_link(id)))
                .unwrap_or_default();
            vec![
                Effect::UpdateStatus {
                    status: OrderStatus::Cancelled,
                    note: None,
                },
                Effect::NotifyMerchant(Notification::new(
                    format!("Order {number} cancelled"),
                    "Payment cancelled",
                    format!("The payment of order {number} was cancelled at the gateway.{link}"),
                )),
                Effect::NotifyBuyer(Notification::new(
                    format!("Order {number} cancelled"),
                    "Order cancelled",
                    format!("Your order {number} was cancelled."),
                )),
                Effect::AddNote("Order cancelled at the gateway".to_owned()),
            ]
        }
        GatewayStatus::Failure => {
            if record.failure {
                return Transition::Skip("failure already applied");
            }
            next.failure = true;
            let messages = update.messages();
            vec![
                Effect::UpdateStatus {
                    status: OrderStatus::Cancelled,
                    note: None,
                },
                Effect::NotifyBuyer(Notification::new(
                    format!("Order {number} cancelled"),
                    "Payment failed",
                    format!("The payment of order {number} could not be processed. {messages}")
                        .trim_end()
                        .to_owned(),
                )),
                Effect::AddNote(format!("Order cancelled because {messages}")),
            ]
        }
        GatewayStatus::Declined => {
            if record.declined {
                return Transition::Skip("decline already applied");
            }
            next.declined = true;
            let messages = update.messages();
            vec![
                Effect::UpdateStatus {
                    status: OrderStatus::Failed,
                    note: None,
                },
                Effect::NotifyBuyer(Notification::new(
                    format!("Payment of order {number} declined"),
                    "Payment declined",
                    format!("The payment of order {number} was declined. {messages}")
                        .trim_end()
                        .to_owned(),
                )),
                Effect::AddNote(format!("Payment declined: {messages}")),
            ]
        }
        GatewayStatus::Refunded => match plan_refund(order, record, &mut next, update) {
            Ok(effects) => effects,
            Err(reason) => return Transition::Skip(reason),
        },
        GatewayStatus::Other(_) => return Transition::Skip("unrecognized status"),
    };

    Transition::Apply {
        record: next,
        effects,
    }
}

fn plan_refund(
    order: &Order,
    record: &TransactionRecord,
    next: &mut TransactionRecord,
    update: &StatusUpdate,
) -> Result<Vec<Effect>, &'static str> {
    if order.status == OrderStatus::OnHold {
        return Err("order is on hold");
    }
    if record.fully_refunded || same_amount(order.total, order.total_refunded) {
        return Err("order already fully refunded");
    }

    let mut effects = Vec::new();
    let mut refunded = order.total_refunded;
    match &update.refunds {
        Some(entries) => {
            let mut added = false;
            for entry in entries {
                if !next.push_refund_id(&entry.id) {
                    continue;
                }
                added = true;
                let Some(amount) = entry.amount.filter(|a| *a > Decimal::ZERO) else {
                    continue;
                };
                refunded += amount;
                effects.push(Effect::CreateRefund {
                    refund_id: Some(entry.id.clone()),
                    line: RefundLine {
                        amount: to_minor_precision(amount),
                        reason: entry
                            .reason
                            .clone()
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| format!("Gateway refund {}", entry.id)),
                        refund_payment: false,
                        restock_items: true,
                    },
                });
            }
            if !added {
                return Err("refund ids already applied");
            }
        }
        None => {
            let remaining = order.total - order.total_refunded;
            refunded = order.total;
            effects.push(Effect::CreateRefund {
                refund_id: None,
                line: RefundLine {
                    amount: to_minor_precision(remaining),
                    reason: FULL_REFUND_REASON.to_owned(),
                    refund_payment: false,
                    restock_items: true,
                },
            });
        }
    }

    let full = to_minor_precision(refunded) >= to_minor_precision(order.total);
    next.fully_refunded = full;
    let number = &order.number;
    let note = if full {
        "Full refund confirmed by the gateway".to_owned()
    } else {
        format!(
            "Partial refund confirmed by the gateway, {} {} refunded so far",
            order.currency,
            to_minor_precision(refunded)
        )
    };
    effects.push(Effect::AddNote(note.clone()));
    effects.push(Effect::NotifyMerchant(Notification::new(
        format!("Order {number} refunded"),
        if full { "Order refunded" } else { "Order partially refunded" },
        format!("Order {number}: {note}."),
    )));
    Ok(effects)
}

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("shop error: {0}")]
    Backend(#[from] BackendError),
    #[error("gave up claiming the transaction record of order {0}")]
    Contention(OrderId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusOutcome {
    Applied(TransactionRecord),
    Skipped(&'static str),
}

impl StatusOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, StatusOutcome::Applied(_))
    }
}

/// Runs planned transitions against the shop.
#[derive(Clone)]
pub struct StatusMachine {
    store: Arc<dyn TransactionStore>,
    backend: Arc<dyn OrderBackend>,
    notifier: Arc<dyn Notifier>,
    settings: Arc<CheckoutSettings>,
}

impl StatusMachine {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        backend: Arc<dyn OrderBackend>,
        notifier: Arc<dyn Notifier>,
        settings: Arc<CheckoutSettings>,
    ) -> Self {
        Self {
            store,
            backend,
            notifier,
            settings,
        }
    }

    #[tracing::instrument(skip_all, fields(order_id = order.id, status = %update.status))]
    pub async fn apply(
        &self,
        order: &Order,
        update: &StatusUpdate,
    ) -> Result<StatusOutcome, StatusError> {
        for _ in 0..MAX_CLAIM_ATTEMPTS {
            let current = self.store.load_or_new(order.id).await?;
            let (next, effects) = match plan_transition(order, &current, update, &self.settings) {
                Transition::Skip(reason) => {
                    debug!(reason, "status update skipped");
                    return Ok(StatusOutcome::Skipped(reason));
                }
                Transition::Apply { record, effects } => (record, effects),
            };
            let claimed = match self.store.save(next).await {
                Ok(claimed) => claimed,
                Err(StoreError::Conflict { .. }) => {
                    debug!("transaction record changed underneath, re-planning");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let mut settled_refunds = Vec::new();
            if let Err(e) = self.run_effects(order, &effects, &mut settled_refunds).await {
                self.release(current, claimed.version, &settled_refunds).await;
                return Err(e.into());
            }
            info!("status update applied");
            return Ok(StatusOutcome::Applied(claimed));
        }
        Err(StatusError::Contention(order.id))
    }

    /// Ids of itemized refunds created on the shop are pushed to
    /// `settled_refunds` as they succeed.
    async fn run_effects(
        &self,
        order: &Order,
        effects: &[Effect],
        settled_refunds: &mut Vec<String>,
    ) -> Result<(), BackendError> {
        for effect in effects {
            let result = match effect {
                Effect::UpdateStatus { status, note } => {
                    self.backend
                        .update_status(order.id, *status, note.as_deref())
                        .await
                }
                Effect::AddNote(note) => self.backend.add_note(order.id, note).await,
                Effect::PaymentComplete { transaction_id } => {
                    self.backend
                        .payment_complete(order.id, transaction_id.as_deref())
                        .await
                }
                Effect::CreateRefund { refund_id, line } => {
                    let result = self.backend.create_refund(order.id, line).await;
                    if let (Ok(()), Some(id)) = (&result, refund_id) {
                        settled_refunds.push(id.clone());
                    }
                    result
                }
                Effect::NotifyMerchant(notification) => {
                    if let Err(e) = self.notifier.notify_merchant(notification).await {
                        warn!(error = %e, "failed to notify merchant");
                    }
                    Ok(())
                }
                Effect::NotifyBuyer(notification) => {
                    if let Err(e) = self.notifier.notify_buyer(order, notification).await {
                        warn!(error = %e, "failed to notify buyer");
                    }
                    Ok(())
                }
            };
            match result {
                Err(e) if effect.is_critical() => return Err(e),
                Err(e) => warn!(error = %e, "order note failed"),
                Ok(()) => {}
            }
        }
        Ok(())
    }

    /// Put the pre-claim record back so the update can be retried. Refund
    /// ids already created on the shop stay recorded.
    async fn release(
        &self,
        previous: TransactionRecord,
        claimed_version: i64,
        settled_refunds: &[String],
    ) {
        let mut restored = TransactionRecord {
            version: claimed_version,
            ..previous
        };
        for id in settled_refunds {
            restored.push_refund_id(id);
        }
        if let Err(e) = self.store.save(restored).await {
            warn!(error = %e, "failed to release transaction record claim");
        }
    }
}
