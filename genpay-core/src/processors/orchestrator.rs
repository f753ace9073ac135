//! Drives charge, cancel and refund calls against the gateway.
//!
//! Gateway answers are sorted into the three failure tiers: transport,
//! protocol (non-200) and business (`result: "failure"`). No call is
//! retried here. Reported statuses are handed to the [`StatusMachine`].

use std::sync::Arc;

use genpay_sdk::client::GatewayError;
use genpay_sdk::objects::charge::{ChargeRequest, InstallmentPlan, Payment};
use genpay_sdk::objects::refund::{RefundKind, RefundRequest};
use genpay_sdk::objects::response::{
    ApiErrorEntry, BilletDownload, ChargeResponse, TransactionSnapshot,
};
use genpay_sdk::objects::GatewayStatus;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::status_machine::{StatusMachine, StatusUpdate};
use crate::backend::{BackendError, Notification, Notifier, OrderBackend};
use crate::builders::{BuildError, build_charge, build_refund};
use crate::config::CheckoutSettings;
use crate::entities::{
    CheckoutForm, Order, OrderId, PaymentDisplay, PaymentMethod, PaymentMethodKind, RefundInput,
    TransactionRecord, card_brand_name,
};
use crate::gateway::Gateway;
use crate::store::{StoreError, TransactionStore, update_record};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("the gateway offered no matching installment plan")]
    NoMatchingInstallmentPlan,
    #[error("order {0} has no gateway transaction")]
    NotCharged(OrderId),
    #[error("payment method of order {0} is unknown")]
    UnknownPaymentMethod(OrderId),
}

/// Result of a charge the gateway answered with 200.
#[derive(Debug, Clone, PartialEq)]
pub enum ChargeOutcome {
    /// The charge exists. Its status has been applied to the order; the
    /// buyer proceeds to the thank-you page whatever it is.
    Charged {
        transaction_id: Option<String>,
        status: Option<GatewayStatus>,
        display: PaymentDisplay,
    },
    /// The gateway refused the charge. Errors are shown to the buyer.
    Rejected { errors: Vec<ApiErrorEntry> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// The gateway answered but did not cancel.
    Refused { messages: Vec<String> },
    /// The gateway could not be reached. The merchant has been asked to
    /// cancel from the dashboard.
    ManualInterventionRequired,
}

#[derive(Clone)]
pub struct Orchestrator {
    gateway: Arc<dyn Gateway>,
    store: Arc<dyn TransactionStore>,
    backend: Arc<dyn OrderBackend>,
    notifier: Arc<dyn Notifier>,
    settings: Arc<CheckoutSettings>,
    machine: StatusMachine,
}

impl Orchestrator {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        store: Arc<dyn TransactionStore>,
        backend: Arc<dyn OrderBackend>,
        notifier: Arc<dyn Notifier>,
        settings: Arc<CheckoutSettings>,
    ) -> Self {
        let machine = StatusMachine::new(
            store.clone(),
            backend.clone(),
            notifier.clone(),
            settings.clone(),
        );
        Self {
            gateway,
            store,
            backend,
            notifier,
            settings,
            machine,
        }
    }

    pub fn status_machine(&self) -> &StatusMachine {
        &self.machine
    }

    pub fn store(&self) -> &Arc<dyn TransactionStore> {
        &self.store
    }

    pub fn backend(&self) -> &Arc<dyn OrderBackend> {
        &self.backend
    }

    pub fn gateway(&self) -> &Arc<dyn Gateway> {
        &self.gateway
    }

    /// Checkout entry point: price the installments, build the charge and
    /// send it.
    #[tracing::instrument(skip_all, fields(order_id = order_id))]
    pub async fn pay(
        &self,
        order_id: OrderId,
        form: &CheckoutForm,
    ) -> Result<ChargeOutcome, OrchestratorError> {
        let order = self.backend.get_order(order_id).await?;
        let plan = match &form.payment {
            PaymentMethod::CreditCard(card) => {
                Some(self.installment_plan(order.total, card.installments).await?)
            }
            PaymentMethod::Billet => None,
        };
        let request = build_charge(
            &order,
            form,
            plan.as_ref(),
            &self.settings,
            self.settings.today(),
        )?;
        self.charge(&order, &request).await
    }

    /// Interest-free unless the buyer pays interest on this quantity, in
    /// which case the gateway's own plan is used.
    async fn installment_plan(
        &self,
        total: Decimal,
        quantity: u32,
    ) -> Result<InstallmentPlan, OrchestratorError> {
        if quantity <= self.settings.free_installments || !self.settings.buyer_interest {
            return Ok(InstallmentPlan::interest_free(total, quantity));
        }
        self.fetch_installment_options(total)
            .await?
            .into_iter()
            .find(|plan| plan.quantity == quantity)
            .ok_or_else(|| {
                warn!(quantity, "no gateway plan for the chosen installment count");
                OrchestratorError::NoMatchingInstallmentPlan
            })
    }

    #[tracing::instrument(skip_all, fields(order_id = order.id))]
    pub async fn charge(
        &self,
        order: &Order,
        request: &ChargeRequest,
    ) -> Result<ChargeOutcome, OrchestratorError> {
        let response = match self.gateway.charge(request).await {
            Ok(response) => response,
            Err(GatewayError::Business { errors, .. }) => {
                warn!(errors = ?errors, "gateway refused the charge");
                return Ok(ChargeOutcome::Rejected { errors });
            }
            Err(e @ GatewayError::Protocol { .. }) => {
                warn!(error = %e, "charge failed");
                let partial = e
                    .body()
                    .and_then(|body| serde_json::from_str::<ChargeResponse>(body).ok());
                if let Some(update) = partial.as_ref().and_then(status_update) {
                    if let Err(status_err) = self.machine.apply(order, &update).await {
                        warn!(error = %status_err, "failed to apply status of failed charge");
                    }
                }
                return Err(e.into());
            }
            Err(e) => {
                warn!(error = %e, "charge failed");
                return Err(e.into());
            }
        };

        let display = payment_display(request, &response);
        let transaction_id = response.charge_uuid.clone();
        update_record(self.store.as_ref(), order.id, |record| {
            record.transaction_id = transaction_id.clone();
            record.display = display.clone();
        })
        .await?;
        info!(transaction_id = ?transaction_id, result = ?response.result, "charge created");

        if let Some(update) = status_update(&response) {
            if let Err(e) = self.machine.apply(order, &update).await {
                warn!(error = %e, "charge status not applied, waiting for the webhook");
            }
        }

        Ok(ChargeOutcome::Charged {
            transaction_id,
            status: response.result,
            display,
        })
    }

    #[tracing::instrument(skip_all, fields(order_id = order.id))]
    pub async fn cancel(&self, order: &Order) -> Result<CancelOutcome, OrchestratorError> {
        let transaction_id = self.transaction_id(order.id).await?;
        match self.gateway.cancel(&transaction_id).await {
            Ok(_) => {
                update_record(self.store.as_ref(), order.id, |record| {
                    record.cancelled = true;
                })
                .await?;
                info!(%transaction_id, "charge cancelled");
                Ok(CancelOutcome::Cancelled)
            }
            Err(e) if e.is_transport() => {
                warn!(error = %e, %transaction_id, "gateway unreachable during cancel");
                let link = self.settings.dashboard_link(&transaction_id);
                self.notify_merchant(Notification::new(
                    format!("Order {} could not be cancelled", order.number),
                    "Cancel the payment manually",
                    format!(
                        "The gateway could not be reached to cancel the payment of order {}. \
                         Cancel it from the dashboard: {link}",
                        order.number
                    ),
                ))
                .await;
                self.add_note(
                    order.id,
                    &format!("Cancel request failed, gateway unreachable. Cancel manually: {link}"),
                )
                .await;
                Ok(CancelOutcome::ManualInterventionRequired)
            }
            Err(e) => {
                warn!(error = %e, %transaction_id, "gateway refused the cancel");
                Ok(CancelOutcome::Refused {
                    messages: e.messages(),
                })
            }
        }
    }

    /// Send a refund. Returns the new gateway refund id, which is recorded
    /// so the matching webhook does not refund the order a second time.
    #[tracing::instrument(skip_all, fields(order_id = order.id, ?kind))]
    pub async fn refund(
        &self,
        order: &Order,
        kind: RefundKind,
        request: &RefundRequest,
    ) -> Result<Option<String>, OrchestratorError> {
        let transaction_id = self.transaction_id(order.id).await?;
        let response = match self.gateway.refund(&transaction_id, kind, request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, %transaction_id, "refund failed");
                let reason = e.messages().join("; ");
                self.notify_merchant(Notification::new(
                    format!("Refund of order {} failed", order.number),
                    "Refund failed",
                    format!(
                        "The refund of {} {} on order {} failed: {reason}. Sale: {}",
                        order.currency,
                        request.amount,
                        order.number,
                        self.settings.dashboard_link(&transaction_id)
                    ),
                ))
                .await;
                self.add_note(order.id, &format!("Refund failed: {reason}"))
                    .await;
                return Err(e.into());
            }
        };

        let refund_id = response.new_refund_id().map(str::to_owned);
        match &refund_id {
            Some(id) => {
                update_record(self.store.as_ref(), order.id, |record| {
                    record.push_refund_id(id);
                })
                .await?;
                info!(refund_id = %id, "refund accepted");
            }
            None => warn!("refund accepted without a refund id"),
        }
        Ok(refund_id)
    }

    /// Refund flow of the shop: look up the charge, build the refund and
    /// send it.
    #[tracing::instrument(skip_all, fields(order_id = order_id))]
    pub async fn process_refund(
        &self,
        order_id: OrderId,
        input: &RefundInput,
    ) -> Result<Option<String>, OrchestratorError> {
        let order = self.backend.get_order(order_id).await?;
        let record = self.store.load_or_new(order_id).await?;
        let method: PaymentMethodKind = order
            .payment_method
            .or(record.display.method)
            .ok_or(OrchestratorError::UnknownPaymentMethod(order_id))?;
        let snapshot = self.fetch_transaction(&order).await?;
        let (kind, request) = build_refund(&order, method, input, &snapshot)?;
        self.refund(&order, kind, &request).await
    }

    pub async fn fetch_transaction(
        &self,
        order: &Order,
    ) -> Result<TransactionSnapshot, OrchestratorError> {
        let transaction_id = self.transaction_id(order.id).await?;
        Ok(self.gateway.get_charge(&transaction_id).await?)
    }

    /// Credit-card installment table for `amount`.
    pub async fn fetch_installment_options(
        &self,
        amount: Decimal,
    ) -> Result<Vec<InstallmentPlan>, OrchestratorError> {
        let options = self.gateway.checkout_options(amount).await?;
        match options.credit_card_installments() {
            Some(plans) if !plans.is_empty() => Ok(plans.to_vec()),
            _ => Err(OrchestratorError::NoMatchingInstallmentPlan),
        }
    }

    pub async fn billet(&self, charge_id: &str) -> Result<BilletDownload, OrchestratorError> {
        Ok(self.gateway.billet_download(charge_id).await?)
    }

    pub async fn record(&self, order_id: OrderId) -> Result<TransactionRecord, OrchestratorError> {
        Ok(self.store.load_or_new(order_id).await?)
    }

    async fn transaction_id(&self, order_id: OrderId) -> Result<String, OrchestratorError> {
        self.store
            .load(order_id)
            .await?
            .and_then(|record| record.transaction_id)
            .ok_or(OrchestratorError::NotCharged(order_id))
    }

    async fn notify_merchant(&self, notification: Notification) {
        if let Err(e) = self.notifier.notify_merchant(&notification).await {
            warn!(error = %e, "failed to notify merchant");
        }
    }

    async fn add_note(&self, order_id: OrderId, note: &str) {
        if let Err(e) = self.backend.add_note(order_id, note).await {
            warn!(error = %e, "failed to add order note");
        }
    }
}

fn status_update(response: &ChargeResponse) -> Option<StatusUpdate> {
    let status = response.result.clone()?;
    Some(StatusUpdate {
        status,
        refunds: None,
        result_messages: response
            .payments
            .first()
            .map(|p| p.result_messages.clone())
            .unwrap_or_default(),
    })
}

fn payment_display(request: &ChargeRequest, response: &ChargeResponse) -> PaymentDisplay {
    let mut display = PaymentDisplay {
        amount: Some(request.amount),
        ..Default::default()
    };
    match request.payments.first() {
        Some(Payment::CreditCard(card)) => {
            display.method = Some(PaymentMethodKind::CreditCard);
            display.card_brand = Some(card_brand_name(&card.brand));
            display.installments = Some(card.installments_quantity);
            display.masked_number = response.masked_card_number().map(str::to_owned);
        }
        Some(Payment::Billet(_)) => {
            display.method = Some(PaymentMethodKind::Billet);
            display.billet_url = response.billet_url().map(str::to_owned);
        }
        None => {}
    }
    display
}
