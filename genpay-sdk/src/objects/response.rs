//! Response bodies returned by the payment gateway.
//!
//! The gateway is loose about which fields it sends back, so nearly
//! everything is optional or defaulted.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use super::charge::InstallmentPlan;
use super::status::GatewayStatus;

/// One entry of the `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorEntry {
    #[serde(default, deserialize_with = "string_or_number")]
    pub code: String,
    #[serde(default)]
    pub description: String,
}

impl std::fmt::Display for ApiErrorEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.code, self.description)
    }
}

/// Response to `POST charges`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargeResponse {
    #[serde(default)]
    pub result: Option<GatewayStatus>,
    #[serde(default)]
    pub charge_uuid: Option<String>,
    #[serde(default)]
    pub payments: Vec<ChargePaymentResult>,
    #[serde(default)]
    pub errors: Vec<ApiErrorEntry>,
}

impl ChargeResponse {
    /// Result messages of the first payment, joined the way they are shown
    /// on order notes.
    pub fn result_messages(&self) -> Option<String> {
        let first = self.payments.first()?;
        if first.result_messages.is_empty() {
            return None;
        }
        Some(first.result_messages.join(" - "))
    }

    pub fn masked_card_number(&self) -> Option<&str> {
        self.payments
            .first()?
            .credit_card
            .as_ref()?
            .number
            .as_deref()
    }

    pub fn billet_url(&self) -> Option<&str> {
        self.payments.first()?.billet.as_ref()?.url.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargePaymentResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub result_messages: Vec<String>,
    #[serde(default)]
    pub credit_card: Option<CardResult>,
    #[serde(default)]
    pub billet: Option<BilletResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardResult {
    #[serde(default)]
    pub number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilletResult {
    #[serde(default)]
    pub url: Option<String>,
}

/// Response to `POST charges/{id}/cancel`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CancelResponse {
    #[serde(default)]
    pub result: Option<GatewayStatus>,
    #[serde(default)]
    pub errors: Vec<ApiErrorEntry>,
}

/// Response to the refund endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefundResponse {
    #[serde(default)]
    pub result: Option<GatewayStatus>,
    #[serde(default)]
    pub refunds: Vec<RefundEntry>,
    #[serde(default)]
    pub errors: Vec<ApiErrorEntry>,
}

impl RefundResponse {
    /// Id of the refund that was just created.
    pub fn new_refund_id(&self) -> Option<&str> {
        self.refunds.first().map(|refund| refund.id.as_str())
    }
}

/// A refund as reported by the gateway, both in refund responses and in
/// `refunded` webhooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundEntry {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Raw transaction as returned by `GET charges/{id}`.
///
/// Only the fields the refund flow needs are typed; the rest is kept so the
/// snapshot can be handed back to callers unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionSnapshot {
    #[serde(default)]
    pub charge_uuid: Option<String>,
    #[serde(default)]
    pub result: Option<GatewayStatus>,
    #[serde(default)]
    pub payments: Vec<SnapshotPayment>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TransactionSnapshot {
    pub fn first_payment_id(&self) -> Option<&str> {
        self.payments.first().and_then(|p| p.id.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotPayment {
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Response to `GET checkout?amount=`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutOptions {
    #[serde(default)]
    pub payments: Vec<CheckoutPaymentMethod>,
}

impl CheckoutOptions {
    /// Installment table of the credit-card entry, if the gateway offered
    /// one.
    pub fn credit_card_installments(&self) -> Option<&[InstallmentPlan]> {
        self.payments
            .iter()
            .find(|p| p.method == "credit_card")
            .map(|p| p.installments.as_slice())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutPaymentMethod {
    pub method: String,
    #[serde(default)]
    pub installments: Vec<InstallmentPlan>,
}

/// Response to `GET charges/{id}/billet/download`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilletDownload {
    #[serde(default)]
    pub html: String,
}

/// Accept ids and codes the gateway sends either as strings or numbers.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    use serde::de::Error;
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!("expected string or number, got {other}"))),
    }
}

fn optional_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = string_or_number(deserializer)?;
    Ok((!value.is_empty()).then_some(value))
}
