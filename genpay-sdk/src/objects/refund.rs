//! Refund request payload sent to `POST charges/{id}/refund[_partial]`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Whether a refund returns the whole order total or a part of it.
///
/// Derived from the requested amount, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundKind {
    Total,
    Partial,
}

impl RefundKind {
    /// Path segment appended to `charges/{id}`.
    pub fn endpoint_suffix(self) -> &'static str {
        match self {
            RefundKind::Total => "refund",
            RefundKind::Partial => "refund_partial",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundRequest {
    /// Always `"merchant"`.
    #[serde(rename = "requesters")]
    pub requester: String,
    pub reason: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub payments: Vec<RefundPayment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundPayment {
    /// Gateway id of the payment being refunded.
    pub id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_account: Option<BankAccount>,
}

/// Destination account for billet refunds, which are paid out by bank
/// transfer instead of being reversed on a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub document: String,
    pub bank_code: String,
    pub bank_agency: String,
    pub bank_number: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requester_uses_gateway_field_name() {
        let request = RefundRequest {
            requester: "merchant".to_string(),
            reason: "damaged".to_string(),
            amount: Decimal::new(3000, 2),
            payments: vec![RefundPayment {
                id: "pay-1".to_string(),
                amount: Decimal::new(3000, 2),
                bank_account: None,
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["requesters"], "merchant");
        assert_eq!(json["amount"], serde_json::json!(30.0));
        assert!(json["payments"][0].get("bank_account").is_none());
    }

    #[test]
    fn test_endpoint_suffix() {
        assert_eq!(RefundKind::Total.endpoint_suffix(), "refund");
        assert_eq!(RefundKind::Partial.endpoint_suffix(), "refund_partial");
    }
}
