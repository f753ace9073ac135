//! Buyer- and merchant-submitted inputs for charges and refunds.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::order::PaymentMethodKind;

/// Card data tokenized in the browser by the gateway's JS library.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    pub installments: u32,
    pub brand: String,
    pub token: String,
    pub cvv: String,
    pub holder_name: String,
    pub holder_document: String,
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("installments", &self.installments)
            .field("brand", &self.brand)
            .field("holder_name", &self.holder_name)
            .finish_non_exhaustive()
    }
}

/// The payment the buyer picked, with the data that payment needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentMethod {
    CreditCard(CardDetails),
    Billet,
}

impl PaymentMethod {
    pub fn kind(&self) -> PaymentMethodKind {
        match self {
            PaymentMethod::CreditCard(_) => PaymentMethodKind::CreditCard,
            PaymentMethod::Billet => PaymentMethodKind::Billet,
        }
    }
}

/// Checkout form fields that the shop does not store on the order itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutForm {
    pub payment: PaymentMethod,
    /// Anti-fraud device token.
    pub fingerprint: String,
    /// Buyer CPF.
    pub document: String,
    #[serde(default)]
    pub billing_number: Option<String>,
    #[serde(default)]
    pub billing_neighborhood: Option<String>,
    #[serde(default)]
    pub shipping_number: Option<String>,
    #[serde(default)]
    pub shipping_neighborhood: Option<String>,
    #[serde(default)]
    pub ship_to_different_address: bool,
}

/// Bank account a billet refund is paid out to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccountInput {
    pub document: String,
    pub bank_code: String,
    pub bank_agency: String,
    pub bank_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundInput {
    pub amount: Decimal,
    pub reason: String,
    #[serde(default)]
    pub bank_account: Option<BankAccountInput>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_debug_hides_secrets() {
        let card = CardDetails {
            installments: 3,
            brand: "visa".to_string(),
            token: "tok_123".to_string(),
            cvv: "999".to_string(),
            holder_name: "Maria Silva".to_string(),
            holder_document: "12345678909".to_string(),
        };
        let rendered = format!("{card:?}");
        assert!(!rendered.contains("tok_123"));
        assert!(!rendered.contains("999"));
    }

    #[test]
    fn test_payment_method_from_form_json() {
        let json = r#"{"method":"credit_card","installments":2,"brand":"Visa","token":"t","cvv":"1","holder_name":"A","holder_document":"1"}"#;
        let method: PaymentMethod = serde_json::from_str(json).unwrap();
        assert_eq!(method.kind(), PaymentMethodKind::CreditCard);
        let billet: PaymentMethod = serde_json::from_str(r#"{"method":"billet"}"#).unwrap();
        assert_eq!(billet, PaymentMethod::Billet);
    }
}
