//! Charge request payload sent to `POST charges`.
//!
//! Field order matters only in so far as the body is signed after
//! serialization; the structs below serialize deterministically.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Root of a charge request.
///
/// `amount` is the order total plus any installment interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub reference: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub currency: String,
    pub webhook_url: String,
    pub fingerprint: String,
    pub payments: Vec<Payment>,
    pub customer: Customer,
    pub order: OrderDetails,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commissionings: Vec<Commissioning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub document: String,
    pub name: String,
    pub business_name: String,
    pub email: String,
    pub birth_date: String,
    pub kind: String,
    pub addresses: Vec<Address>,
    pub phones: Vec<Phone>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    Billing,
    Shipping,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub kind: AddressKind,
    pub contact: String,
    pub street: String,
    pub complement: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub zipcode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone {
    pub kind: AddressKind,
    pub reference: String,
    pub number: PhoneNumber,
}

/// A Brazilian phone number split the way the gateway expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub country_code: String,
    pub area_code: String,
    pub number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub reference: String,
    pub payer_ip: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub items_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub taxes_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_amount: Decimal,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub reference: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub id: String,
}

/// Shipping commission attached when the order ships with the logistics
/// partner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commissioning {
    pub reference: String,
    pub kind: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub calculation_code: String,
    pub postage_service_code: String,
}

/// The single payment entry of a charge.
///
/// Card and billet payments are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Payment {
    CreditCard(CardPayment),
    Billet(BilletPayment),
}

impl Payment {
    pub fn amount(&self) -> Decimal {
        match self {
            Payment::CreditCard(card) => card.amount,
            Payment::Billet(billet) => billet.amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardPayment {
    pub reference: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub installments_quantity: u32,
    pub brand: String,
    pub token: String,
    pub cvv: String,
    pub holder_name: String,
    pub holder_document: String,
    pub options: CardOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installments: Option<InstallmentPlan>,
}

/// Card storage options. Charges are always single-shot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardOptions {
    pub save_card: bool,
    pub new_card: bool,
    pub recurrency: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BilletPayment {
    /// `YYYY-MM-DD`
    pub expires_on: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

/// A breakdown of a charge into `quantity` payments.
///
/// `installment_amount` is `total / quantity`; interest fields are zero
/// when the buyer does not pay interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentPlan {
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub interest_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub interest_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub installment_amount: Decimal,
}

impl InstallmentPlan {
    /// A plan where the merchant absorbs the financing cost.
    pub fn interest_free(total: Decimal, quantity: u32) -> Self {
        let installment_amount = if quantity == 0 {
            total
        } else {
            (total / Decimal::from(quantity))
                .round_dp_with_strategy(2, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
        };
        Self {
            total,
            quantity,
            interest_percent: Decimal::ZERO,
            interest_amount: Decimal::ZERO,
            installment_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_interest_free_plan() {
        let plan = InstallmentPlan::interest_free(dec("150.00"), 3);
        assert_eq!(plan.installment_amount, dec("50.00"));
        assert_eq!(plan.interest_amount, Decimal::ZERO);
        assert_eq!(plan.interest_percent, Decimal::ZERO);
    }

    #[test]
    fn test_interest_free_plan_rounding_stays_within_a_cent_per_installment() {
        let plan = InstallmentPlan::interest_free(dec("100.00"), 3);
        assert_eq!(plan.installment_amount, dec("33.33"));
        let drift = (plan.installment_amount * Decimal::from(plan.quantity) - plan.total).abs();
        assert!(drift <= dec("0.01") * Decimal::from(plan.quantity));
    }

    #[test]
    fn test_payment_variants_are_tagged_by_method() {
        let billet = Payment::Billet(BilletPayment {
            expires_on: "2026-10-22".to_string(),
            amount: dec("100.00"),
        });
        let json = serde_json::to_value(&billet).unwrap();
        assert_eq!(json["method"], "billet");
        assert_eq!(json["amount"], serde_json::json!(100.0));
        assert!(json.get("token").is_none());
    }

    #[test]
    fn test_amounts_keep_a_fraction_on_the_wire() {
        let plan = InstallmentPlan::interest_free(dec("150"), 3);
        let json = serde_json::to_string(&plan).unwrap();
        assert!(json.contains(r#""total":150.0"#));
        assert!(json.contains(r#""installment_amount":50.0"#));
    }
}
