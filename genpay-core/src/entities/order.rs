//! The shop's view of an order.
//!
//! Orders are owned by the shop. This crate reads them through
//! [`OrderBackend`](crate::backend::OrderBackend) and only ever asks for
//! transitions; it never creates or deletes one.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type OrderId = i64;

/// Order lifecycle as the shop models it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    Pending,
    OnHold,
    Processing,
    Completed,
    Cancelled,
    Failed,
    Refunded,
}

impl OrderStatus {
    /// Paid and handed over to fulfillment.
    pub fn is_paid(self) -> bool {
        matches!(self, OrderStatus::Processing | OrderStatus::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::OnHold => "on-hold",
            OrderStatus::Processing => "processing",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Failed => "failed",
            OrderStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the two payment products the buyer chose at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    CreditCard,
    Billet,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub address_1: String,
    pub address_2: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Address {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_owned()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCategory {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: i64,
    pub sku: Option<String>,
    pub name: String,
    pub quantity: u32,
    /// Unit price.
    pub price: Decimal,
    /// Line total after discounts.
    pub total: Decimal,
    pub categories: Vec<ProductCategory>,
}

/// A shipping method applied to the order. Shipments quoted by the
/// logistics partner carry its calculation and postage codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingLine {
    pub method_id: String,
    pub calculation_code: Option<String>,
    pub postage_service_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Number shown to the buyer, which may differ from `id`.
    pub number: String,
    pub status: OrderStatus,
    pub currency: String,
    pub total: Decimal,
    pub subtotal: Decimal,
    pub shipping_total: Decimal,
    pub total_tax: Decimal,
    pub discount_total: Decimal,
    pub total_refunded: Decimal,
    pub customer_ip: String,
    pub payment_method: Option<PaymentMethodKind>,
    pub billing: Address,
    pub shipping: Address,
    pub items: Vec<OrderItem>,
    pub shipping_lines: Vec<ShippingLine>,
}

impl Order {
    pub fn billing_email(&self) -> Option<&str> {
        self.billing.email.as_deref().filter(|e| !e.is_empty())
    }
}
