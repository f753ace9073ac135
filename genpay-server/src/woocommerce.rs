//! Order backend over the WooCommerce REST API (v3).
//!
//! Authenticates with the shop's consumer key and secret as HTTP Basic
//! credentials. Money fields arrive as decimal strings (`"150.00"`).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use genpay_core::backend::{BackendError, OrderBackend, RefundLine};
use genpay_core::entities::{
    Address, Order, OrderId, OrderItem, OrderStatus, PaymentMethodKind, ProductCategory,
    ShippingLine,
};
use reqwest::{Client, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crate::config::ShopSettings;

const SHOP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct WooCommerceBackend {
    http: Client,
    base_url: Url,
    consumer_key: String,
    consumer_secret: String,
}

impl WooCommerceBackend {
    pub fn new(settings: &ShopSettings) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(Duration::from_secs(SHOP_TIMEOUT_SECS))
            .build()?;
        let mut base_url = settings.base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http,
            base_url,
            consumer_key: settings.consumer_key.clone(),
            consumer_secret: settings.consumer_secret.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::Request(format!("invalid shop url: {e}")))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        order_id: OrderId,
    ) -> Result<T, BackendError> {
        let resp = request
            .basic_auth(&self.consumer_key, Some(&self.consumer_secret))
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::OrderNotFound(order_id));
        }
        if !status.is_success() {
            return Err(BackendError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        serde_json::from_str(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn put_order(&self, order_id: OrderId, body: serde_json::Value) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("orders/{order_id}"))?;
        self.send::<serde_json::Value>(self.http.put(url).json(&body), order_id)
            .await?;
        Ok(())
    }

    async fn post_note(
        &self,
        order_id: OrderId,
        note: &str,
        customer_note: bool,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("orders/{order_id}/notes"))?;
        let body = json!({ "note": note, "customer_note": customer_note });
        self.send::<serde_json::Value>(self.http.post(url).json(&body), order_id)
            .await?;
        Ok(())
    }

    /// A note the shop also e-mails to the buyer.
    pub async fn add_customer_note(&self, order_id: OrderId, note: &str) -> Result<(), BackendError> {
        self.post_note(order_id, note, true).await
    }

    async fn product_categories(
        &self,
        order_id: OrderId,
        product_id: i64,
    ) -> Result<Vec<ProductCategory>, BackendError> {
        let url = self.endpoint(&format!("products/{product_id}"))?;
        match self.send::<WcProduct>(self.http.get(url), order_id).await {
            Ok(product) => Ok(product
                .categories
                .into_iter()
                .map(|c| ProductCategory {
                    id: c.id.to_string(),
                    name: c.name,
                })
                .collect()),
            // Deleted products keep their line items.
            Err(BackendError::OrderNotFound(_)) => {
                tracing::debug!(order_id, product_id, "product no longer exists");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl OrderBackend for WooCommerceBackend {
    #[tracing::instrument(skip(self), err)]
    async fn get_order(&self, order_id: OrderId) -> Result<Order, BackendError> {
        let url = self.endpoint(&format!("orders/{order_id}"))?;
        let wc: WcOrder = self.send(self.http.get(url), order_id).await?;

        let mut categories = HashMap::new();
        for item in &wc.line_items {
            if item.product_id != 0 && !categories.contains_key(&item.product_id) {
                let found = self.product_categories(order_id, item.product_id).await?;
                categories.insert(item.product_id, found);
            }
        }
        wc.into_order(&categories)
    }

    async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        note: Option<&str>,
    ) -> Result<(), BackendError> {
        self.put_order(order_id, json!({ "status": status.as_str() }))
            .await?;
        if let Some(note) = note {
            self.post_note(order_id, note, false).await?;
        }
        Ok(())
    }

    async fn add_note(&self, order_id: OrderId, note: &str) -> Result<(), BackendError> {
        self.post_note(order_id, note, false).await
    }

    async fn payment_complete(
        &self,
        order_id: OrderId,
        transaction_id: Option<&str>,
    ) -> Result<(), BackendError> {
        let mut body = json!({ "set_paid": true });
        if let Some(id) = transaction_id {
            body["transaction_id"] = json!(id);
        }
        self.put_order(order_id, body).await
    }

    async fn create_refund(
        &self,
        order_id: OrderId,
        refund: &RefundLine,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(&format!("orders/{order_id}/refunds"))?;
        self.send::<serde_json::Value>(self.http.post(url).json(&refund_body(refund)), order_id)
            .await?;
        Ok(())
    }
}

fn refund_body(refund: &RefundLine) -> serde_json::Value {
    json!({
        "amount": refund.amount.round_dp(2).to_string(),
        "reason": refund.reason,
        "api_refund": refund.refund_payment,
        "api_restock": refund.restock_items,
        "line_items": [],
    })
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[derive(Debug, Deserialize)]
struct WcOrder {
    id: i64,
    #[serde(default)]
    number: String,
    status: String,
    #[serde(default)]
    currency: String,
    #[serde(default)]
    total: Decimal,
    #[serde(default)]
    shipping_total: Decimal,
    #[serde(default)]
    total_tax: Decimal,
    #[serde(default)]
    discount_total: Decimal,
    #[serde(default)]
    customer_ip_address: String,
    #[serde(default)]
    payment_method: String,
    #[serde(default)]
    billing: WcAddress,
    #[serde(default)]
    shipping: WcAddress,
    #[serde(default)]
    line_items: Vec<WcLineItem>,
    #[serde(default)]
    shipping_lines: Vec<WcShippingLine>,
    #[serde(default)]
    refunds: Vec<WcRefund>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WcAddress {
    first_name: String,
    last_name: String,
    company: String,
    address_1: String,
    address_2: String,
    city: String,
    state: String,
    postcode: String,
    country: String,
    email: Option<String>,
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WcLineItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    product_id: i64,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    quantity: u32,
    /// Line total before discounts.
    #[serde(default)]
    subtotal: Decimal,
    #[serde(default)]
    total: Decimal,
}

#[derive(Debug, Deserialize)]
struct WcShippingLine {
    #[serde(default)]
    method_id: String,
    #[serde(default)]
    meta_data: Vec<WcMeta>,
}

#[derive(Debug, Deserialize)]
struct WcMeta {
    key: String,
    #[serde(default)]
    value: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WcRefund {
    /// Negative, e.g. `"-10.00"`.
    #[serde(default)]
    total: Decimal,
}

#[derive(Debug, Deserialize)]
struct WcProduct {
    #[serde(default)]
    categories: Vec<WcCategory>,
}

#[derive(Debug, Deserialize)]
struct WcCategory {
    id: i64,
    #[serde(default)]
    name: String,
}

fn parse_status(raw: &str) -> Result<OrderStatus, BackendError> {
    Ok(match raw {
        "pending" => OrderStatus::Pending,
        "on-hold" => OrderStatus::OnHold,
        "processing" => OrderStatus::Processing,
        "completed" => OrderStatus::Completed,
        "cancelled" => OrderStatus::Cancelled,
        "failed" => OrderStatus::Failed,
        "refunded" => OrderStatus::Refunded,
        other => return Err(BackendError::Decode(format!("unknown order status {other:?}"))),
    })
}

fn parse_payment_method(raw: &str) -> Option<PaymentMethodKind> {
    let raw = raw.to_ascii_lowercase();
    if raw.contains("billet") || raw.contains("boleto") {
        Some(PaymentMethodKind::Billet)
    } else if raw.contains("credit") {
        Some(PaymentMethodKind::CreditCard)
    } else {
        None
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn meta_string(meta: &[WcMeta], key: &str) -> Option<String> {
    meta.iter().find(|m| m.key == key).and_then(|m| match &m.value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

impl From<WcAddress> for Address {
    fn from(a: WcAddress) -> Self {
        Address {
            first_name: a.first_name,
            last_name: a.last_name,
            company: a.company,
            address_1: a.address_1,
            address_2: a.address_2,
            city: a.city,
            state: a.state,
            postcode: a.postcode,
            country: a.country,
            email: non_empty(a.email),
            phone: non_empty(a.phone),
        }
    }
}

impl WcOrder {
    fn into_order(
        self,
        categories: &HashMap<i64, Vec<ProductCategory>>,
    ) -> Result<Order, BackendError> {
        let status = parse_status(&self.status)?;
        let subtotal: Decimal = self.line_items.iter().map(|i| i.subtotal).sum();
        let total_refunded: Decimal = self.refunds.iter().map(|r| r.total.abs()).sum();
        let items = self
            .line_items
            .into_iter()
            .map(|item| {
                let price = if item.quantity == 0 {
                    item.subtotal
                } else {
                    (item.subtotal / Decimal::from(item.quantity)).round_dp(2)
                };
                OrderItem {
                    product_id: item.product_id,
                    sku: non_empty(item.sku),
                    name: item.name,
                    quantity: item.quantity,
                    price,
                    total: item.total,
                    categories: categories.get(&item.product_id).cloned().unwrap_or_default(),
                }
            })
            .collect();
        let shipping_lines = self
            .shipping_lines
            .into_iter()
            .map(|line| ShippingLine {
                calculation_code: meta_string(&line.meta_data, "calculation_code"),
                postage_service_code: meta_string(&line.meta_data, "postage_service_code"),
                method_id: line.method_id,
            })
            .collect();

        Ok(Order {
            id: self.id,
            number: if self.number.is_empty() {
                self.id.to_string()
            } else {
                self.number
            },
            status,
            currency: self.currency,
            total: self.total,
            subtotal,
            shipping_total: self.shipping_total,
            total_tax: self.total_tax,
            discount_total: self.discount_total,
            total_refunded,
            customer_ip: self.customer_ip_address,
            payment_method: parse_payment_method(&self.payment_method),
            billing: self.billing.into(),
            shipping: self.shipping.into(),
            items,
            shipping_lines,
        })
    }
}
