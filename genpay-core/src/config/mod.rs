//! Runtime settings for the checkout flow.
//!
//! Loaded and validated by the server crate, then passed in explicitly.

use time::{Date, OffsetDateTime, UtcOffset};

pub const DEFAULT_DASHBOARD_URL: &str = "https://dashboard.genpay.com.br";
pub const DEFAULT_LOGISTICS_METHOD_ID: &str = "rakuten-log";

/// Days a billet stays payable.
pub const BILLET_EXPIRY_DAYS: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSettings {
    /// URL the gateway posts status notifications to.
    pub webhook_url: String,
    pub currency: String,
    /// Installment counts up to this value are always interest-free.
    pub free_installments: u32,
    /// Whether the buyer pays interest above `free_installments`.
    pub buyer_interest: bool,
    /// Shop timezone, used for billet due dates.
    pub utc_offset: UtcOffset,
    pub dashboard_url: String,
    /// Shipping method id of the logistics partner.
    pub logistics_method_id: String,
}

impl CheckoutSettings {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            currency: "BRL".to_owned(),
            free_installments: 1,
            buyer_interest: false,
            utc_offset: UtcOffset::UTC,
            dashboard_url: DEFAULT_DASHBOARD_URL.to_owned(),
            logistics_method_id: DEFAULT_LOGISTICS_METHOD_ID.to_owned(),
        }
    }

    /// Today's date in the shop timezone.
    pub fn today(&self) -> Date {
        OffsetDateTime::now_utc().to_offset(self.utc_offset).date()
    }

    /// Link to a sale on the merchant dashboard.
    pub fn dashboard_link(&self, transaction_id: &str) -> String {
        format!(
            "{}/sales/{}",
            self.dashboard_url.trim_end_matches('/'),
            transaction_id
        )
    }
}
