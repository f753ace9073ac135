//! Bodies exchanged with the logistics partner.
//!
//! Calculation and batch request bodies are assembled by the shop and
//! forwarded as-is, so they are kept as raw JSON here. Only the parts of
//! the responses that drive tracking are typed.

use serde::{Deserialize, Serialize};

/// Envelope used by every logistics response: `status` is `"OK"` or
/// `"ERROR"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogisticsEnvelope<T> {
    #[serde(default)]
    pub status: String,
    pub content: Option<T>,
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
}

impl<T> LogisticsEnvelope<T> {
    pub fn is_error(&self) -> bool {
        self.status.eq_ignore_ascii_case("ERROR")
    }

    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("OK")
    }

    /// Flatten `messages` into printable strings.
    pub fn message_texts(&self) -> Vec<String> {
        self.messages
            .iter()
            .map(|m| match m {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Object(obj) => obj
                    .get("text")
                    .or_else(|| obj.get("description"))
                    .and_then(|v| v.as_str())
                    .map(str::to_owned)
                    .unwrap_or_else(|| m.to_string()),
                other => other.to_string(),
            })
            .collect()
    }
}

/// Content of `GET order/{id}` once a batch has been created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogisticsOrder {
    #[serde(default)]
    pub trackings_number: Vec<String>,
    #[serde(default)]
    pub tracking_print_url: Option<String>,
    #[serde(default)]
    pub batch_print_url: Option<String>,
    #[serde(default)]
    pub batch_code: Option<String>,
    #[serde(default)]
    pub shipping_option: Option<ShippingOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingOption {
    #[serde(default)]
    pub volumes: Vec<Volume>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    #[serde(default)]
    pub number: Option<String>,
}

/// Tracking details extracted from a [`LogisticsOrder`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentTracking {
    pub tracking_code: Option<String>,
    pub tracking_url: Option<String>,
    pub print_url: Option<String>,
    pub batch_code: Option<String>,
    pub volume: Option<String>,
}

impl From<LogisticsOrder> for ShipmentTracking {
    fn from(order: LogisticsOrder) -> Self {
        let volume = order
            .shipping_option
            .and_then(|option| option.volumes.into_iter().next())
            .and_then(|volume| volume.number);
        Self {
            tracking_code: order.trackings_number.into_iter().next(),
            tracking_url: order.tracking_print_url,
            print_url: order.batch_print_url,
            batch_code: order.batch_code,
            volume,
        }
    }
}
