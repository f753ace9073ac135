//! Notification body pushed by the gateway to the webhook URL.

use serde::{Deserialize, Serialize};

use super::response::RefundEntry;
use super::status::GatewayStatus;

/// A status change for a charge.
///
/// `uuid` is the charge id returned at charge time. `refunds` is present on
/// `refunded` notifications that itemize what was returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookNotification {
    pub uuid: String,
    pub status: GatewayStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refunds: Option<Vec<RefundEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_messages: Option<Vec<String>>,
}
