//! Payment status values reported by the gateway.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Status of a charge as reported by the gateway, either in the `result`
/// field of a synchronous response or in the `status` field of a webhook.
///
/// `partial_refunded` is folded into [`GatewayStatus::Refunded`]. Values the
/// gateway may add in the future are kept verbatim in
/// [`GatewayStatus::Other`] so they can be accepted as no-ops.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GatewayStatus {
    Pending,
    Authorized,
    Approved,
    Cancelled,
    Failure,
    Declined,
    Refunded,
    Other(String),
}

impl GatewayStatus {
    /// Normalize a raw status string.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim() {
            "pending" => Self::Pending,
            "authorized" => Self::Authorized,
            "approved" => Self::Approved,
            "cancelled" => Self::Cancelled,
            "failure" => Self::Failure,
            "declined" => Self::Declined,
            "refunded" | "partial_refunded" => Self::Refunded,
            other => Self::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Authorized => "authorized",
            Self::Approved => "approved",
            Self::Cancelled => "cancelled",
            Self::Failure => "failure",
            Self::Declined => "declined",
            Self::Refunded => "refunded",
            Self::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for GatewayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for GatewayStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for GatewayStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&raw))
    }
}
