//! TOML file configuration structures.
//!
//! These structs directly map to the `genpay-config.toml` file format.

use genpay_sdk::config::Environment;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub gateway: GatewayConfig,
    pub checkout: CheckoutConfig,
    #[serde(default)]
    pub logistics: Option<LogisticsConfig>,
    pub shop: ShopConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The address and port to listen on (e.g., "0.0.0.0:8080").
    #[serde(default = "default_listen_addr")]
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}

/// Payment gateway credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub environment: Environment,
    /// Replaces the environment's host.
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Merchant CNPJ.
    pub document: String,
    pub api_key: String,
    pub signature_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Public URL of this server's `/webhook` route.
    pub webhook_url: Url,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_free_installments")]
    pub free_installments: u32,
    #[serde(default)]
    pub buyer_interest: bool,
    /// Shop timezone as an offset from UTC, in hours.
    #[serde(default)]
    pub utc_offset_hours: i8,
    #[serde(default)]
    pub dashboard_url: Option<String>,
    #[serde(default)]
    pub logistics_method_id: Option<String>,
}

fn default_currency() -> String {
    "BRL".to_string()
}

fn default_free_installments() -> u32 {
    1
}

/// Logistics partner credentials. The section is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticsConfig {
    pub base_url: Url,
    pub document: String,
    pub api_key: String,
    pub signature_key: String,
}

/// WooCommerce REST API access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopConfig {
    /// e.g. `https://shop.example.com/wp-json/wc/v3/`
    pub base_url: Url,
    pub consumer_key: String,
    pub consumer_secret: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Merchant notifications are POSTed here as signed JSON. Logged only
    /// when unset.
    #[serde(default)]
    pub merchant_url: Option<Url>,
}

/// Service API authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Shared secret the shop signs service API requests with.
    pub secret: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[gateway]
document = "12.345.678/0001-90"
api_key = "key"
signature_key = "sig"

[checkout]
webhook_url = "https://pay.example.com/webhook"

[shop]
base_url = "https://shop.example.com/wp-json/wc/v3/"
consumer_key = "ck_1"
consumer_secret = "cs_1"

[service]
secret = "service-secret"
"#;

    #[test]
    fn test_minimal_config_parsing() {
        let config: FileConfig = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.server.listen.port(), 8080);
        assert_eq!(config.gateway.environment, Environment::Sandbox);
        assert_eq!(config.checkout.currency, "BRL");
        assert_eq!(config.checkout.free_installments, 1);
        assert!(!config.checkout.buyer_interest);
        assert!(config.logistics.is_none());
        assert!(config.notifications.merchant_url.is_none());
    }

    #[test]
    fn test_full_config_parsing() {
        let toml_str = r#"
[server]
listen = "127.0.0.1:3000"

[gateway]
environment = "production"
document = "12345678000190"
api_key = "key"
signature_key = "sig"

[checkout]
webhook_url = "https://pay.example.com/webhook"
free_installments = 3
buyer_interest = true
utc_offset_hours = -3
logistics_method_id = "genlog"

[logistics]
base_url = "https://logistics.example.com/v1"
document = "12345678000190"
api_key = "lkey"
signature_key = "lsig"

[shop]
base_url = "https://shop.example.com/wp-json/wc/v3/"
consumer_key = "ck_1"
consumer_secret = "cs_1"

[notifications]
merchant_url = "https://ops.example.com/hooks/payments"

[service]
secret = "service-secret"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen.port(), 3000);
        assert_eq!(config.gateway.environment, Environment::Production);
        assert_eq!(config.checkout.free_installments, 3);
        assert_eq!(config.checkout.utc_offset_hours, -3);
        assert_eq!(
            config.logistics.unwrap().base_url.as_str(),
            "https://logistics.example.com/v1"
        );
        assert!(config.notifications.merchant_url.is_some());
    }

    #[test]
    fn test_missing_gateway_section_is_rejected() {
        let toml_str = MINIMAL.replace("[gateway]", "[gateway_typo]");
        assert!(toml::from_str::<FileConfig>(&toml_str).is_err());
    }
}
