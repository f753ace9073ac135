//! Configuration module for genpay-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables, and turns it into the SDK and core
//! settings types.

pub mod file;

use crate::config::file::FileConfig;
use genpay_core::config::{CheckoutSettings, DEFAULT_DASHBOARD_URL, DEFAULT_LOGISTICS_METHOD_ID};
use genpay_sdk::config::{Credentials, GatewayConfig, LogisticsConfig};
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;
use time::UtcOffset;
use url::Url;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// WooCommerce REST access as loaded from `[shop]`.
#[derive(Clone)]
pub struct ShopSettings {
    pub base_url: Url,
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl std::fmt::Debug for ShopSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopSettings")
            .field("base_url", &self.base_url.as_str())
            .field("consumer_key", &self.consumer_key)
            .finish_non_exhaustive()
    }
}

/// Loaded configuration result containing all parts.
pub struct LoadedConfig {
    pub listen: SocketAddr,
    pub gateway: GatewayConfig,
    pub logistics: Option<LogisticsConfig>,
    pub checkout: CheckoutSettings,
    pub shop: ShopSettings,
    pub merchant_notification_url: Option<Url>,
    pub service_secret: Box<[u8]>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Read the TOML file, apply CLI overrides, validate and convert.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        self.load_str(&config_content)
    }

    fn load_str(&self, content: &str) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;
        build_loaded_config(file_config)
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.gateway.api_key.trim().is_empty() || config.gateway.document.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "gateway document and api_key must be set".to_string(),
        ));
    }
    if config.gateway.signature_key.is_empty() {
        return Err(ConfigError::ValidationError(
            "gateway signature_key must be set".to_string(),
        ));
    }
    if config.service.secret.is_empty() {
        return Err(ConfigError::ValidationError(
            "service secret must be set".to_string(),
        ));
    }
    if config.checkout.free_installments == 0 {
        return Err(ConfigError::ValidationError(
            "free_installments must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn build_loaded_config(file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
    let checkout = file_config.checkout;
    let utc_offset = UtcOffset::from_hms(checkout.utc_offset_hours, 0, 0).map_err(|_| {
        ConfigError::ValidationError(format!(
            "utc_offset_hours out of range: {}",
            checkout.utc_offset_hours
        ))
    })?;

    let gateway = GatewayConfig {
        environment: file_config.gateway.environment,
        base_url: file_config.gateway.base_url,
        credentials: Credentials {
            document: file_config.gateway.document,
            api_key: file_config.gateway.api_key,
            signature_key: file_config.gateway.signature_key,
        },
    };

    let logistics = file_config.logistics.map(|l| LogisticsConfig {
        base_url: l.base_url,
        credentials: Credentials {
            document: l.document,
            api_key: l.api_key,
            signature_key: l.signature_key,
        },
    });

    let checkout = CheckoutSettings {
        webhook_url: checkout.webhook_url.to_string(),
        currency: checkout.currency,
        free_installments: checkout.free_installments,
        buyer_interest: checkout.buyer_interest,
        utc_offset,
        dashboard_url: checkout
            .dashboard_url
            .unwrap_or_else(|| DEFAULT_DASHBOARD_URL.to_owned()),
        logistics_method_id: checkout
            .logistics_method_id
            .unwrap_or_else(|| DEFAULT_LOGISTICS_METHOD_ID.to_owned()),
    };

    Ok(LoadedConfig {
        listen: file_config.server.listen,
        gateway,
        logistics,
        checkout,
        shop: ShopSettings {
            base_url: file_config.shop.base_url,
            consumer_key: file_config.shop.consumer_key,
            consumer_secret: file_config.shop.consumer_secret,
        },
        merchant_notification_url: file_config.notifications.merchant_url,
        service_secret: file_config.service.secret.into_bytes().into_boxed_slice(),
    })
}

/// Get the database URL from the environment, if any.
pub fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL")
        .ok()
        .filter(|url| !url.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[gateway]
document = "12345678000190"
api_key = "key"
signature_key = "sig"

[checkout]
webhook_url = "https://pay.example.com/webhook"
utc_offset_hours = -3

[shop]
base_url = "https://shop.example.com/wp-json/wc/v3/"
consumer_key = "ck_1"
consumer_secret = "cs_1"

[service]
secret = "service-secret"
"#;

    #[test]
    fn test_load_converts_sections() {
        let loader = ConfigLoader::new("unused.toml", None);
        let loaded = loader.load_str(CONFIG).unwrap();
        assert_eq!(loaded.listen.port(), 8080);
        assert_eq!(loaded.gateway.credentials.api_key, "key");
        assert!(loaded.gateway.base_url.is_none());
        assert!(loaded.logistics.is_none());
        assert_eq!(loaded.checkout.utc_offset.whole_hours(), -3);
        assert_eq!(loaded.checkout.webhook_url, "https://pay.example.com/webhook");
        assert_eq!(loaded.checkout.dashboard_url, DEFAULT_DASHBOARD_URL);
        assert_eq!(
            loaded.checkout.logistics_method_id,
            DEFAULT_LOGISTICS_METHOD_ID
        );
        assert_eq!(&*loaded.service_secret, b"service-secret");
    }

    #[test]
    fn test_listen_override_wins() {
        let addr: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        let loader = ConfigLoader::new("unused.toml", Some(addr));
        let loaded = loader.load_str(CONFIG).unwrap();
        assert_eq!(loaded.listen, addr);
    }

    #[test]
    fn test_empty_service_secret_is_rejected() {
        let config = CONFIG.replace(r#"secret = "service-secret""#, r#"secret = """#);
        let loader = ConfigLoader::new("unused.toml", None);
        assert!(matches!(
            loader.load_str(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_offset_out_of_range_is_rejected() {
        let config = CONFIG.replace("utc_offset_hours = -3", "utc_offset_hours = 30");
        let loader = ConfigLoader::new("unused.toml", None);
        assert!(matches!(
            loader.load_str(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_shop_debug_hides_secret() {
        let loader = ConfigLoader::new("unused.toml", None);
        let loaded = loader.load_str(CONFIG).unwrap();
        let rendered = format!("{:?}", loaded.shop);
        assert!(!rendered.contains("cs_1"));
    }
}
