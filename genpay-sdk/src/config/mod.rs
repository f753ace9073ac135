//! Connection settings for the gateway and logistics APIs.
//!
//! These are plain values passed to the clients at construction time. The
//! server crate is responsible for loading them from its config file.

use serde::{Deserialize, Serialize};
use url::Url;

/// Timeout applied to every outbound call, in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 60;

pub const PRODUCTION_API_URL: &str = "https://api.gencomm.com.br/rpay/v1/";
pub const SANDBOX_API_URL: &str = "http://oneapi-sandbox.genpay.com.br/rpay/v1/";

/// Which gateway host a merchant talks to. Never mixed within a process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    #[default]
    Sandbox,
}

impl Environment {
    pub fn base_url(self) -> Result<Url, url::ParseError> {
        match self {
            Environment::Production => Url::parse(PRODUCTION_API_URL),
            Environment::Sandbox => Url::parse(SANDBOX_API_URL),
        }
    }
}

/// Merchant credentials shared by both APIs.
///
/// `document` is the merchant CNPJ, used together with `api_key` for Basic
/// authentication. `signature_key` signs request bodies and verifies
/// webhooks.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub document: String,
    pub api_key: String,
    pub signature_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("document", &self.document)
            .field("api_key", &"<redacted>")
            .field("signature_key", &"<redacted>")
            .finish()
    }
}

/// Payment gateway connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub environment: Environment,
    /// Overrides the environment's host, mainly for tests.
    pub base_url: Option<Url>,
    pub credentials: Credentials,
}

impl GatewayConfig {
    /// The base URL requests are joined against. Always ends with `/`.
    pub fn resolved_base_url(&self) -> Result<Url, url::ParseError> {
        match &self.base_url {
            Some(url) => Ok(with_trailing_slash(url.clone())),
            None => self.environment.base_url(),
        }
    }
}

/// Logistics partner connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogisticsConfig {
    pub base_url: Url,
    pub credentials: Credentials,
}

impl LogisticsConfig {
    pub fn resolved_base_url(&self) -> Url {
        with_trailing_slash(self.base_url.clone())
    }
}

/// `Url::join` drops the last path segment unless it ends with a slash.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
