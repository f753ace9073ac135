//! HTTP clients for the GenPay gateway and the GenLog logistics API.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

mod gateway;
mod logistics;

pub use gateway::GatewayClient;
pub use logistics::LogisticsClient;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::objects::response::ApiErrorEntry;

/// Errors produced by the SDK HTTP clients.
///
/// The first three variants are the failure tiers callers must tell apart:
/// the request never got an answer, the server answered with a non-200
/// status, or the server answered 200 but reported `result: "failure"`.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Network, DNS, TLS or timeout failure. Never retried here.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-200 answer. `messages` are the `errors[].description` values.
    #[error("gateway returned {status}: {}", .messages.join("; "))]
    Protocol {
        status: StatusCode,
        messages: Vec<String>,
        body: String,
    },

    /// 200 answer carrying a failure result.
    #[error("gateway refused the request: {}", .errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Business {
        errors: Vec<ApiErrorEntry>,
        body: String,
    },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl GatewayError {
    pub fn is_transport(&self) -> bool {
        matches!(self, GatewayError::Transport(_))
    }

    /// Raw response body, for the tiers that have one.
    pub fn body(&self) -> Option<&str> {
        match self {
            GatewayError::Protocol { body, .. } | GatewayError::Business { body, .. } => {
                Some(body)
            }
            _ => None,
        }
    }

    /// Human-readable error lines, suitable for order notes.
    pub fn messages(&self) -> Vec<String> {
        match self {
            GatewayError::Protocol { messages, .. } => messages.clone(),
            GatewayError::Business { errors, .. } => {
                errors.iter().map(ToString::to_string).collect()
            }
            other => vec![other.to_string()],
        }
    }
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ApiErrorEntry>,
}

fn error_descriptions(body: &str) -> Vec<String> {
    serde_json::from_str::<ErrorBody>(body)
        .map(|parsed| parsed.errors.into_iter().map(|e| e.description).collect())
        .unwrap_or_default()
}

/// Sort a gateway answer into its tier and deserialize the success body.
async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, GatewayError> {
    let status = resp.status();
    let body = resp.text().await?;
    if status != StatusCode::OK {
        return Err(GatewayError::Protocol {
            status,
            messages: error_descriptions(&body),
            body,
        });
    }
    let value: serde_json::Value = serde_json::from_str(&body)?;
    if value.get("result").and_then(|r| r.as_str()) == Some("failure") {
        let errors = match value.get("errors") {
            Some(errors) => serde_json::from_value(errors.clone())?,
            None => Vec::new(),
        };
        return Err(GatewayError::Business { errors, body });
    }
    Ok(serde_json::from_value(value)?)
}
