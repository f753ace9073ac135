//! Logistics partner client (shop backend → GenLog).
//!
//! Uses the same Basic + `Signature` header discipline as the gateway, but
//! answers in an `{status, content, messages}` envelope where a body status
//! of `"ERROR"` marks a refused request.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use super::GatewayError;
use crate::config::{Credentials, LogisticsConfig, REQUEST_TIMEOUT_SECS};
use crate::objects::logistics::{LogisticsEnvelope, LogisticsOrder};
use crate::objects::response::ApiErrorEntry;
use crate::signature::{self, SIGNATURE_HEADER, SignedBody};

#[derive(Debug, Clone)]
pub struct LogisticsClient {
    http: Client,
    base_url: Url,
    credentials: Credentials,
}

impl LogisticsClient {
    pub fn new(config: &LogisticsConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: config.resolved_base_url(),
            credentials: config.credentials.clone(),
        })
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    fn authorization(&self) -> String {
        signature::basic_authorization(&self.credentials.document, &self.credentials.api_key)
    }

    async fn post_signed(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<reqwest::Response, GatewayError> {
        let signed = SignedBody::new(body, self.credentials.signature_key.as_bytes())?;
        let url = self.base_url.join(endpoint)?;
        let resp = self
            .http
            .post(url)
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .header(SIGNATURE_HEADER, signed.signature)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .body(signed.json)
            .send()
            .await?;
        Ok(resp)
    }

    /// `POST calculation`: quote shipping options for a cart.
    pub async fn create_calculation(
        &self,
        body: &serde_json::Value,
    ) -> Result<LogisticsEnvelope<serde_json::Value>, GatewayError> {
        let resp = self.post_signed("calculation", body).await?;
        parse_envelope(resp).await
    }

    /// `POST batch`: register shipments for a set of orders.
    pub async fn create_batch(
        &self,
        body: &serde_json::Value,
    ) -> Result<LogisticsEnvelope<serde_json::Value>, GatewayError> {
        let resp = self.post_signed("batch", body).await?;
        parse_envelope(resp).await
    }

    /// `GET order/{id}`: read back tracking details of a shipped order.
    pub async fn get_order(
        &self,
        order_id: &str,
    ) -> Result<LogisticsEnvelope<LogisticsOrder>, GatewayError> {
        let url = self
            .base_url
            .join(&format!("order/{}", urlencoding::encode(order_id)))?;
        let resp = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        parse_envelope(resp).await
    }
}

async fn parse_envelope<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<LogisticsEnvelope<T>, GatewayError> {
    let status = resp.status();
    let body = resp.text().await?;
    if status != StatusCode::OK {
        let messages = serde_json::from_str::<LogisticsEnvelope<serde_json::Value>>(&body)
            .map(|envelope| envelope.message_texts())
            .unwrap_or_default();
        return Err(GatewayError::Protocol {
            status,
            messages,
            body,
        });
    }
    let envelope: LogisticsEnvelope<T> = serde_json::from_str(&body)?;
    if envelope.is_error() {
        let errors = envelope
            .message_texts()
            .into_iter()
            .map(|description| ApiErrorEntry {
                code: envelope.status.clone(),
                description,
            })
            .collect();
        return Err(GatewayError::Business { errors, body });
    }
    Ok(envelope)
}
