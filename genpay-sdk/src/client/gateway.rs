//! Payment gateway client (shop backend → GenPay).

use std::time::Duration;

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use url::Url;

use super::{GatewayError, parse_response};
use crate::config::{Credentials, GatewayConfig, REQUEST_TIMEOUT_SECS};
use crate::objects::charge::ChargeRequest;
use crate::objects::refund::{RefundKind, RefundRequest};
use crate::objects::response::{
    BilletDownload, CancelResponse, ChargeResponse, CheckoutOptions, RefundResponse,
    TransactionSnapshot,
};
use crate::signature::{self, SIGNATURE_HEADER, SignatureError, SignedBody};

/// Body sent with cancel requests. The gateway expects an empty JSON array,
/// and the signature is computed over it.
const CANCEL_BODY: &str = "[]";

/// Typed HTTP client for the GenPay **charges API**.
///
/// Every call carries `Authorization: Basic base64(document:api_key)`;
/// mutating calls also carry `Signature: base64(HMAC-SHA256(body))`. No call
/// is retried.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: Client,
    base_url: Url,
    credentials: Credentials,
}

impl GatewayClient {
    /// Create a client with the fixed request timeout.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: config.resolved_base_url()?,
            credentials: config.credentials.clone(),
        })
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn authorization(&self) -> String {
        signature::basic_authorization(&self.credentials.document, &self.credentials.api_key)
    }

    fn charge_url(&self, charge_id: &str, suffix: Option<&str>) -> Result<Url, GatewayError> {
        let mut path = format!("charges/{}", urlencoding::encode(charge_id));
        if let Some(suffix) = suffix {
            path.push('/');
            path.push_str(suffix);
        }
        Ok(self.base_url.join(&path)?)
    }

    fn signed_request(&self, url: Url, signed: SignedBody) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .header(SIGNATURE_HEADER, signed.signature)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(signed.json)
    }

    async fn post_signed(
        &self,
        url: Url,
        signed: SignedBody,
    ) -> Result<reqwest::Response, GatewayError> {
        Ok(self.signed_request(url, signed).send().await?)
    }

    fn sign_json(&self, json: String) -> SignedBody {
        SignedBody::from_json(json, self.credentials.signature_key.as_bytes())
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, GatewayError> {
        let resp = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;
        Ok(resp)
    }

    /// `POST charges`
    pub async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResponse, GatewayError> {
        let signed = SignedBody::new(request, self.credentials.signature_key.as_bytes())?;
        let url = self.base_url.join("charges")?;
        tracing::debug!(reference = %request.reference, "sending charge");
        let resp = self.post_signed(url, signed).await?;
        parse_response(resp).await
    }

    /// `POST charges/{id}/cancel`
    pub async fn cancel(&self, charge_id: &str) -> Result<CancelResponse, GatewayError> {
        let url = self.charge_url(charge_id, Some("cancel"))?;
        tracing::debug!(charge_id, "cancelling charge");
        let resp = self
            .post_signed(url, self.sign_json(CANCEL_BODY.to_owned()))
            .await?;
        parse_response(resp).await
    }

    /// `POST charges/{id}/refund` or `POST charges/{id}/refund_partial`
    pub async fn refund(
        &self,
        charge_id: &str,
        kind: RefundKind,
        request: &RefundRequest,
    ) -> Result<RefundResponse, GatewayError> {
        let signed = SignedBody::new(request, self.credentials.signature_key.as_bytes())?;
        let url = self.charge_url(charge_id, Some(kind.endpoint_suffix()))?;
        tracing::debug!(charge_id, ?kind, amount = %request.amount, "refunding charge");
        let resp = self.post_signed(url, signed).await?;
        parse_response(resp).await
    }

    /// `GET charges/{id}`
    pub async fn get_charge(&self, charge_id: &str) -> Result<TransactionSnapshot, GatewayError> {
        let url = self.charge_url(charge_id, None)?;
        let resp = self.get(url).await?;
        parse_response(resp).await
    }

    /// `GET checkout?amount=`
    pub async fn checkout_options(&self, amount: Decimal) -> Result<CheckoutOptions, GatewayError> {
        let mut url = self.base_url.join("checkout")?;
        url.query_pairs_mut()
            .append_pair("amount", &amount.normalize().to_string());
        let resp = self.get(url).await?;
        parse_response(resp).await
    }

    /// `GET charges/{id}/billet/download`
    pub async fn billet_download(&self, charge_id: &str) -> Result<BilletDownload, GatewayError> {
        let url = self.charge_url(charge_id, Some("billet/download"))?;
        let resp = self.get(url).await?;
        parse_response(resp).await
    }

    /// `GET charges` with Basic authentication only, returning the HTTP
    /// status code. Used to validate merchant credentials.
    pub async fn check_credentials(&self) -> Result<StatusCode, GatewayError> {
        let url = self.base_url.join("charges")?;
        let resp = self
            .http
            .get(url)
            .header(reqwest::header::AUTHORIZATION, self.authorization())
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        let status = resp.status();
        tracing::debug!(%status, "credential check answered");
        Ok(status)
    }

    /// Verify the `Signature` header of an inbound webhook.
    pub fn verify_webhook(&self, body: &[u8], signature_header: &str) -> Result<(), SignatureError> {
        signature::verify(
            self.credentials.signature_key.as_bytes(),
            body,
            signature_header,
        )
    }
}
