//! Seams over the SDK clients so processors can run against fakes.

use async_trait::async_trait;
use genpay_sdk::client::{GatewayClient, GatewayError, LogisticsClient};
use genpay_sdk::objects::charge::ChargeRequest;
use genpay_sdk::objects::logistics::{LogisticsEnvelope, LogisticsOrder};
use genpay_sdk::objects::refund::{RefundKind, RefundRequest};
use genpay_sdk::objects::response::{
    BilletDownload, CancelResponse, ChargeResponse, CheckoutOptions, RefundResponse,
    TransactionSnapshot,
};
use genpay_sdk::signature::SignatureError;
use rust_decimal::Decimal;

#[async_trait]
pub trait Gateway: Send + Sync {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResponse, GatewayError>;

    async fn cancel(&self, charge_id: &str) -> Result<CancelResponse, GatewayError>;

    async fn refund(
        &self,
        charge_id: &str,
        kind: RefundKind,
        request: &RefundRequest,
    ) -> Result<RefundResponse, GatewayError>;

    async fn get_charge(&self, charge_id: &str) -> Result<TransactionSnapshot, GatewayError>;

    async fn checkout_options(&self, amount: Decimal) -> Result<CheckoutOptions, GatewayError>;

    async fn billet_download(&self, charge_id: &str) -> Result<BilletDownload, GatewayError>;

    fn verify_webhook(&self, body: &[u8], signature: &str) -> Result<(), SignatureError>;
}

#[async_trait]
impl Gateway for GatewayClient {
    async fn charge(&self, request: &ChargeRequest) -> Result<ChargeResponse, GatewayError> {
        GatewayClient::charge(self, request).await
    }

    async fn cancel(&self, charge_id: &str) -> Result<CancelResponse, GatewayError> {
        GatewayClient::cancel(self, charge_id).await
    }

    async fn refund(
        &self,
        charge_id: &str,
        kind: RefundKind,
        request: &RefundRequest,
    ) -> Result<RefundResponse, GatewayError> {
        GatewayClient::refund(self, charge_id, kind, request).await
    }

    async fn get_charge(&self, charge_id: &str) -> Result<TransactionSnapshot, GatewayError> {
        GatewayClient::get_charge(self, charge_id).await
    }

    async fn checkout_options(&self, amount: Decimal) -> Result<CheckoutOptions, GatewayError> {
        GatewayClient::checkout_options(self, amount).await
    }

    async fn billet_download(&self, charge_id: &str) -> Result<BilletDownload, GatewayError> {
        GatewayClient::billet_download(self, charge_id).await
    }

    fn verify_webhook(&self, body: &[u8], signature: &str) -> Result<(), SignatureError> {
        GatewayClient::verify_webhook(self, body, signature)
    }
}

#[async_trait]
pub trait Logistics: Send + Sync {
    async fn create_calculation(
        &self,
        body: &serde_json::Value,
    ) -> Result<LogisticsEnvelope<serde_json::Value>, GatewayError>;

    async fn create_batch(
        &self,
        body: &serde_json::Value,
    ) -> Result<LogisticsEnvelope<serde_json::Value>, GatewayError>;

    async fn get_order(
        &self,
        order_id: &str,
    ) -> Result<LogisticsEnvelope<LogisticsOrder>, GatewayError>;
}

#[async_trait]
impl Logistics for LogisticsClient {
    async fn create_calculation(
        &self,
        body: &serde_json::Value,
    ) -> Result<LogisticsEnvelope<serde_json::Value>, GatewayError> {
        LogisticsClient::create_calculation(self, body).await
    }

    async fn create_batch(
        &self,
        body: &serde_json::Value,
    ) -> Result<LogisticsEnvelope<serde_json::Value>, GatewayError> {
        LogisticsClient::create_batch(self, body).await
    }

    async fn get_order(
        &self,
        order_id: &str,
    ) -> Result<LogisticsEnvelope<LogisticsOrder>, GatewayError> {
        LogisticsClient::get_order(self, order_id).await
    }
}
