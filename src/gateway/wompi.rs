//! Production adapter for the Wompi card-processing API.

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::instrument;

use crate::config::GatewayConfig;

use super::{CardData, ChargeRequest, GatewayCharge, GatewayError, PaymentGateway};

/// Wompi REST adapter. Tokenization and the acceptance-token lookup use the
/// merchant public key; payment sources, charges and status queries use the
/// private key.
pub struct WompiGateway {
    client: Client,
    config: GatewayConfig,
}

impl WompiGateway {
    /// Build a gateway using a default reqwest client with the configured timeout.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to construct reqwest client for payment gateway")?;

        Ok(Self::with_client(config, client))
    }

    /// Build a gateway from an existing client (useful for testing).
    pub fn with_client(config: GatewayConfig, client: Client) -> Self {
        Self { client, config }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Tamper-evident charge signature: SHA-256 hex digest over the ordered
    /// concatenation of reference, amount, currency and the shared secret.
    fn integrity_signature(&self, reference: &str, amount_cents: i64, currency: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(reference.as_bytes());
        hasher.update(amount_cents.to_string().as_bytes());
        hasher.update(currency.as_bytes());
        hasher.update(self.config.integrity_secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Unwraps the provider's `{ "data": ... }` envelope, turning non-2xx
    /// responses into a [`GatewayError`] that keeps the raw payload.
    async fn parse_data(response: reqwest::Response) -> Result<Value, GatewayError> {
        let status = response.status();
        let mut body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::transport(format!("invalid gateway response: {e}")))?;

        if status.is_success() {
            Ok(body.get_mut("data").map(Value::take).unwrap_or(Value::Null))
        } else {
            let message = body
                .pointer("/error/message")
                .or_else(|| body.pointer("/error/reason"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("gateway returned HTTP {}", status.as_u16()));
            Err(GatewayError::new(message, Some(status.as_u16()), Some(body)))
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(data: Value) -> Result<T, GatewayError> {
        serde_json::from_value(data)
            .map_err(|e| GatewayError::transport(format!("unexpected gateway payload: {e}")))
    }
}

#[derive(serde::Deserialize)]
struct PresignedAcceptance {
    acceptance_token: String,
}

#[derive(serde::Deserialize)]
struct MerchantData {
    presigned_acceptance: PresignedAcceptance,
}

#[derive(serde::Deserialize)]
struct CardToken {
    id: String,
}

#[derive(serde::Deserialize)]
struct PaymentSource {
    id: i64,
}

#[async_trait::async_trait]
impl PaymentGateway for WompiGateway {
    #[instrument(skip(self))]
    async fn acceptance_token(&self) -> Result<String, GatewayError> {
        let response = self
            .client
            .get(self.url(&format!("/merchants/{}", self.config.public_key)))
            .send()
            .await
            .map_err(|e| GatewayError::transport(e.to_string()))?;

        let data: MerchantData = Self::decode(Self::parse_data(response).await?)?;
        Ok(data.presigned_acceptance.acceptance_token)
    }

    #[instrument(skip(self, card))]
    async fn tokenize_card(&self, card: &CardData) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(self.url("/tokens/cards"))
            .bearer_auth(&self.config.public_key)
            .json(&json!({
                "number": card.number,
                "cvc": card.cvc,
                "exp_month": card.exp_month,
                "exp_year": card.exp_year,
                "card_holder": card.card_holder,
            }))
            .send()
            .await
            .map_err(|e| GatewayError::transport(e.to_string()))?;

        let token: CardToken = Self::decode(Self::parse_data(response).await?)?;
        Ok(token.id)
    }

    #[instrument(skip(self, token, acceptance_token))]
    async fn create_payment_source(
        &self,
        token: &str,
        customer_email: &str,
        acceptance_token: &str,
    ) -> Result<i64, GatewayError> {
        let response = self
            .client
            .post(self.url("/payment_sources"))
            .bearer_auth(&self.config.private_key)
            .json(&json!({
                "type": "CARD",
                "token": token,
                "customer_email": customer_email,
                "acceptance_token": acceptance_token,
            }))
            .send()
            .await
            .map_err(|e| GatewayError::transport(e.to_string()))?;

        let source: PaymentSource = Self::decode(Self::parse_data(response).await?)?;
        Ok(source.id)
    }

    #[instrument(skip(self, request), fields(reference = %request.reference))]
    async fn submit_charge(&self, request: &ChargeRequest) -> Result<GatewayCharge, GatewayError> {
        let signature =
            self.integrity_signature(&request.reference, request.amount_cents, &request.currency);

        let response = self
            .client
            .post(self.url("/transactions"))
            .bearer_auth(&self.config.private_key)
            .json(&json!({
                "amount_in_cents": request.amount_cents,
                "currency": request.currency,
                "signature": signature,
                "customer_email": request.customer_email,
                "payment_method": { "installments": request.installments },
                "reference": request.reference,
                "payment_source_id": request.payment_source_id,
            }))
            .send()
            .await
            .map_err(|e| GatewayError::transport(e.to_string()))?;

        Self::decode(Self::parse_data(response).await?)
    }

    #[instrument(skip(self))]
    async fn charge_status(
        &self,
        gateway_transaction_id: &str,
    ) -> Result<GatewayCharge, GatewayError> {
        let response = self
            .client
            .get(self.url(&format!("/transactions/{gateway_transaction_id}")))
            .bearer_auth(&self.config.private_key)
            .send()
            .await
            .map_err(|e| GatewayError::transport(e.to_string()))?;

        Self::decode(Self::parse_data(response).await?)
    }
}
