//! Payment gateway collaborator: the logical operations the checkout
//! pipeline needs from the external card processor. The wire protocol lives
//! in the production adapter ([`wompi::WompiGateway`]); tests script the
//! trait directly.

pub mod wompi;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw card data as supplied by the caller. Never persisted; only forwarded
/// to the gateway's tokenization endpoint.
#[derive(Clone, Serialize, Deserialize)]
pub struct CardData {
    pub number: String,
    pub cvc: String,
    pub exp_month: String,
    pub exp_year: String,
    pub card_holder: String,
}

// Card numbers stay out of logs; only the holder name is ever printed.
impl std::fmt::Debug for CardData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardData")
            .field("card_holder", &self.card_holder)
            .finish_non_exhaustive()
    }
}

/// A charge as reported by the gateway, either at submission time or from a
/// later status query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCharge {
    /// The provider's identifier for the charge
    pub id: String,
    /// Provider status string, e.g. "PENDING" or "APPROVED"
    pub status: String,
    #[serde(default)]
    pub status_message: Option<String>,
    /// Settlement timestamp, present once the charge is finalized
    #[serde(default)]
    pub finalized_at: Option<DateTime<Utc>>,
}

/// Charge submission request: the order's full total in minor units plus
/// the identifiers the provider authenticates against.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub amount_cents: i64,
    pub currency: String,
    pub payment_source_id: i64,
    pub reference: String,
    pub customer_email: String,
    pub installments: u32,
}

/// A failed gateway operation, carrying the provider's raw error payload
/// and, where applicable, the HTTP-equivalent status code.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct GatewayError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl GatewayError {
    pub fn new(
        message: impl Into<String>,
        status: Option<u16>,
        detail: Option<serde_json::Value>,
    ) -> Self {
        Self {
            message: message.into(),
            status,
            detail,
        }
    }

    /// A transport-level failure (connect, timeout, malformed body) with no
    /// provider payload attached.
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            detail: None,
        }
    }
}

/// Gateway collaborator contract.
///
/// Every operation returns either its success payload or a [`GatewayError`]
/// with the provider's raw error detail. Calls are logically synchronous;
/// retry policy belongs to the caller.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Acquire the compliance acceptance token required before a charge can
    /// be authorized.
    async fn acceptance_token(&self) -> Result<String, GatewayError>;

    /// Exchange raw card data for a single-use card token.
    async fn tokenize_card(&self, card: &CardData) -> Result<String, GatewayError>;

    /// Create a reusable payment source from a card token.
    async fn create_payment_source(
        &self,
        token: &str,
        customer_email: &str,
        acceptance_token: &str,
    ) -> Result<i64, GatewayError>;

    /// Submit a charge and return the provider's view of it.
    async fn submit_charge(&self, request: &ChargeRequest) -> Result<GatewayCharge, GatewayError>;

    /// Fetch the current state of a previously submitted charge.
    async fn charge_status(
        &self,
        gateway_transaction_id: &str,
    ) -> Result<GatewayCharge, GatewayError>;
}
