use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::order::OrderStatus;
use crate::gateway::GatewayError;

/// Wire shape for a failed operation. The transport layer serializes this
/// as-is; `error` is the stable machine-readable kind.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    /// Raw provider payload for gateway failures, storage detail otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Failure taxonomy for the checkout pipeline.
///
/// Validation/state kinds are terminal and never retried. Persistence kinds
/// carry the underlying storage message; the caller may resubmit the whole
/// request. Gateway kinds carry the provider's raw error detail.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Product {0} not found")]
    ProductNotFound(Uuid),

    #[error("Insufficient stock for {name}")]
    InsufficientStock {
        product_id: Uuid,
        name: String,
        available: i32,
        requested: i32,
    },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Order is not pending (status {0})")]
    InvalidStatus(OrderStatus),

    #[error("Payment has not been submitted for this order")]
    NotProcessed,

    #[error("Order already fulfilled")]
    AlreadyFulfilled,

    #[error("Order is not approved (status {0})")]
    NotApproved(OrderStatus),

    #[error("Customer creation failed: {0}")]
    CustomerCreationFailed(String),

    #[error("Delivery creation failed: {0}")]
    DeliveryCreationFailed(String),

    #[error("Order creation failed: {0}")]
    OrderCreationFailed(String),

    #[error("Stock update failed: {0}")]
    StockUpdateFailed(String),

    #[error("Cart clear failed: {0}")]
    CartClearFailed(String),

    #[error("Could not mark order fulfilled: {0}")]
    MarkFulfilledFailed(String),

    #[error("Could not update order status")]
    UpdateFailed,

    #[error("Could not obtain acceptance token: {0}")]
    AcceptanceTokenFailed(GatewayError),

    #[error("Card tokenization failed: {0}")]
    TokenizationFailed(GatewayError),

    #[error("Payment source creation failed: {0}")]
    PaymentSourceFailed(GatewayError),

    #[error("Charge submission failed: {0}")]
    ChargeFailed(GatewayError),

    #[error("Gateway status query failed: {0}")]
    GatewayUnavailable(GatewayError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),
}

impl From<validator::ValidationErrors> for CheckoutError {
    fn from(err: validator::ValidationErrors) -> Self {
        CheckoutError::ValidationError(err.to_string())
    }
}

impl CheckoutError {
    /// Stable machine-readable kind, the contract with the transport layer.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "validation_error",
            Self::ProductNotFound(_) => "product_not_found",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::EmptyCart => "empty_cart",
            Self::OrderNotFound(_) => "order_not_found",
            Self::InvalidStatus(_) => "invalid_status",
            Self::NotProcessed => "not_processed",
            Self::AlreadyFulfilled => "already_fulfilled",
            Self::NotApproved(_) => "not_approved",
            Self::CustomerCreationFailed(_) => "customer_creation_failed",
            Self::DeliveryCreationFailed(_) => "delivery_creation_failed",
            Self::OrderCreationFailed(_) => "order_creation_failed",
            Self::StockUpdateFailed(_) => "stock_update_failed",
            Self::CartClearFailed(_) => "cart_clear_failed",
            Self::MarkFulfilledFailed(_) => "mark_fulfilled_failed",
            Self::UpdateFailed => "update_failed",
            Self::AcceptanceTokenFailed(_) => "acceptance_token_failed",
            Self::TokenizationFailed(_) => "tokenization_failed",
            Self::PaymentSourceFailed(_) => "payment_source_failed",
            Self::ChargeFailed(_) => "charge_failed",
            Self::GatewayUnavailable(_) => "gateway_error",
            Self::DatabaseError(_) => "database_error",
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ProductNotFound(_) | Self::OrderNotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::InsufficientStock { .. }
            | Self::EmptyCart
            | Self::InvalidStatus(_)
            | Self::NotProcessed
            | Self::AlreadyFulfilled
            | Self::NotApproved(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::TokenizationFailed(_) | Self::PaymentSourceFailed(_) => StatusCode::BAD_REQUEST,
            Self::ChargeFailed(_) => StatusCode::PAYMENT_REQUIRED,
            Self::AcceptanceTokenFailed(_) | Self::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::UpdateFailed => StatusCode::CONFLICT,
            Self::CustomerCreationFailed(_)
            | Self::DeliveryCreationFailed(_)
            | Self::OrderCreationFailed(_)
            | Self::StockUpdateFailed(_)
            | Self::CartClearFailed(_)
            | Self::MarkFulfilledFailed(_)
            | Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Raw provider payload for gateway failures, if the provider sent one.
    pub fn gateway_detail(&self) -> Option<&serde_json::Value> {
        match self {
            Self::AcceptanceTokenFailed(err)
            | Self::TokenizationFailed(err)
            | Self::PaymentSourceFailed(err)
            | Self::ChargeFailed(err)
            | Self::GatewayUnavailable(err) => err.detail.as_ref(),
            _ => None,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for CheckoutError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: self.kind().to_string(),
            message: self.response_message(),
            details: self.gateway_detail().cloned(),
        };
        (status, Json(body)).into_response()
    }
}
