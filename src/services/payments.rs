use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::CheckoutConfig,
    entities::order::OrderStatus,
    errors::CheckoutError,
    events::{Event, EventSender},
    gateway::{CardData, ChargeRequest, PaymentGateway},
    repositories::{CustomerRepository, OrderRepository},
};

/// Card payment request for a pending order
#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub card: CardData,
    #[serde(default = "default_installments")]
    pub installments: u32,
}

fn default_installments() -> u32 {
    1
}

/// Outcome of a submitted charge. `status` reflects whatever the gateway
/// reported at submission time and may be superseded by reconciliation.
#[derive(Debug, Serialize)]
pub struct PaymentReceipt {
    pub order_id: Uuid,
    pub reference: String,
    pub status: String,
    pub gateway_transaction_id: String,
    pub amount_cents: i64,
    pub total_cents: i64,
    pub gateway_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,
}

/// Payment submission: drives the gateway through token acquisition, card
/// tokenization, payment-source creation and charge submission, then records
/// the gateway's reference id and status on the order.
#[derive(Clone)]
pub struct PaymentService {
    orders: Arc<dyn OrderRepository>,
    customers: Arc<dyn CustomerRepository>,
    gateway: Arc<dyn PaymentGateway>,
    checkout: CheckoutConfig,
    event_sender: Option<Arc<EventSender>>,
}

impl PaymentService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        customers: Arc<dyn CustomerRepository>,
        gateway: Arc<dyn PaymentGateway>,
        checkout: CheckoutConfig,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            orders,
            customers,
            gateway,
            checkout,
            event_sender,
        }
    }

    /// Submits the order's full total (subtotal plus both fees) to the
    /// gateway. The order must still be PENDING.
    #[instrument(skip(self, request), fields(order_id = %order_id))]
    pub async fn submit_payment(
        &self,
        order_id: Uuid,
        request: PaymentRequest,
    ) -> Result<PaymentReceipt, CheckoutError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| CheckoutError::OrderNotFound(format!("id {order_id}")))?;

        let status = order.order_status();
        if status != OrderStatus::Pending {
            return Err(CheckoutError::InvalidStatus(status));
        }

        let customer = self
            .customers
            .find_by_id(order.customer_id)
            .await?
            .ok_or_else(|| {
                CheckoutError::DatabaseError(sea_orm::DbErr::RecordNotFound(format!(
                    "customer {} referenced by order {}",
                    order.customer_id, order.id
                )))
            })?;

        let acceptance_token = self
            .gateway
            .acceptance_token()
            .await
            .map_err(CheckoutError::AcceptanceTokenFailed)?;

        let card_token = self
            .gateway
            .tokenize_card(&request.card)
            .await
            .map_err(CheckoutError::TokenizationFailed)?;

        let payment_source_id = self
            .gateway
            .create_payment_source(&card_token, &customer.email, &acceptance_token)
            .await
            .map_err(CheckoutError::PaymentSourceFailed)?;

        let total_cents = order.total_cents();
        let charge = self
            .gateway
            .submit_charge(&ChargeRequest {
                amount_cents: total_cents,
                currency: self.checkout.currency.clone(),
                payment_source_id,
                reference: order.reference.clone(),
                customer_email: customer.email.clone(),
                installments: request.installments,
            })
            .await
            .map_err(CheckoutError::ChargeFailed)?;

        // The gateway may settle synchronously, so the reported status can
        // already be terminal here.
        let new_status = OrderStatus::from_wire(&charge.status);
        let updated = self
            .orders
            .update_status(order.id, new_status, Some(&charge.id))
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %order.id, "failed to record gateway status");
                CheckoutError::DatabaseError(e)
            })?;
        if updated == 0 {
            return Err(CheckoutError::UpdateFailed);
        }

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::PaymentSubmitted {
                    order_id: order.id,
                    gateway_transaction_id: charge.id.clone(),
                    status: new_status.as_wire().to_string(),
                })
                .await
            {
                warn!(error = %e, order_id = %order.id, "Failed to send payment submitted event");
            }
        }

        info!(
            order_id = %order.id,
            gateway_transaction_id = %charge.id,
            gateway_status = %charge.status,
            "payment submitted"
        );

        Ok(PaymentReceipt {
            order_id: order.id,
            reference: order.reference,
            status: new_status.as_api().to_string(),
            gateway_transaction_id: charge.id,
            amount_cents: order.amount_cents,
            total_cents,
            gateway_status: charge.status,
            finalized_at: charge.finalized_at,
        })
    }
}
