use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    entities::order::{Model as OrderModel, OrderStatus},
    errors::CheckoutError,
    events::{Event, EventSender},
    gateway::PaymentGateway,
    repositories::{CartRepository, OrderRepository, ProductRepository},
};

/// Reconciled view of an order after a status poll
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub order_id: Uuid,
    pub reference: String,
    pub status: String,
    pub gateway_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finalized_at: Option<DateTime<Utc>>,
    pub fulfilled: bool,
}

/// Status reconciliation and fulfillment.
///
/// Reconciliation treats the gateway as the source of truth: it persists any
/// status change and triggers the one-time fulfillment when the charge is
/// approved. Fulfillment is safe to invoke concurrently: the fulfilled-at
/// marker is claimed with a single conditional update, and losing that claim
/// reads as `already_fulfilled`.
#[derive(Clone)]
pub struct OrderStatusService {
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
    carts: Arc<dyn CartRepository>,
    gateway: Arc<dyn PaymentGateway>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderStatusService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
        carts: Arc<dyn CartRepository>,
        gateway: Arc<dyn PaymentGateway>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            orders,
            products,
            carts,
            gateway,
            event_sender,
        }
    }

    /// Polls the gateway for the order's current status, persists it when it
    /// changed, and runs fulfillment on a newly observed approval.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn reconcile(&self, order_id: Uuid) -> Result<StatusReport, CheckoutError> {
        let order = self.load(order_id).await?;

        let gateway_id = order
            .gateway_transaction_id
            .as_deref()
            .ok_or(CheckoutError::NotProcessed)?;

        let charge = self
            .gateway
            .charge_status(gateway_id)
            .await
            .map_err(CheckoutError::GatewayUnavailable)?;

        let reported = OrderStatus::from_wire(&charge.status);
        let stored = order.order_status();

        if reported != stored && stored == OrderStatus::Pending {
            // A concurrent reconciler may win this update; zero rows is fine,
            // the row is re-read below.
            let rows = self.orders.update_status(order.id, reported, None).await?;
            if rows > 0 {
                info!(order_id = %order.id, status = %reported, "order status updated");
                if let Some(event_sender) = &self.event_sender {
                    if let Err(e) = event_sender
                        .send(Event::OrderStatusChanged {
                            order_id: order.id,
                            status: reported.as_wire().to_string(),
                        })
                        .await
                    {
                        warn!(error = %e, order_id = %order.id, "Failed to send status changed event");
                    }
                }
            }
        }

        if reported == OrderStatus::Approved && !order.is_fulfilled() {
            match self.fulfill(order.id).await {
                Ok(_) => {}
                // Another poll or callback claimed fulfillment first.
                Err(CheckoutError::AlreadyFulfilled) => {}
                Err(e) => return Err(e),
            }
        }

        let order = self.load(order_id).await?;
        Ok(StatusReport {
            order_id: order.id,
            reference: order.reference.clone(),
            status: order.order_status().as_api().to_string(),
            gateway_status: charge.status,
            finalized_at: charge.finalized_at,
            fulfilled: order.is_fulfilled(),
        })
    }

    /// One-time fulfillment of an approved order: claim the fulfilled-at
    /// marker, decrement stock per line, clear the originating cart.
    ///
    /// The marker claim comes first so the stock decrement runs at most once
    /// even when two reconciliations race; sub-step failures after the claim
    /// are surfaced without rolling back earlier sub-steps.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn fulfill(&self, order_id: Uuid) -> Result<OrderModel, CheckoutError> {
        let order = self.load(order_id).await?;

        if order.is_fulfilled() {
            return Err(CheckoutError::AlreadyFulfilled);
        }
        let status = order.order_status();
        if status != OrderStatus::Approved {
            return Err(CheckoutError::NotApproved(status));
        }

        let now = Utc::now();
        let claimed = self
            .orders
            .mark_fulfilled(order.id, now)
            .await
            .map_err(|e| CheckoutError::MarkFulfilledFailed(e.to_string()))?;
        if claimed == 0 {
            return Err(CheckoutError::AlreadyFulfilled);
        }

        let lines = self
            .orders
            .items_for_order(order.id)
            .await
            .map_err(|e| CheckoutError::StockUpdateFailed(e.to_string()))?;
        for line in &lines {
            self.products
                .decrement_stock(line.product_id, line.quantity)
                .await
                .map_err(|e| CheckoutError::StockUpdateFailed(e.to_string()))?;
        }

        if let Some(session_id) = &order.session_id {
            self.carts
                .clear_session(session_id)
                .await
                .map_err(|e| CheckoutError::CartClearFailed(e.to_string()))?;
        }

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::OrderFulfilled {
                    order_id: order.id,
                    fulfilled_at: now,
                })
                .await
            {
                warn!(error = %e, order_id = %order.id, "Failed to send order fulfilled event");
            }
        }

        info!(order_id = %order.id, lines = lines.len(), "order fulfilled");
        self.load(order_id).await
    }

    async fn load(&self, order_id: Uuid) -> Result<OrderModel, CheckoutError> {
        self.orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| CheckoutError::OrderNotFound(format!("id {order_id}")))
    }
}
