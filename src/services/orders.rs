use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::CheckoutConfig,
    entities::order::{Model as OrderModel, OrderStatus},
    entities::product::Model as ProductModel,
    errors::CheckoutError,
    events::{Event, EventSender},
    repositories::{
        CartRepository, CustomerRepository, DeliveryRepository, NewCustomer, NewDelivery,
        NewOrder, NewOrderLine, OrderRepository, ProductRepository,
    },
};

/// Customer attributes captured with the order
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CustomerDetails {
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(min = 1, message = "Identity document is required"))]
    pub identity_document: String,
    #[validate(email(message = "Email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
}

/// Delivery attributes captured with the order
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeliveryDetails {
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "Country is required"))]
    pub country: String,
}

/// Request to create an order for a single product
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate]
    pub customer: CustomerDetails,
    #[validate]
    pub delivery: DeliveryDetails,
}

/// Request to create an order from every line of a cart session
#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderFromCartRequest {
    #[validate(length(min = 1, message = "Session id is required"))]
    pub session_id: String,
    #[validate]
    pub customer: CustomerDetails,
    #[validate]
    pub delivery: DeliveryDetails,
}

fn default_quantity() -> i32 {
    1
}

/// One resolved order line in a receipt, with the price snapshot taken at
/// creation time
#[derive(Debug, Serialize)]
pub struct OrderLineSummary {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub price_cents: i64,
    pub subtotal_cents: i64,
}

/// Receipt returned by both intake operations. `items` is populated for
/// cart orders.
#[derive(Debug, Serialize)]
pub struct OrderReceipt {
    pub order_id: Uuid,
    pub reference: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<OrderLineSummary>>,
    pub amount_cents: i64,
    pub base_fee_cents: i64,
    pub delivery_fee_cents: i64,
    pub total_cents: i64,
}

/// Consumer-facing view of a persisted order
#[derive(Debug, Serialize)]
pub struct OrderDetails {
    pub order_id: Uuid,
    pub reference: String,
    pub status: String,
    pub amount_cents: i64,
    pub base_fee_cents: i64,
    pub delivery_fee_cents: i64,
    pub total_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_transaction_id: Option<String>,
    pub fulfilled: bool,
}

struct ResolvedLine {
    product: ProductModel,
    quantity: i32,
}

/// Order intake: builds a PENDING order from one product or an entire cart.
///
/// Stock is only checked here, never reserved or decremented; committing
/// stock happens in fulfillment once payment is approved. Side effects
/// committed by earlier pipeline steps (customer, delivery) are not rolled
/// back when a later step fails.
#[derive(Clone)]
pub struct OrderService {
    products: Arc<dyn ProductRepository>,
    customers: Arc<dyn CustomerRepository>,
    deliveries: Arc<dyn DeliveryRepository>,
    carts: Arc<dyn CartRepository>,
    orders: Arc<dyn OrderRepository>,
    checkout: CheckoutConfig,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(
        products: Arc<dyn ProductRepository>,
        customers: Arc<dyn CustomerRepository>,
        deliveries: Arc<dyn DeliveryRepository>,
        carts: Arc<dyn CartRepository>,
        orders: Arc<dyn OrderRepository>,
        checkout: CheckoutConfig,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            products,
            customers,
            deliveries,
            carts,
            orders,
            checkout,
            event_sender,
        }
    }

    /// Creates a PENDING order for a single product.
    #[instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn create_from_product(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderReceipt, CheckoutError> {
        request.validate()?;

        let product = self
            .products
            .find_by_id(request.product_id)
            .await?
            .ok_or(CheckoutError::ProductNotFound(request.product_id))?;

        let line = ResolvedLine {
            quantity: request.quantity,
            product,
        };
        ensure_stock(&line)?;

        let product_id = line.product.id;
        let order = self
            .persist_order(&[line], request.customer, request.delivery, Some(product_id), None)
            .await?;

        info!(order_id = %order.id, reference = %order.reference, "order created");
        Ok(build_receipt(order, None))
    }

    /// Creates a PENDING order from every line of the given cart session.
    /// The cart itself is left untouched until fulfillment clears it.
    #[instrument(skip(self, request), fields(session_id = %request.session_id))]
    pub async fn create_from_cart(
        &self,
        request: CreateOrderFromCartRequest,
    ) -> Result<OrderReceipt, CheckoutError> {
        request.validate()?;

        let cart_lines = self.carts.items_for_session(&request.session_id).await?;
        if cart_lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let mut lines = Vec::with_capacity(cart_lines.len());
        for item in &cart_lines {
            let product = self
                .products
                .find_by_id(item.product_id)
                .await?
                .ok_or(CheckoutError::ProductNotFound(item.product_id))?;
            let line = ResolvedLine {
                product,
                quantity: item.quantity,
            };
            ensure_stock(&line)?;
            lines.push(line);
        }

        let order = self
            .persist_order(
                &lines,
                request.customer,
                request.delivery,
                None,
                Some(request.session_id),
            )
            .await?;

        let items = lines
            .iter()
            .map(|line| OrderLineSummary {
                product_id: line.product.id,
                product_name: line.product.name.clone(),
                quantity: line.quantity,
                price_cents: line.product.price_cents,
                subtotal_cents: line.product.price_cents * i64::from(line.quantity),
            })
            .collect();

        info!(order_id = %order.id, reference = %order.reference, "order created from cart");
        Ok(build_receipt(order, Some(items)))
    }

    /// Retrieves an order by ID
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderDetails, CheckoutError> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| CheckoutError::OrderNotFound(format!("id {order_id}")))?;
        Ok(build_details(order))
    }

    /// Retrieves an order by its caller-facing reference
    #[instrument(skip(self))]
    pub async fn get_order_by_reference(
        &self,
        reference: &str,
    ) -> Result<OrderDetails, CheckoutError> {
        let order = self
            .orders
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| CheckoutError::OrderNotFound(format!("reference {reference}")))?;
        Ok(build_details(order))
    }

    /// Shared intake tail: customer, delivery, then the order with its
    /// price-snapshot lines. Each step maps its storage error to the
    /// corresponding failure kind and aborts the rest of the pipeline.
    async fn persist_order(
        &self,
        lines: &[ResolvedLine],
        customer: CustomerDetails,
        delivery: DeliveryDetails,
        product_id: Option<Uuid>,
        session_id: Option<String>,
    ) -> Result<OrderModel, CheckoutError> {
        let customer = self
            .customers
            .create(NewCustomer {
                full_name: customer.full_name,
                identity_document: customer.identity_document,
                email: customer.email,
                phone: customer.phone,
            })
            .await
            .map_err(|e| {
                error!(error = %e, "failed to create customer");
                CheckoutError::CustomerCreationFailed(e.to_string())
            })?;

        let delivery = self
            .deliveries
            .create(NewDelivery {
                customer_id: customer.id,
                address: delivery.address,
                city: delivery.city,
                country: delivery.country,
            })
            .await
            .map_err(|e| {
                error!(error = %e, customer_id = %customer.id, "failed to create delivery");
                CheckoutError::DeliveryCreationFailed(e.to_string())
            })?;

        let amount_cents: i64 = lines
            .iter()
            .map(|line| line.product.price_cents * i64::from(line.quantity))
            .sum();

        let reference = self.orders.next_reference();
        let order_lines = lines
            .iter()
            .map(|line| NewOrderLine {
                product_id: line.product.id,
                quantity: line.quantity,
                price_cents: line.product.price_cents,
                subtotal_cents: line.product.price_cents * i64::from(line.quantity),
            })
            .collect();

        let order = self
            .orders
            .create(
                NewOrder {
                    reference,
                    status: OrderStatus::Pending,
                    amount_cents,
                    base_fee_cents: self.checkout.base_fee_cents,
                    delivery_fee_cents: self.checkout.delivery_fee_cents,
                    product_id,
                    customer_id: customer.id,
                    delivery_id: delivery.id,
                    session_id,
                },
                order_lines,
            )
            .await
            .map_err(|e| {
                error!(error = %e, "failed to create order");
                CheckoutError::OrderCreationFailed(e.to_string())
            })?;

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::OrderCreated {
                    order_id: order.id,
                    reference: order.reference.clone(),
                })
                .await
            {
                warn!(error = %e, order_id = %order.id, "Failed to send order created event");
            }
        }

        Ok(order)
    }
}

fn ensure_stock(line: &ResolvedLine) -> Result<(), CheckoutError> {
    if line.product.stock < line.quantity {
        return Err(CheckoutError::InsufficientStock {
            product_id: line.product.id,
            name: line.product.name.clone(),
            available: line.product.stock,
            requested: line.quantity,
        });
    }
    Ok(())
}

fn build_receipt(order: OrderModel, items: Option<Vec<OrderLineSummary>>) -> OrderReceipt {
    let total_cents = order.total_cents();
    OrderReceipt {
        order_id: order.id,
        reference: order.reference,
        status: OrderStatus::from_wire(&order.status).as_api().to_string(),
        items,
        amount_cents: order.amount_cents,
        base_fee_cents: order.base_fee_cents,
        delivery_fee_cents: order.delivery_fee_cents,
        total_cents,
    }
}

fn build_details(order: OrderModel) -> OrderDetails {
    let total_cents = order.total_cents();
    OrderDetails {
        order_id: order.id,
        reference: order.reference.clone(),
        status: order.order_status().as_api().to_string(),
        amount_cents: order.amount_cents,
        base_fee_cents: order.base_fee_cents,
        delivery_fee_cents: order.delivery_fee_cents,
        total_cents,
        gateway_transaction_id: order.gateway_transaction_id,
        fulfilled: order.fulfilled_at.is_some(),
    }
}
