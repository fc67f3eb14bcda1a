//! Checkout API Library
//!
//! Checkout-and-fulfillment orchestration: order intake, card payment
//! submission against an external gateway, and reconciliation of the
//! gateway's authoritative status with exactly-once fulfillment.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod logging;
pub mod repositories;
pub mod services;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::gateway::PaymentGateway;
use crate::repositories::{
    CartRepository, CustomerRepository, DeliveryRepository, OrderRepository, ProductRepository,
    SqlCartRepository, SqlCustomerRepository, SqlDeliveryRepository, SqlOrderRepository,
    SqlProductRepository,
};
use crate::services::{OrderService, OrderStatusService, PaymentService};

/// The three checkout services, shared across request handlers.
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub payments: Arc<PaymentService>,
    pub order_status: Arc<OrderStatusService>,
}

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: AppConfig,
    pub services: AppServices,
}

impl AppState {
    /// Wires the SeaORM repositories and the checkout services over one
    /// database handle and gateway instance.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: AppConfig,
        gateway: Arc<dyn PaymentGateway>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        let products: Arc<dyn ProductRepository> = Arc::new(SqlProductRepository::new(db.clone()));
        let customers: Arc<dyn CustomerRepository> =
            Arc::new(SqlCustomerRepository::new(db.clone()));
        let deliveries: Arc<dyn DeliveryRepository> =
            Arc::new(SqlDeliveryRepository::new(db.clone()));
        let carts: Arc<dyn CartRepository> = Arc::new(SqlCartRepository::new(db.clone()));
        let orders: Arc<dyn OrderRepository> = Arc::new(SqlOrderRepository::new(db.clone()));

        let services = AppServices {
            orders: Arc::new(OrderService::new(
                products.clone(),
                customers.clone(),
                deliveries,
                carts.clone(),
                orders.clone(),
                config.checkout.clone(),
                event_sender.clone(),
            )),
            payments: Arc::new(PaymentService::new(
                orders.clone(),
                customers,
                gateway.clone(),
                config.checkout.clone(),
                event_sender.clone(),
            )),
            order_status: Arc::new(OrderStatusService::new(
                orders,
                products,
                carts,
                gateway,
                event_sender,
            )),
        };

        Self {
            db,
            config,
            services,
        }
    }

    pub fn order_service(&self) -> Arc<OrderService> {
        self.services.orders.clone()
    }

    pub fn payment_service(&self) -> Arc<PaymentService> {
        self.services.payments.clone()
    }

    pub fn order_status_service(&self) -> Arc<OrderStatusService> {
        self.services.order_status.clone()
    }
}
