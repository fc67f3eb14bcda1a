#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use checkout_api::config::CheckoutConfig;
use checkout_api::entities::order::OrderStatus;
use checkout_api::entities::{cart_item, customer, delivery, order, order_item, product};
use checkout_api::gateway::{
    CardData, ChargeRequest, GatewayCharge, GatewayError, PaymentGateway,
};
use checkout_api::repositories::{
    CartRepository, CustomerRepository, DeliveryRepository, NewCustomer, NewDelivery, NewOrder,
    NewOrderLine, OrderRepository, ProductRepository,
};
use checkout_api::services::orders::{CustomerDetails, DeliveryDetails};
use checkout_api::services::{OrderService, OrderStatusService, PaymentService};

fn storage_failure(op: &str) -> DbErr {
    DbErr::Custom(format!("injected {op} failure"))
}

/// In-memory product store double
#[derive(Default)]
pub struct InMemoryProductRepository {
    products: Mutex<HashMap<Uuid, product::Model>>,
    pub fail_decrement: AtomicBool,
}

impl InMemoryProductRepository {
    pub fn insert(&self, name: &str, price_cents: i64, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        let model = product::Model {
            id,
            name: name.to_string(),
            description: None,
            price_cents,
            stock,
            image_url: None,
            created_at: Utc::now(),
        };
        self.products.lock().unwrap().insert(id, model);
        id
    }

    pub fn stock(&self, id: Uuid) -> i32 {
        self.products.lock().unwrap()[&id].stock
    }

    pub fn set_price(&self, id: Uuid, price_cents: i64) {
        self.products
            .lock()
            .unwrap()
            .get_mut(&id)
            .expect("unknown product")
            .price_cents = price_cents;
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<product::Model>, DbErr> {
        Ok(self.products.lock().unwrap().get(&id).cloned())
    }

    async fn decrement_stock(&self, id: Uuid, quantity: i32) -> Result<u64, DbErr> {
        if self.fail_decrement.load(Ordering::SeqCst) {
            return Err(storage_failure("stock update"));
        }
        let mut products = self.products.lock().unwrap();
        match products.get_mut(&id) {
            Some(found) => {
                found.stock = (found.stock - quantity).max(0);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

/// In-memory customer store double
#[derive(Default)]
pub struct InMemoryCustomerRepository {
    customers: Mutex<HashMap<Uuid, customer::Model>>,
    pub fail_create: AtomicBool,
}

impl InMemoryCustomerRepository {
    pub fn count(&self) -> usize {
        self.customers.lock().unwrap().len()
    }
}

#[async_trait]
impl CustomerRepository for InMemoryCustomerRepository {
    async fn create(&self, new: NewCustomer) -> Result<customer::Model, DbErr> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(storage_failure("customer creation"));
        }
        let model = customer::Model {
            id: Uuid::new_v4(),
            full_name: new.full_name,
            identity_document: new.identity_document,
            email: new.email,
            phone: new.phone,
            created_at: Utc::now(),
        };
        self.customers
            .lock()
            .unwrap()
            .insert(model.id, model.clone());
        Ok(model)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<customer::Model>, DbErr> {
        Ok(self.customers.lock().unwrap().get(&id).cloned())
    }
}

/// In-memory delivery store double
#[derive(Default)]
pub struct InMemoryDeliveryRepository {
    deliveries: Mutex<HashMap<Uuid, delivery::Model>>,
    pub fail_create: AtomicBool,
}

impl InMemoryDeliveryRepository {
    pub fn count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

#[async_trait]
impl DeliveryRepository for InMemoryDeliveryRepository {
    async fn create(&self, new: NewDelivery) -> Result<delivery::Model, DbErr> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(storage_failure("delivery creation"));
        }
        let model = delivery::Model {
            id: Uuid::new_v4(),
            customer_id: new.customer_id,
            address: new.address,
            city: new.city,
            country: new.country,
            created_at: Utc::now(),
        };
        self.deliveries
            .lock()
            .unwrap()
            .insert(model.id, model.clone());
        Ok(model)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<delivery::Model>, DbErr> {
        Ok(self.deliveries.lock().unwrap().get(&id).cloned())
    }
}

/// In-memory cart store double
#[derive(Default)]
pub struct InMemoryCartRepository {
    items: Mutex<Vec<cart_item::Model>>,
    pub fail_clear: AtomicBool,
}

impl InMemoryCartRepository {
    pub fn line_count(&self, session_id: &str) -> usize {
        self.items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.session_id == session_id)
            .count()
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    async fn add_item(
        &self,
        session_id: &str,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<cart_item::Model, DbErr> {
        let mut items = self.items.lock().unwrap();
        if let Some(existing) = items
            .iter_mut()
            .find(|item| item.session_id == session_id && item.product_id == product_id)
        {
            existing.quantity += quantity;
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }
        let model = cart_item::Model {
            id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            product_id,
            quantity,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        items.push(model.clone());
        Ok(model)
    }

    async fn update_quantity(
        &self,
        session_id: &str,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Option<cart_item::Model>, DbErr> {
        let mut items = self.items.lock().unwrap();
        let position = items
            .iter()
            .position(|item| item.session_id == session_id && item.product_id == product_id);
        let Some(position) = position else {
            return Ok(None);
        };
        if quantity <= 0 {
            items.remove(position);
            return Ok(None);
        }
        items[position].quantity = quantity;
        items[position].updated_at = Utc::now();
        Ok(Some(items[position].clone()))
    }

    async fn remove_item(&self, session_id: &str, product_id: Uuid) -> Result<u64, DbErr> {
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|item| !(item.session_id == session_id && item.product_id == product_id));
        Ok((before - items.len()) as u64)
    }

    async fn items_for_session(&self, session_id: &str) -> Result<Vec<cart_item::Model>, DbErr> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn clear_session(&self, session_id: &str) -> Result<u64, DbErr> {
        if self.fail_clear.load(Ordering::SeqCst) {
            return Err(storage_failure("cart clear"));
        }
        let mut items = self.items.lock().unwrap();
        let before = items.len();
        items.retain(|item| item.session_id != session_id);
        Ok((before - items.len()) as u64)
    }
}

/// In-memory order store double. `update_status` and `mark_fulfilled` apply
/// the same conditional semantics as the SQL implementation.
#[derive(Default)]
pub struct InMemoryOrderRepository {
    orders: Mutex<HashMap<Uuid, order::Model>>,
    items: Mutex<Vec<order_item::Model>>,
    reference_counter: AtomicU64,
    pub fail_create: AtomicBool,
    pub fail_update_status: AtomicBool,
    pub fail_mark_fulfilled: AtomicBool,
}

impl InMemoryOrderRepository {
    pub fn order_count(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    pub fn line_count(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn get(&self, id: Uuid) -> order::Model {
        self.orders.lock().unwrap()[&id].clone()
    }

    pub fn items_for_order_sync(&self, order_id: Uuid) -> Vec<order_item::Model> {
        self.items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn create(
        &self,
        new: NewOrder,
        lines: Vec<NewOrderLine>,
    ) -> Result<order::Model, DbErr> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(storage_failure("order creation"));
        }
        let now = Utc::now();
        let model = order::Model {
            id: Uuid::new_v4(),
            reference: new.reference,
            status: new.status.as_wire().to_string(),
            amount_cents: new.amount_cents,
            base_fee_cents: new.base_fee_cents,
            delivery_fee_cents: new.delivery_fee_cents,
            product_id: new.product_id,
            customer_id: new.customer_id,
            delivery_id: new.delivery_id,
            session_id: new.session_id,
            gateway_transaction_id: None,
            fulfilled_at: None,
            created_at: now,
        };
        let mut items = self.items.lock().unwrap();
        for line in lines {
            items.push(order_item::Model {
                id: Uuid::new_v4(),
                order_id: model.id,
                product_id: line.product_id,
                quantity: line.quantity,
                price_cents: line.price_cents,
                subtotal_cents: line.subtotal_cents,
                created_at: now,
            });
        }
        self.orders.lock().unwrap().insert(model.id, model.clone());
        Ok(model)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<order::Model>, DbErr> {
        Ok(self.orders.lock().unwrap().get(&id).cloned())
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<order::Model>, DbErr> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .values()
            .find(|order| order.reference == reference)
            .cloned())
    }

    async fn items_for_order(&self, order_id: Uuid) -> Result<Vec<order_item::Model>, DbErr> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|item| item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        gateway_transaction_id: Option<&str>,
    ) -> Result<u64, DbErr> {
        if self.fail_update_status.load(Ordering::SeqCst) {
            return Err(storage_failure("status update"));
        }
        let mut orders = self.orders.lock().unwrap();
        let Some(found) = orders.get_mut(&id) else {
            return Ok(0);
        };
        if found.status != OrderStatus::Pending.as_wire() {
            return Ok(0);
        }
        found.status = status.as_wire().to_string();
        if let Some(gateway_id) = gateway_transaction_id {
            found.gateway_transaction_id = Some(gateway_id.to_string());
        }
        Ok(1)
    }

    async fn mark_fulfilled(&self, id: Uuid, at: DateTime<Utc>) -> Result<u64, DbErr> {
        if self.fail_mark_fulfilled.load(Ordering::SeqCst) {
            return Err(storage_failure("mark fulfilled"));
        }
        let mut orders = self.orders.lock().unwrap();
        let Some(found) = orders.get_mut(&id) else {
            return Ok(0);
        };
        if found.fulfilled_at.is_some() {
            return Ok(0);
        }
        found.fulfilled_at = Some(at);
        Ok(1)
    }

    fn next_reference(&self) -> String {
        let counter = self.reference_counter.fetch_add(1, Ordering::SeqCst);
        format!("ORD-TEST-{counter:06}")
    }
}

/// Scripted gateway double. Every operation returns its configured response;
/// submitted charge requests are captured for assertions.
pub struct FakeGateway {
    pub acceptance: Mutex<Result<String, GatewayError>>,
    pub card_token: Mutex<Result<String, GatewayError>>,
    pub payment_source: Mutex<Result<i64, GatewayError>>,
    pub charge: Mutex<Result<GatewayCharge, GatewayError>>,
    pub status: Mutex<Result<GatewayCharge, GatewayError>>,
    pub submitted: Mutex<Vec<ChargeRequest>>,
    pub status_queries: Mutex<Vec<String>>,
}

impl FakeGateway {
    /// A gateway that approves the charge synchronously as "gw-1".
    pub fn approving() -> Self {
        Self {
            acceptance: Mutex::new(Ok("acceptance-token".to_string())),
            card_token: Mutex::new(Ok("tok_test_1".to_string())),
            payment_source: Mutex::new(Ok(7001)),
            charge: Mutex::new(Ok(charge("gw-1", "APPROVED"))),
            status: Mutex::new(Ok(charge("gw-1", "APPROVED"))),
            submitted: Mutex::new(Vec::new()),
            status_queries: Mutex::new(Vec::new()),
        }
    }

    pub fn set_charge_response(&self, response: Result<GatewayCharge, GatewayError>) {
        *self.charge.lock().unwrap() = response;
    }

    pub fn set_status_response(&self, response: Result<GatewayCharge, GatewayError>) {
        *self.status.lock().unwrap() = response;
    }
}

pub fn charge(id: &str, status: &str) -> GatewayCharge {
    GatewayCharge {
        id: id.to_string(),
        status: status.to_string(),
        status_message: None,
        finalized_at: Some(Utc::now()),
    }
}

pub fn gateway_error(message: &str) -> GatewayError {
    GatewayError::new(
        message,
        Some(422),
        Some(serde_json::json!({ "error": { "message": message } })),
    )
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn acceptance_token(&self) -> Result<String, GatewayError> {
        self.acceptance.lock().unwrap().clone()
    }

    async fn tokenize_card(&self, _card: &CardData) -> Result<String, GatewayError> {
        self.card_token.lock().unwrap().clone()
    }

    async fn create_payment_source(
        &self,
        _token: &str,
        _customer_email: &str,
        _acceptance_token: &str,
    ) -> Result<i64, GatewayError> {
        self.payment_source.lock().unwrap().clone()
    }

    async fn submit_charge(&self, request: &ChargeRequest) -> Result<GatewayCharge, GatewayError> {
        self.submitted.lock().unwrap().push(request.clone());
        self.charge.lock().unwrap().clone()
    }

    async fn charge_status(
        &self,
        gateway_transaction_id: &str,
    ) -> Result<GatewayCharge, GatewayError> {
        self.status_queries
            .lock()
            .unwrap()
            .push(gateway_transaction_id.to_string());
        self.status.lock().unwrap().clone()
    }
}

/// Shared test fixture: in-memory stores, a scripted gateway and the three
/// services wired over them with the default fees (5 000 / 10 000, COP).
pub struct TestApp {
    pub products: Arc<InMemoryProductRepository>,
    pub customers: Arc<InMemoryCustomerRepository>,
    pub deliveries: Arc<InMemoryDeliveryRepository>,
    pub carts: Arc<InMemoryCartRepository>,
    pub orders: Arc<InMemoryOrderRepository>,
    pub gateway: Arc<FakeGateway>,
}

impl TestApp {
    pub fn new() -> Self {
        Self {
            products: Arc::new(InMemoryProductRepository::default()),
            customers: Arc::new(InMemoryCustomerRepository::default()),
            deliveries: Arc::new(InMemoryDeliveryRepository::default()),
            carts: Arc::new(InMemoryCartRepository::default()),
            orders: Arc::new(InMemoryOrderRepository::default()),
            gateway: Arc::new(FakeGateway::approving()),
        }
    }

    pub fn order_service(&self) -> OrderService {
        OrderService::new(
            self.products.clone(),
            self.customers.clone(),
            self.deliveries.clone(),
            self.carts.clone(),
            self.orders.clone(),
            CheckoutConfig::default(),
            None,
        )
    }

    pub fn payment_service(&self) -> PaymentService {
        PaymentService::new(
            self.orders.clone(),
            self.customers.clone(),
            self.gateway.clone(),
            CheckoutConfig::default(),
            None,
        )
    }

    pub fn status_service(&self) -> OrderStatusService {
        OrderStatusService::new(
            self.orders.clone(),
            self.products.clone(),
            self.carts.clone(),
            self.gateway.clone(),
            None,
        )
    }
}

pub fn customer_details() -> CustomerDetails {
    CustomerDetails {
        full_name: "Juan Test".to_string(),
        identity_document: "CC-1032456789".to_string(),
        email: "juan@example.com".to_string(),
        phone: "+573001112233".to_string(),
    }
}

pub fn delivery_details() -> DeliveryDetails {
    DeliveryDetails {
        address: "Calle 100 # 11-22".to_string(),
        city: "Bogota".to_string(),
        country: "CO".to_string(),
    }
}

pub fn test_card() -> CardData {
    CardData {
        number: "4242424242424242".to_string(),
        cvc: "123".to_string(),
        exp_month: "12".to_string(),
        exp_year: "29".to_string(),
        card_holder: "Juan Test".to_string(),
    }
}
