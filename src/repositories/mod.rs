use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod cart_repository;
pub mod customer_repository;
pub mod delivery_repository;
pub mod order_repository;
pub mod product_repository;

pub use cart_repository::{CartRepository, SqlCartRepository};
pub use customer_repository::{CustomerRepository, NewCustomer, SqlCustomerRepository};
pub use delivery_repository::{DeliveryRepository, NewDelivery, SqlDeliveryRepository};
pub use order_repository::{NewOrder, NewOrderLine, OrderRepository, SqlOrderRepository};
pub use product_repository::{ProductRepository, SqlProductRepository};

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

#[derive(Debug)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}
