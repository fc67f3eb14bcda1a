use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::customer::{ActiveModel, Entity as Customer, Model as CustomerModel};
use crate::repositories::{BaseRepository, Repository};

/// Attributes for a customer record, captured once per order submission.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub full_name: String,
    pub identity_document: String,
    pub email: String,
    pub phone: String,
}

/// Customer store contract.
#[async_trait]
pub trait CustomerRepository: Send + Sync {
    async fn create(&self, customer: NewCustomer) -> Result<CustomerModel, DbErr>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CustomerModel>, DbErr>;
}

/// SeaORM-backed customer repository
#[derive(Debug)]
pub struct SqlCustomerRepository {
    base: BaseRepository,
}

impl SqlCustomerRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl CustomerRepository for SqlCustomerRepository {
    async fn create(&self, customer: NewCustomer) -> Result<CustomerModel, DbErr> {
        ActiveModel {
            id: Set(Uuid::new_v4()),
            full_name: Set(customer.full_name),
            identity_document: Set(customer.identity_document),
            email: Set(customer.email),
            phone: Set(customer.phone),
            created_at: Set(Utc::now()),
        }
        .insert(self.base.get_db())
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CustomerModel>, DbErr> {
        Customer::find_by_id(id).one(self.base.get_db()).await
    }
}

impl Repository for SqlCustomerRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
