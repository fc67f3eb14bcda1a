use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::delivery::{ActiveModel, Entity as Delivery, Model as DeliveryModel};
use crate::repositories::{BaseRepository, Repository};

/// Attributes for a delivery record, bound to its customer.
#[derive(Debug, Clone)]
pub struct NewDelivery {
    pub customer_id: Uuid,
    pub address: String,
    pub city: String,
    pub country: String,
}

/// Delivery store contract.
#[async_trait]
pub trait DeliveryRepository: Send + Sync {
    async fn create(&self, delivery: NewDelivery) -> Result<DeliveryModel, DbErr>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DeliveryModel>, DbErr>;
}

/// SeaORM-backed delivery repository
#[derive(Debug)]
pub struct SqlDeliveryRepository {
    base: BaseRepository,
}

impl SqlDeliveryRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl DeliveryRepository for SqlDeliveryRepository {
    async fn create(&self, delivery: NewDelivery) -> Result<DeliveryModel, DbErr> {
        ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(delivery.customer_id),
            address: Set(delivery.address),
            city: Set(delivery.city),
            country: Set(delivery.country),
            created_at: Set(Utc::now()),
        }
        .insert(self.base.get_db())
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DeliveryModel>, DbErr> {
        Delivery::find_by_id(id).one(self.base.get_db()).await
    }
}

impl Repository for SqlDeliveryRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
