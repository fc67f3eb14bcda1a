use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait, QueryFilter,
    Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::cart_item::{ActiveModel, Column, Entity as CartItem, Model as CartItemModel};
use crate::repositories::{BaseRepository, Repository};

/// Cart store contract. Lines are keyed by the unique
/// (session id, product id) pair.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Add a line, or bump the quantity of the existing line for the pair.
    async fn add_item(
        &self,
        session_id: &str,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartItemModel, DbErr>;

    /// Replace a line's quantity. A quantity of zero or less removes the
    /// line; returns `None` when the line does not exist or was removed.
    async fn update_quantity(
        &self,
        session_id: &str,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Option<CartItemModel>, DbErr>;

    async fn remove_item(&self, session_id: &str, product_id: Uuid) -> Result<u64, DbErr>;

    async fn items_for_session(&self, session_id: &str) -> Result<Vec<CartItemModel>, DbErr>;

    /// Remove every line for the session. Returns the number of lines removed.
    async fn clear_session(&self, session_id: &str) -> Result<u64, DbErr>;
}

/// SeaORM-backed cart repository
#[derive(Debug)]
pub struct SqlCartRepository {
    base: BaseRepository,
}

impl SqlCartRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    async fn find_line(
        &self,
        session_id: &str,
        product_id: Uuid,
    ) -> Result<Option<CartItemModel>, DbErr> {
        CartItem::find()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::ProductId.eq(product_id))
            .one(self.base.get_db())
            .await
    }
}

#[async_trait]
impl CartRepository for SqlCartRepository {
    async fn add_item(
        &self,
        session_id: &str,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartItemModel, DbErr> {
        let db = self.base.get_db();

        match self.find_line(session_id, product_id).await? {
            Some(line) => {
                let merged = line.quantity + quantity;
                let mut active: ActiveModel = line.into();
                active.quantity = Set(merged);
                active.updated_at = Set(Utc::now());
                active.update(db).await
            }
            None => {
                ActiveModel {
                    id: Set(Uuid::new_v4()),
                    session_id: Set(session_id.to_string()),
                    product_id: Set(product_id),
                    quantity: Set(quantity),
                    created_at: Set(Utc::now()),
                    updated_at: Set(Utc::now()),
                }
                .insert(db)
                .await
            }
        }
    }

    async fn update_quantity(
        &self,
        session_id: &str,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Option<CartItemModel>, DbErr> {
        let db = self.base.get_db();

        let Some(line) = self.find_line(session_id, product_id).await? else {
            return Ok(None);
        };

        if quantity <= 0 {
            line.delete(db).await?;
            return Ok(None);
        }

        let mut active: ActiveModel = line.into();
        active.quantity = Set(quantity);
        active.updated_at = Set(Utc::now());
        Ok(Some(active.update(db).await?))
    }

    async fn remove_item(&self, session_id: &str, product_id: Uuid) -> Result<u64, DbErr> {
        let result = CartItem::delete_many()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::ProductId.eq(product_id))
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected)
    }

    async fn items_for_session(&self, session_id: &str) -> Result<Vec<CartItemModel>, DbErr> {
        CartItem::find()
            .filter(Column::SessionId.eq(session_id))
            .all(self.base.get_db())
            .await
    }

    async fn clear_session(&self, session_id: &str) -> Result<u64, DbErr> {
        let result = CartItem::delete_many()
            .filter(Column::SessionId.eq(session_id))
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected)
    }
}

impl Repository for SqlCartRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
