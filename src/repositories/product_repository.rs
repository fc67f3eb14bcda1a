use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::product::{Column, Entity as Product, Model as ProductModel};
use crate::repositories::{BaseRepository, Repository};

/// Product store contract: read products, decrement stock.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Find a product by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProductModel>, DbErr>;

    /// Decrement a product's stock by `quantity`, floored at zero.
    ///
    /// The decrement is a single storage-level arithmetic update, never a
    /// read-modify-write, so concurrent orders on the same product cannot
    /// lose updates. Returns the number of rows affected.
    async fn decrement_stock(&self, id: Uuid, quantity: i32) -> Result<u64, DbErr>;
}

/// SeaORM-backed product repository
#[derive(Debug)]
pub struct SqlProductRepository {
    base: BaseRepository,
}

impl SqlProductRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProductModel>, DbErr> {
        Product::find_by_id(id).one(self.base.get_db()).await
    }

    async fn decrement_stock(&self, id: Uuid, quantity: i32) -> Result<u64, DbErr> {
        // stock = CASE WHEN stock >= quantity THEN stock - quantity ELSE 0 END
        let floored = Expr::case(
            Expr::col(Column::Stock).gte(quantity),
            Expr::col(Column::Stock).sub(quantity),
        )
        .finally(0);

        let result = Product::update_many()
            .col_expr(Column::Stock, floored.into())
            .filter(Column::Id.eq(id))
            .exec(self.base.get_db())
            .await?;

        Ok(result.rows_affected)
    }
}

impl Repository for SqlProductRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
