use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::order::{Column, Entity as Order, Model as OrderModel, OrderStatus};
use crate::entities::order_item::{self, Model as OrderItemModel};
use crate::repositories::{BaseRepository, Repository};

/// Attributes for a new order row. The reference must come from
/// [`OrderRepository::next_reference`] (or be otherwise unique).
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub reference: String,
    pub status: OrderStatus,
    pub amount_cents: i64,
    pub base_fee_cents: i64,
    pub delivery_fee_cents: i64,
    pub product_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub delivery_id: Uuid,
    pub session_id: Option<String>,
}

/// A line to persist with the order; prices are snapshots of the catalog at
/// order-creation time.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_cents: i64,
    pub subtotal_cents: i64,
}

/// Order store contract.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persist an order and its lines in one transaction.
    async fn create(&self, order: NewOrder, lines: Vec<NewOrderLine>)
        -> Result<OrderModel, DbErr>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<OrderModel>, DbErr>;

    async fn find_by_reference(&self, reference: &str) -> Result<Option<OrderModel>, DbErr>;

    async fn items_for_order(&self, order_id: Uuid) -> Result<Vec<OrderItemModel>, DbErr>;

    /// Overwrite the status (and optionally the gateway transaction id) of a
    /// still-PENDING order. The PENDING guard lives in the statement itself,
    /// so a terminal order can never transition again. Returns the number of
    /// rows affected; zero means the order was absent or no longer PENDING.
    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        gateway_transaction_id: Option<&str>,
    ) -> Result<u64, DbErr>;

    /// Set the fulfilled-at marker if and only if it is still unset, as a
    /// single conditional update. Returns the number of rows affected; zero
    /// means another caller already claimed fulfillment.
    async fn mark_fulfilled(&self, id: Uuid, at: DateTime<Utc>) -> Result<u64, DbErr>;

    /// Allocate the next order reference. Uniqueness is the contract.
    fn next_reference(&self) -> String;
}

/// SeaORM-backed order repository
#[derive(Debug)]
pub struct SqlOrderRepository {
    base: BaseRepository,
}

impl SqlOrderRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }
}

#[async_trait]
impl OrderRepository for SqlOrderRepository {
    async fn create(
        &self,
        order: NewOrder,
        lines: Vec<NewOrderLine>,
    ) -> Result<OrderModel, DbErr> {
        let txn = self.base.get_db().begin().await?;
        let now = Utc::now();
        let order_id = Uuid::new_v4();

        let model = crate::entities::order::ActiveModel {
            id: Set(order_id),
            reference: Set(order.reference),
            status: Set(order.status.as_wire().to_string()),
            amount_cents: Set(order.amount_cents),
            base_fee_cents: Set(order.base_fee_cents),
            delivery_fee_cents: Set(order.delivery_fee_cents),
            product_id: Set(order.product_id),
            customer_id: Set(order.customer_id),
            delivery_id: Set(order.delivery_id),
            session_id: Set(order.session_id),
            gateway_transaction_id: Set(None),
            fulfilled_at: Set(None),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for line in lines {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                price_cents: Set(line.price_cents),
                subtotal_cents: Set(line.subtotal_cents),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(model)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<OrderModel>, DbErr> {
        Order::find_by_id(id).one(self.base.get_db()).await
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<OrderModel>, DbErr> {
        Order::find()
            .filter(Column::Reference.eq(reference))
            .one(self.base.get_db())
            .await
    }

    async fn items_for_order(&self, order_id: Uuid) -> Result<Vec<OrderItemModel>, DbErr> {
        order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(self.base.get_db())
            .await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        gateway_transaction_id: Option<&str>,
    ) -> Result<u64, DbErr> {
        let mut update = Order::update_many()
            .col_expr(Column::Status, Expr::value(status.as_wire()))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.eq(OrderStatus::Pending.as_wire()));

        if let Some(gateway_id) = gateway_transaction_id {
            update = update.col_expr(Column::GatewayTransactionId, Expr::value(gateway_id));
        }

        let result = update.exec(self.base.get_db()).await?;
        Ok(result.rows_affected)
    }

    async fn mark_fulfilled(&self, id: Uuid, at: DateTime<Utc>) -> Result<u64, DbErr> {
        let result = Order::update_many()
            .col_expr(Column::FulfilledAt, Expr::value(Some(at)))
            .filter(Column::Id.eq(id))
            .filter(Column::FulfilledAt.is_null())
            .exec(self.base.get_db())
            .await?;
        Ok(result.rows_affected)
    }

    fn next_reference(&self) -> String {
        let suffix: u32 = rand::random();
        format!("ORD-{}-{:08X}", Utc::now().format("%Y%m%d%H%M%S"), suffix)
    }
}

impl Repository for SqlOrderRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
