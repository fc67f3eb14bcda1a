use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order entity: one checkout instance, tracked from PENDING through a
/// terminal payment status.
///
/// `fulfilled_at` is the one-way idempotency guard for fulfillment; it is
/// only ever written by the conditional `mark_fulfilled` update.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(unique)]
    pub reference: String,

    /// Uppercase wire form of [`OrderStatus`].
    pub status: String,

    pub amount_cents: i64,
    pub base_fee_cents: i64,
    pub delivery_fee_cents: i64,

    /// Legacy single-product link; cart orders carry their products in
    /// `order_items` only.
    #[sea_orm(nullable)]
    pub product_id: Option<Uuid>,

    pub customer_id: Uuid,
    pub delivery_id: Uuid,

    /// Originating cart session, cleared during fulfillment.
    #[sea_orm(nullable)]
    pub session_id: Option<String>,

    /// The payment provider's identifier for the submitted charge.
    #[sea_orm(nullable)]
    pub gateway_transaction_id: Option<String>,

    #[sea_orm(nullable)]
    pub fulfilled_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(
        belongs_to = "super::delivery::Entity",
        from = "Column::DeliveryId",
        to = "super::delivery::Column::Id"
    )]
    Delivery,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::delivery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Delivery.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Order total; computed, never stored independently.
    pub fn total_cents(&self) -> i64 {
        self.amount_cents + self.base_fee_cents + self.delivery_fee_cents
    }

    /// Parsed status column. Unknown stored values read as `Error` rather
    /// than panicking on historic rows.
    pub fn order_status(&self) -> OrderStatus {
        OrderStatus::from_wire(&self.status)
    }

    pub fn is_fulfilled(&self) -> bool {
        self.fulfilled_at.is_some()
    }
}

/// Payment status of an order. PENDING is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Approved,
    Declined,
    Voided,
    Error,
}

impl OrderStatus {
    /// Uppercase form stored in the database and spoken by the gateway.
    pub fn as_wire(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Approved => "APPROVED",
            OrderStatus::Declined => "DECLINED",
            OrderStatus::Voided => "VOIDED",
            OrderStatus::Error => "ERROR",
        }
    }

    /// Lowercase form used in consumer-facing responses.
    pub fn as_api(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Approved => "approved",
            OrderStatus::Declined => "declined",
            OrderStatus::Voided => "voided",
            OrderStatus::Error => "error",
        }
    }

    /// Case-insensitive parse of a stored or gateway-reported status.
    /// Anything unrecognized maps to `Error`.
    pub fn from_wire(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "PENDING" => OrderStatus::Pending,
            "APPROVED" => OrderStatus::Approved,
            "DECLINED" => OrderStatus::Declined,
            "VOIDED" => OrderStatus::Voided,
            _ => OrderStatus::Error,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire())
    }
}
