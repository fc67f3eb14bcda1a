pub mod cart_item;
pub mod customer;
pub mod delivery;
pub mod order;
pub mod order_item;
pub mod product;

pub use cart_item::Entity as CartItem;
pub use customer::Entity as Customer;
pub use delivery::Entity as Delivery;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use product::Entity as Product;
