//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::Product;
pub use order::{merge_lines, NewOrder, Order, OrderItem, OrderLine, OrderStatus, Recipient};
pub use cart::{Cart, CartError, CartItem, CartOwner};
