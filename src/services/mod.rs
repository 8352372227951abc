//! Application services sitting between the HTTP layer and the store.

pub mod catalog;
pub mod orders;
pub mod profiles;

pub use catalog::CatalogService;
pub use orders::{OrderDetails, OrderService, PlaceOrder};
pub use profiles::ProfileService;
