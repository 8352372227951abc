//! Storefront-side state: persisted carts and the checkout resume flow.

pub mod cart_store;
pub mod checkout;
pub mod storage;

pub use cart_store::CartStore;
pub use checkout::{CheckoutBackend, CheckoutOutcome, CheckoutResume, CheckoutRoutes, CheckoutStage, LocalBackend};
pub use storage::{KeyValueStorage, MemoryStorage};
