//! Catalog store: the relational data behind the shop.
//!
//! Services only talk to the traits below. [`postgres::PgStore`] is the
//! production implementation; test builds also carry an in-memory one.

pub mod postgres;

#[cfg(test)]
pub(crate) mod memory;

#[cfg(all(test, feature = "test-postgres"))]
pub(crate) mod test_db;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregates::{NewOrder, Order, OrderItem, OrderStatus, Product};
use crate::domain::profile::Profile;
use crate::domain::value_objects::{OrderId, ProductId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A conditional stock decrement matched no row; the whole write was rolled back.
    #[error("insufficient stock for {product_name}")]
    StockConflict { product_name: String },

    /// The product was deactivated or deleted after the order was priced.
    #[error("{product_name} is no longer available")]
    ProductUnavailable { product_name: String },

    #[error("{0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self { Self::Backend(error.to_string()) }
}

/// Result of a status transition guarded on the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// The order was no longer in the expected status when the write ran.
    Stale,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    #[serde(default)]
    pub in_stock: bool,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ProductFilter {
    pub fn page_request(&self) -> PageRequest { PageRequest { page: self.page, per_page: self.per_page } }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl OrderFilter {
    pub fn page_request(&self) -> PageRequest { PageRequest { page: self.page, per_page: self.per_page } }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageRequest {
    pub const DEFAULT_PER_PAGE: u32 = 12;
    pub const MAX_PER_PAGE: u32 = 100;

    pub fn page(&self) -> u32 { self.page.unwrap_or(1).max(1) }
    pub fn per_page(&self) -> u32 { self.per_page.unwrap_or(Self::DEFAULT_PER_PAGE).clamp(1, Self::MAX_PER_PAGE) }
    pub fn offset(&self) -> i64 { i64::from(self.page() - 1) * i64::from(self.per_page()) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: i64, request: &PageRequest) -> Self {
        Self { data, total, page: request.page(), per_page: request.per_page() }
    }
}

/// Products, orders and their items.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Loads the given products in one read, whatever their `active` flag.
    async fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError>;

    /// Active products only, newest first.
    async fn list_products(&self, filter: &ProductFilter) -> Result<Page<Product>, StoreError>;

    async fn active_product_by_slug(&self, slug: &str) -> Result<Option<Product>, StoreError>;

    /// Writes header and items and takes the stock, all or nothing. Fails with
    /// [`StoreError::StockConflict`] when any product no longer has enough stock, or
    /// [`StoreError::ProductUnavailable`] when it was deactivated or deleted meanwhile.
    async fn commit_order(&self, order: &NewOrder) -> Result<(), StoreError>;

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>, StoreError>;

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Page<Order>, StoreError>;

    async fn items_for_orders(&self, ids: &[OrderId]) -> Result<Vec<OrderItem>, StoreError>;

    /// Flips a pending order to canceled and puts its quantities back on the shelf.
    async fn cancel_order(&self, id: OrderId, user: UserId) -> Result<Transition, StoreError>;

    async fn mark_paid(&self, id: OrderId, user: UserId) -> Result<Transition, StoreError>;
}

/// Profiles, admin membership and session lookup.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn profile(&self, user: UserId) -> Result<Option<Profile>, StoreError>;

    async fn upsert_profile(&self, profile: &Profile) -> Result<Profile, StoreError>;

    async fn is_admin(&self, user: UserId) -> Result<bool, StoreError>;

    /// Resolves an unexpired session token to its user.
    async fn session_user(&self, token: &str) -> Result<Option<UserId>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_bounds() {
        let req = PageRequest { page: Some(0), per_page: Some(500) };
        assert_eq!(req.page(), 1);
        assert_eq!(req.per_page(), 100);
        assert_eq!(req.offset(), 0);

        let req = PageRequest { page: Some(3), per_page: None };
        assert_eq!(req.offset(), 24);
    }
}
