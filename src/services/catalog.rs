//! Storefront catalog reads.

use std::sync::Arc;

use crate::domain::aggregates::Product;
use crate::store::{CatalogStore, Page, ProductFilter};
use crate::{Result, ShopError};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self { Self { store } }

    pub async fn list_products(&self, filter: &ProductFilter) -> Result<Page<Product>> {
        if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
            if min > max {
                return Err(ShopError::validation("حداقل قیمت نمی‌تواند از حداکثر قیمت بیشتر باشد"));
            }
        }
        Ok(self.store.list_products(filter).await?)
    }

    pub async fn product(&self, slug: &str) -> Result<Product> {
        self.store
            .active_product_by_slug(slug)
            .await?
            .ok_or_else(|| ShopError::not_found("محصول یافت نشد"))
    }
}
